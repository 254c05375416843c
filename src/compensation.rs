//! True temperature and pressure from raw samples.
//!
//! This is the integer algorithm from the datasheet (section 3.5) at
//! OSS = 0. Every intermediate keeps the exact width and signedness the
//! datasheet uses: `x1, x2, x3, b3, b5, b6, p` are `i32`, `b4` and `b7` are
//! `u32`. Right shifts on signed values are arithmetic, divisions truncate
//! toward zero, and additions and multiplications wrap in two's complement
//! the same way the reference C code does when compiled with `-fwrapv`.
//!
//! The datasheet divides by `X1 + MD` and by `B4` without checking either.
//! Both zero cases are reported as an [`ArithmeticHazard`] instead.

use crate::{measurement::RawSample, reading::CompensatedReading, Calibration};

/// A zero divisor in the compensation formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticHazard {
    /// `X1 + MD == 0` in the temperature calculation.
    TemperatureDivisor,
    /// `B4 == 0` in the pressure calculation.
    PressureDivisor,
}

impl core::fmt::Display for ArithmeticHazard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArithmeticHazard::TemperatureDivisor => {
                f.write_str("temperature divisor X1 + MD is zero")
            }
            ArithmeticHazard::PressureDivisor => f.write_str("pressure divisor B4 is zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArithmeticHazard {}

/// Result of the temperature half of the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureTerms {
    /// Temperature in deci-degrees Celsius.
    pub temperature: i32,
    /// B5, needed by the pressure calculation.
    pub b5: i32,
}

/// Calculates the true temperature from UT.
pub fn true_temperature(ut: i32, cal: &Calibration) -> Result<TemperatureTerms, ArithmeticHazard> {
    let x1: i32 = ut
        .wrapping_sub(i32::from(cal.ac6))
        .wrapping_mul(i32::from(cal.ac5))
        >> 15;
    let divisor: i32 = x1.wrapping_add(i32::from(cal.md));
    if divisor == 0 {
        log::warn!("temperature divisor is zero, ut={}", ut);
        return Err(ArithmeticHazard::TemperatureDivisor);
    }
    // MC is 16 bits so MC << 11 cannot be i32::MIN and the division cannot
    // overflow.
    let x2: i32 = (i32::from(cal.mc) << 11) / divisor;
    let b5: i32 = x1.wrapping_add(x2);
    let temperature = b5.wrapping_add(8) >> 4;
    Ok(TemperatureTerms { temperature, b5 })
}

/// Calculates the true pressure from UP and the B5 term of the temperature
/// sampled just before it.
fn true_pressure(up: i32, b5: i32, cal: &Calibration) -> Result<i32, ArithmeticHazard> {
    let ac1 = i32::from(cal.ac1);
    let ac2 = i32::from(cal.ac2);
    let ac3 = i32::from(cal.ac3);
    let b1 = i32::from(cal.b1);
    let b2 = i32::from(cal.b2);

    let b6: i32 = b5.wrapping_sub(4000);
    let b6_squared: i32 = b6.wrapping_mul(b6) >> 12;

    let x1: i32 = b2.wrapping_mul(b6_squared) >> 11;
    let x2: i32 = ac2.wrapping_mul(b6) >> 11;
    let x3: i32 = x1.wrapping_add(x2);
    let b3: i32 = ac1.wrapping_mul(4).wrapping_add(x3).wrapping_add(2) / 4;

    let x1: i32 = ac3.wrapping_mul(b6) >> 13;
    let x2: i32 = b1.wrapping_mul(b6_squared) >> 16;
    let x3: i32 = x1.wrapping_add(x2).wrapping_add(2) >> 2;
    let b4: u32 = u32::from(cal.ac4).wrapping_mul(x3.wrapping_add(32768) as u32) >> 15;
    if b4 == 0 {
        log::warn!("pressure divisor is zero, up={}", up);
        return Err(ArithmeticHazard::PressureDivisor);
    }
    let b7: u32 = (up as u32).wrapping_sub(b3 as u32).wrapping_mul(50000);

    // Doubling first keeps precision but would overflow past 2^31.
    let p: i32 = if b7 < 0x8000_0000 {
        ((b7 * 2) / b4) as i32
    } else {
        (b7 / b4).wrapping_mul(2) as i32
    };

    let x1: i32 = (p >> 8).wrapping_mul(p >> 8);
    let x1: i32 = x1.wrapping_mul(3038) >> 16;
    let x2: i32 = (-7357i32).wrapping_mul(p) >> 16;
    Ok(p.wrapping_add(x1.wrapping_add(x2).wrapping_add(3791) >> 4))
}

/// Converts a raw sample into deci-degrees Celsius and Pascals.
///
/// # Example
///
/// ```
/// use bmp180::{compensate, Calibration, RawSample};
/// let cal = Calibration {
///     ac1: 408, ac2: -72, ac3: -14383, ac4: 32741, ac5: 32757, ac6: 23153,
///     b1: 6190, b2: 4, mb: -32768, mc: -8711, md: 2868,
/// };
/// let reading = compensate(RawSample { ut: 27898, up: 23843 }, &cal).unwrap();
/// assert_eq!((reading.temperature, reading.pressure), (150, 69964));
/// ```
pub fn compensate(
    sample: RawSample,
    cal: &Calibration,
) -> Result<CompensatedReading, ArithmeticHazard> {
    let TemperatureTerms { temperature, b5 } = true_temperature(sample.ut, cal)?;
    let pressure = true_pressure(sample.up, b5, cal)?;
    Ok(CompensatedReading {
        temperature,
        pressure,
    })
}

#[cfg(test)]
mod c_implementation {
    extern "C" {
        // C implementation described in the data sheet.
        // This is test only to validate the rust implementation.
        pub fn bmp180_compensate(
            words: *const u16,
            ut: i32,
            up: i32,
            temperature: *mut i32,
            pressure: *mut i32,
        ) -> i32;
    }
}
