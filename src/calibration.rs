//! Factory calibration coefficients.

use log::{debug, error, info};

use crate::{RegisterBus, SensorError, REG_CALIBRATION};

/// Size of the calibration PROM in bytes.
pub const CALIBRATION_LEN: usize = 22;

/// The factory calibration data as fetched from the PROM.
///
/// AC4, AC5 and AC6 are unsigned; everything else is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    /// Unused by the compensation formula.
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Calibration {
    /// Reads and parses the PROM contents into calibration data.
    ///
    /// Nothing is returned unless all 22 bytes were read.
    pub fn load<B: RegisterBus>(bus: &mut B) -> Result<Self, SensorError<B::Error>> {
        let mut prom = [0u8; CALIBRATION_LEN];
        let got = bus.read_block(REG_CALIBRATION, &mut prom).map_err(|e| {
            error!("failed to read calibration data");
            SensorError::I2cError(e)
        })?;
        if got < CALIBRATION_LEN {
            error!(
                "calibration read returned {} of {} bytes",
                got, CALIBRATION_LEN
            );
            return Err(SensorError::ShortRead {
                register: REG_CALIBRATION,
                expected: CALIBRATION_LEN,
                got,
            });
        }

        let calibration = Self::from_bytes(&prom);
        info!("calibration data read successfully");
        debug!("{:?}", calibration);
        Ok(calibration)
    }

    /// Decodes the big-endian PROM image, AC1 first.
    pub fn from_bytes(prom: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |i: usize| [prom[2 * i], prom[2 * i + 1]];
        Calibration {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        }
    }
}
