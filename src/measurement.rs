//! Raw sample acquisition.
//!
//! Each conversion is a command write to the control register, a blocking
//! wait for the ADC, then a read of the result register. Any bus failure
//! aborts before the next step.

use embedded_hal::blocking::delay::DelayUs;
use log::{debug, error};

use crate::{
    RegisterBus, SensorError, CMD_PRESSURE, CMD_TEMPERATURE, CONVERSION_TIME_US, REG_CONTROL,
    REG_RESULT,
};

/// Uncompensated ADC values for one temperature/pressure pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Raw temperature, 16 bits.
    pub ut: i32,
    /// Raw pressure, 16 bits at OSS = 0.
    pub up: i32,
}

// Issues the conversion command, waits it out and reads the result register
// into `buffer`.
fn convert<B: RegisterBus, D: DelayUs<u32>>(
    bus: &mut B,
    sleep: &mut D,
    command: u8,
    buffer: &mut [u8],
) -> Result<(), SensorError<B::Error>> {
    bus.write_register(REG_CONTROL, command).map_err(|e| {
        error!("failed to start conversion {:#04X}", command);
        SensorError::I2cError(e)
    })?;
    sleep.delay_us(CONVERSION_TIME_US);
    let got = bus.read_block(REG_RESULT, buffer).map_err(|e| {
        error!("failed to read conversion {:#04X} result", command);
        SensorError::I2cError(e)
    })?;
    if got < buffer.len() {
        error!(
            "conversion {:#04X} result returned {} of {} bytes",
            command,
            got,
            buffer.len()
        );
        return Err(SensorError::ShortRead {
            register: REG_RESULT,
            expected: buffer.len(),
            got,
        });
    }
    Ok(())
}

/// Starts a temperature conversion and reads the raw UT value.
pub fn read_raw_temperature<B: RegisterBus, D: DelayUs<u32>>(
    bus: &mut B,
    sleep: &mut D,
) -> Result<i32, SensorError<B::Error>> {
    let mut buffer = [0u8; 2];
    convert(bus, sleep, CMD_TEMPERATURE, &mut buffer)?;
    Ok(u16::from_be_bytes(buffer).into())
}

/// Starts a pressure conversion (OSS = 0) and reads the raw UP value.
pub fn read_raw_pressure<B: RegisterBus, D: DelayUs<u32>>(
    bus: &mut B,
    sleep: &mut D,
) -> Result<i32, SensorError<B::Error>> {
    // ADC is 24bit MSB, LSB, XLSB but we are storing in i32.
    let mut buffer = [0u8; 4];
    convert(bus, sleep, CMD_PRESSURE, &mut buffer[1..])?;
    // At OSS = 0 only the upper 16 bits carry data.
    Ok((u32::from_be_bytes(buffer) >> 8) as i32)
}

/// Samples temperature then pressure. Pressure is not sampled if the
/// temperature acquisition fails.
pub fn read_raw_sample<B: RegisterBus, D: DelayUs<u32>>(
    bus: &mut B,
    sleep: &mut D,
) -> Result<RawSample, SensorError<B::Error>> {
    let ut = read_raw_temperature(bus, sleep)?;
    let up = read_raw_pressure(bus, sleep)?;
    debug!("raw sample ut={} up={}", ut, up);
    Ok(RawSample { ut, up })
}
