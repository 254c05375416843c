//! # Getting started
//!
//! A platform agnostic driver for the [BMP180](https://www.bosch-sensortec.com/media/boschsensortec/downloads/datasheets/bst-bmp180-ds000.pdf)
//! barometric pressure sensor from Bosch Sensortec.
//!
//! This driver supports reading the temperature/pressure from the on-chip ADC
//! in the ultra low power mode (OSS = 0) and converting the samples into
//! deci-degrees Celsius and Pascals with the fixed-point formula from the
//! datasheet.
//!
//! There are two ways in:
//! - [`new`] returns a single-owner driver that works without `std`.
//! - [`Bmp180Device`] (feature `std`) keeps the last reading in a lock guarded
//!   cache so it can be shared between threads and read as text.
//!
//! ## Example
//! ```rust
//! # // NOTE: Use real i2c instance for your app.
//! # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! # let i2c = I2cMock::new(&[
//! #     I2cTransaction::write_read(0x77, vec![0xAA], vec![
//! #         0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71,
//! #         0x18, 0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
//! #     ]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x2E]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x34]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x5D, 0x23, 0x00]),
//! # ]);
//! use bmp180::mock_utils::SleepNop;
//! // NOTE: You should implement the DelayUs trait for this driver to work
//! // correctly.
//! let pressure_sensor = bmp180::new(i2c, SleepNop);
//! let mut pressure_sensor = pressure_sensor.init().unwrap();
//! let reading = pressure_sensor.read_temperature_and_pressure().unwrap();
//! assert_eq!(reading.temperature, 150);
//! assert_eq!(reading.pressure, 69964);
//! println!("{}", reading);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(test, not(feature = "std")))]
#[macro_use]
extern crate std;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};

pub mod cache;
pub mod calibration;
pub mod compensation;
#[cfg(feature = "std")]
pub mod device;
pub mod measurement;
pub mod reader;
pub mod reading;

pub use cache::ReadingCache;
pub use calibration::Calibration;
pub use compensation::{compensate, true_temperature, ArithmeticHazard, TemperatureTerms};
#[cfg(feature = "std")]
pub use device::{Bmp180Device, DeviceState};
pub use measurement::RawSample;
pub use reader::SnapshotReader;
pub use reading::{CompensatedReading, ReadingSnapshot};

/// The fixed I2C address of the BMP180.
pub const I2C_ADDRESS: u8 = 0x77;

/// First register of the calibration PROM.
pub const REG_CALIBRATION: u8 = 0xAA;
/// Control register, a write starts a conversion.
pub const REG_CONTROL: u8 = 0xF4;
/// Result register, MSB first.
pub const REG_RESULT: u8 = 0xF6;

/// Starts a temperature conversion.
pub const CMD_TEMPERATURE: u8 = 0x2E;
/// Starts a pressure conversion with OSS = 0.
pub const CMD_PRESSURE: u8 = 0x34;

/// Time to wait between a conversion command and reading the result. The
/// datasheet gives a 4.5ms maximum for both conversions at OSS = 0.
pub const CONVERSION_TIME_US: u32 = 5_000;

/// Mock utils is a set of tools to aid in testing and documenting you should not
/// use any of the mocks defined in this module in your release binaries.
pub mod mock_utils {
    /// A sleep implementation that does nothing and immediately exists. This is
    /// useful for testing and fuzzing.
    pub struct SleepNop;

    impl embedded_hal::blocking::delay::DelayUs<u32> for SleepNop {
        fn delay_us(&mut self, _us: u32) {
            // Nop
        }
    }

    /// A sleep implementation backed by `std::thread::sleep`.
    #[cfg(feature = "std")]
    pub struct ThreadSleep;

    #[cfg(feature = "std")]
    impl embedded_hal::blocking::delay::DelayUs<u32> for ThreadSleep {
        fn delay_us(&mut self, us: u32) {
            std::thread::sleep(std::time::Duration::from_micros(us.into()));
        }
    }

    #[cfg(feature = "std")]
    pub use scripted::{BusOp, ScriptedBus, ScriptedError};

    #[cfg(feature = "std")]
    mod scripted {
        use std::collections::VecDeque;

        use crate::RegisterBus;

        /// Error returned by [`ScriptedBus`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ScriptedError {
            /// The scripted operation was set up to fail.
            Nack,
            /// The driver did something the script did not expect.
            Unexpected,
        }

        /// One expected bus operation and its outcome.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum BusOp {
            /// `write_register(register, value)`.
            Write { register: u8, value: u8, fail: bool },
            /// `read_block(register, ..)` answering with `data`. The data may
            /// be shorter than the requested buffer.
            Read { register: u8, data: Vec<u8>, fail: bool },
        }

        impl BusOp {
            pub fn write(register: u8, value: u8) -> Self {
                BusOp::Write {
                    register,
                    value,
                    fail: false,
                }
            }

            pub fn read(register: u8, data: &[u8]) -> Self {
                BusOp::Read {
                    register,
                    data: data.to_vec(),
                    fail: false,
                }
            }

            /// Marks the operation as failing on the bus.
            pub fn failing(mut self) -> Self {
                match &mut self {
                    BusOp::Write { fail, .. } | BusOp::Read { fail, .. } => *fail = true,
                }
                self
            }
        }

        /// A register bus that replays a fixed script. Unlike an I2C mock it
        /// can answer a block read with fewer bytes than requested.
        #[derive(Debug, Default)]
        pub struct ScriptedBus {
            script: VecDeque<BusOp>,
        }

        impl ScriptedBus {
            pub fn new(script: &[BusOp]) -> Self {
                Self {
                    script: script.iter().cloned().collect(),
                }
            }

            /// Asserts that every scripted operation was consumed.
            pub fn done(&self) {
                assert!(
                    self.script.is_empty(),
                    "unconsumed bus operations: {:?}",
                    self.script
                );
            }
        }

        impl RegisterBus for ScriptedBus {
            type Error = ScriptedError;

            fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
                match self.script.pop_front() {
                    Some(BusOp::Write {
                        register: r,
                        value: v,
                        fail,
                    }) if r == register && v == value => {
                        if fail {
                            Err(ScriptedError::Nack)
                        } else {
                            Ok(())
                        }
                    }
                    _ => Err(ScriptedError::Unexpected),
                }
            }

            fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, Self::Error> {
                match self.script.pop_front() {
                    Some(BusOp::Read {
                        register: r,
                        data,
                        fail,
                    }) if r == register => {
                        if fail {
                            return Err(ScriptedError::Nack);
                        }
                        let n = data.len().min(buffer.len());
                        buffer[..n].copy_from_slice(&data[..n]);
                        Ok(n)
                    }
                    _ => Err(ScriptedError::Unexpected),
                }
            }
        }
    }
}


/// A catch all error for this driver
#[derive(Debug, PartialEq)]
pub enum SensorError<E> {
    I2cError(E),
    /// A block read returned fewer bytes than requested.
    ShortRead {
        register: u8,
        expected: usize,
        got: usize,
    },
    /// The compensation formula hit a zero divisor.
    Arithmetic(ArithmeticHazard),
    /// A measurement was requested before the calibration was loaded.
    NotCalibrated,
    /// Another acquisition cycle holds the device.
    Busy,
}

impl<E> From<ArithmeticHazard> for SensorError<E> {
    fn from(hazard: ArithmeticHazard) -> Self {
        SensorError::Arithmetic(hazard)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorError::I2cError(e) => write!(f, "i2c error: {:?}", e),
            SensorError::ShortRead {
                register,
                expected,
                got,
            } => write!(
                f,
                "short read from register {:#04X}: expected {} bytes, got {}",
                register, expected, got
            ),
            SensorError::Arithmetic(hazard) => write!(f, "arithmetic hazard: {}", hazard),
            SensorError::NotCalibrated => f.write_str("calibration data not loaded"),
            SensorError::Busy => f.write_str("an acquisition is already in progress"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for SensorError<E> {}

pub(crate) mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

pub trait I2cMarker: WriteRead + Write
where
    Self: Write<Error = <Self as WriteRead>::Error>,
{
}
impl<T: WriteRead + Write> I2cMarker for T where Self: Write<Error = <Self as WriteRead>::Error> {}

/// Register level access to the sensor.
///
/// Every blocking `embedded-hal` I2C bus implements this, talking to the
/// sensor at [`I2C_ADDRESS`]. Implement it directly for transports that are
/// not I2C or that can return short reads.
pub trait RegisterBus {
    type Error;

    /// Writes a single byte to `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads consecutive registers starting at `register` into `buffer`,
    /// returning how many bytes were actually read.
    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<I2C: I2cMarker> RegisterBus for I2C {
    type Error = <I2C as WriteRead>::Error;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write(I2C_ADDRESS, &[register, value])
    }

    fn read_block(&mut self, register: u8, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        self.write_read(I2C_ADDRESS, &[register], buffer)?;
        Ok(buffer.len())
    }
}

/// Create an uninitialised driver object
///
/// # Example
///
/// ```
/// // NOTE: Use real i2c instance for your app.
/// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// use bmp180::mock_utils::SleepNop;
/// // NOTE: You should implement the DelayUs trait for this driver to work
/// // correctly.
/// let i2c = I2cMock::new(&[]);
/// let pressure_sensor = bmp180::new(i2c, SleepNop);
/// ```
pub fn new<B: RegisterBus, D: DelayUs<u32>>(bus: B, sleep: D) -> Uninitialised<B, D> {
    Uninitialised::<B, D> { bus, sleep }
}

/// An uninitialised bmp180 object.
pub struct Uninitialised<B: RegisterBus, D: DelayUs<u32>> {
    bus: B,
    sleep: D,
}

impl<B: RegisterBus, D: DelayUs<u32>> State for Uninitialised<B, D> {}
impl<B: RegisterBus, D: DelayUs<u32>> sealed::Sealed for Uninitialised<B, D> {}

impl<B: RegisterBus, D: DelayUs<u32>> Uninitialised<B, D> {
    /// Releases the bus handle consuming the driver object.
    ///
    /// # Example
    ///
    /// ```
    /// // NOTE: Use real i2c instance for your app.
    /// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// // Dummy sleep implementation.
    /// use bmp180::mock_utils::SleepNop;
    /// let i2c = I2cMock::new(&[]);
    /// let pressure_sensor = bmp180::new(i2c, SleepNop);
    /// let i2c = pressure_sensor.release();
    /// ```
    pub fn release(self) -> (B, D) {
        (self.bus, self.sleep)
    }

    /// Initialises the pressure sensor by reading the factory calibration
    /// data.
    ///
    /// # Errors
    /// Initialisation can fail if;
    /// - There was a problem communicating over the bus.
    /// - The calibration block came back short.
    pub fn init(mut self) -> Result<Initialised<B, D>, SensorError<B::Error>> {
        let calibration = Calibration::load(&mut self.bus)?;

        Ok(Initialised {
            bus: self.bus,
            calibration,
            sleep: self.sleep,
        })
    }
}

/// An initialised bmp180 object.
pub struct Initialised<B: RegisterBus, D: DelayUs<u32>> {
    bus: B,
    calibration: Calibration,
    sleep: D,
}

impl<B: RegisterBus, D: DelayUs<u32>> State for Initialised<B, D> {}
impl<B: RegisterBus, D: DelayUs<u32>> sealed::Sealed for Initialised<B, D> {}

impl<B: RegisterBus, D: DelayUs<u32>> Initialised<B, D> {
    /// Release the bus handle consuming the driver.
    pub fn release(self) -> (B, D) {
        (self.bus, self.sleep)
    }

    /// The calibration coefficients read during initialisation.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Starts a temperature conversion and returns the raw UT sample.
    pub fn read_raw_temperature(&mut self) -> Result<i32, SensorError<B::Error>> {
        measurement::read_raw_temperature(&mut self.bus, &mut self.sleep)
    }

    /// Starts a pressure conversion and returns the raw UP sample.
    pub fn read_raw_pressure(&mut self) -> Result<i32, SensorError<B::Error>> {
        measurement::read_raw_pressure(&mut self.bus, &mut self.sleep)
    }

    /// Reads the temperature and pressure samples from the sensor.
    ///
    /// # Errors
    /// This may return an error if there is a problem with bus communication
    /// or the calibration data leads to a zero divisor.
    pub fn read_temperature_and_pressure(
        &mut self,
    ) -> Result<CompensatedReading, SensorError<B::Error>> {
        // Pressure compensation needs B5 from the temperature sample taken
        // just before it.
        let sample = measurement::read_raw_sample(&mut self.bus, &mut self.sleep)?;
        Ok(compensate(sample, &self.calibration)?)
    }

    /// Reads the temperature from the sensor in deci-degrees Celsius.
    ///
    /// # Errors
    /// This may return an error if there is a problem with bus communication.
    pub fn read_temperature(&mut self) -> Result<i32, SensorError<B::Error>> {
        let ut = self.read_raw_temperature()?;
        Ok(true_temperature(ut, &self.calibration)?.temperature)
    }
}
