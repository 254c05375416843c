//! A shareable BMP180 device with a cached reading.
//!
//! The bus, the delay, the calibration and the cache live behind a single
//! mutex. At most one acquisition runs at a time, and `snapshot` waits for
//! an in-flight acquisition so it never sees a half updated value.
//!
//! The lifecycle state is mirrored in an atomic so [`Bmp180Device::state`]
//! answers without the lock, and reports `Measuring` while an acquisition
//! holds it.
//!
//! There is no timeout on bus operations. A bus call that never returns
//! holds the lock, and every other caller blocks with it (`try_refresh`
//! excepted).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use embedded_hal::blocking::delay::DelayUs;
use log::{debug, info, warn};

use crate::{
    cache::ReadingCache,
    calibration::Calibration,
    compensation::compensate,
    measurement,
    reader::SnapshotReader,
    reading::ReadingSnapshot,
    RegisterBus, SensorError,
};

/// Lifecycle of a [`Bmp180Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    /// No calibration loaded yet.
    Uninitialized,
    /// Calibration loaded, nothing measured yet.
    CalibrationLoaded,
    /// An acquisition is running. Other threads see this through
    /// [`Bmp180Device::state`] until it completes.
    Measuring,
    /// The cache holds the result of the last acquisition.
    Ready,
    /// The last acquisition failed. The cache still holds the previous good
    /// reading, and the next refresh may recover.
    Error,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DeviceState::Uninitialized,
            1 => DeviceState::CalibrationLoaded,
            2 => DeviceState::Measuring,
            3 => DeviceState::Ready,
            _ => DeviceState::Error,
        }
    }
}

/// Written only while the device lock is held, read without it.
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: DeviceState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> DeviceState {
        DeviceState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: DeviceState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

struct Inner<B, D> {
    bus: B,
    sleep: D,
    calibration: Option<Calibration>,
    cache: ReadingCache,
}

impl<B: RegisterBus, D: DelayUs<u32>> Inner<B, D> {
    fn load_calibration(&mut self, state: &StateCell) -> Result<(), SensorError<B::Error>> {
        // A failed load leaves any earlier calibration in place.
        let calibration = Calibration::load(&mut self.bus)?;
        self.calibration = Some(calibration);
        if state.get() == DeviceState::Uninitialized {
            state.set(DeviceState::CalibrationLoaded);
        }
        Ok(())
    }

    fn refresh(&mut self, state: &StateCell) -> Result<(), SensorError<B::Error>> {
        let calibration = self.calibration.ok_or(SensorError::NotCalibrated)?;
        state.set(DeviceState::Measuring);
        match self.acquire(&calibration) {
            Ok(snapshot) => {
                self.cache.update(snapshot);
                state.set(DeviceState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("acquisition failed, keeping the previous reading");
                state.set(DeviceState::Error);
                Err(e)
            }
        }
    }

    fn acquire(
        &mut self,
        calibration: &Calibration,
    ) -> Result<ReadingSnapshot, SensorError<B::Error>> {
        let sample = measurement::read_raw_sample(&mut self.bus, &mut self.sleep)?;
        let reading = compensate(sample, calibration)?;
        info!(
            "temperature = {} deci-°C, pressure = {} Pa",
            reading.temperature, reading.pressure
        );
        Ok(ReadingSnapshot::from_reading(reading))
    }
}

/// A BMP180 whose latest reading can be read from any thread.
///
/// # Example
///
/// ```rust
/// # // NOTE: Use real i2c instance for your app.
/// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// # let i2c = I2cMock::new(&[
/// #     I2cTransaction::write_read(0x77, vec![0xAA], vec![
/// #         0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71,
/// #         0x18, 0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
/// #     ]),
/// #     I2cTransaction::write(0x77, vec![0xF4, 0x2E]),
/// #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
/// #     I2cTransaction::write(0x77, vec![0xF4, 0x34]),
/// #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x5D, 0x23, 0x00]),
/// # ]);
/// use std::io::Read;
/// use bmp180::{mock_utils::SleepNop, Bmp180Device};
///
/// let device = Bmp180Device::new(i2c, SleepNop);
/// device.initialize().unwrap();
///
/// let mut text = String::new();
/// device.open().read_to_string(&mut text).unwrap();
/// assert_eq!(text, "Temperature: 15.0 °C\nPressure: 69964 Pa\n");
/// ```
pub struct Bmp180Device<B, D> {
    inner: Mutex<Inner<B, D>>,
    state: StateCell,
}

impl<B: RegisterBus, D: DelayUs<u32>> Bmp180Device<B, D> {
    pub fn new(bus: B, sleep: D) -> Self {
        Self {
            inner: Mutex::new(Inner {
                bus,
                sleep,
                calibration: None,
                cache: ReadingCache::new(),
            }),
            state: StateCell::new(DeviceState::Uninitialized),
        }
    }

    // The cache is only ever assigned whole, so the data behind a poisoned
    // lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Inner<B, D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the calibration, then takes a first measurement.
    ///
    /// # Errors
    /// If the calibration load fails the device keeps whatever calibration it
    /// had before. If the measurement fails the new calibration is kept and
    /// the cache keeps its previous value.
    pub fn initialize(&self) -> Result<(), SensorError<B::Error>> {
        let mut inner = self.lock();
        inner.load_calibration(&self.state)?;
        inner.refresh(&self.state)?;
        info!("bmp180 initialized");
        Ok(())
    }

    /// Takes a new measurement and replaces the cached reading, waiting for
    /// any acquisition already in flight.
    ///
    /// # Errors
    /// [`SensorError::NotCalibrated`] before a successful calibration load,
    /// otherwise any bus or arithmetic failure. The cache is unchanged on
    /// error.
    pub fn refresh(&self) -> Result<(), SensorError<B::Error>> {
        self.lock().refresh(&self.state)
    }

    /// Like [`refresh`](Self::refresh) but returns [`SensorError::Busy`]
    /// instead of waiting when another acquisition holds the device.
    pub fn try_refresh(&self) -> Result<(), SensorError<B::Error>> {
        let mut inner = match self.inner.try_lock() {
            Ok(inner) => inner,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("refresh rejected, acquisition in progress");
                return Err(SensorError::Busy);
            }
        };
        inner.refresh(&self.state)
    }

    /// The last good reading, or the placeholder. Never touches the bus.
    pub fn snapshot(&self) -> ReadingSnapshot {
        self.lock().cache.get()
    }

    /// Opens the text of the current snapshot for sequential reading.
    pub fn open(&self) -> SnapshotReader {
        SnapshotReader::new(self.snapshot())
    }

    /// Current lifecycle state. Does not wait for an acquisition in flight.
    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.lock().calibration
    }

    /// Release the bus and delay handles consuming the device.
    pub fn release(self) -> (B, D) {
        let inner = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (inner.bus, inner.sleep)
    }
}
