//! Compensated readings and their text rendering.

use core::fmt::{self, Write};

use heapless::String;

/// Capacity of the rendered text. The widest rendering, with both values
/// at `i32::MIN`, is 55 bytes.
pub const TEXT_CAPACITY: usize = 64;

/// Text shown before the first successful measurement.
pub const NO_DATA: &str = "No data\n";

/// A group of temperature and pressure samples. These are grouped as pressure
/// compensation requires sampling the current temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensatedReading {
    /// Deci-degrees Celsius, 150 is 15.0 °C.
    pub temperature: i32,
    /// Pascals.
    pub pressure: i32,
}

/// Renders `Temperature: 15.0 °C\nPressure: 69964 Pa\n`.
///
/// Negative temperatures carry a single minus sign, so -15 renders as
/// `-1.5` and -5 as `-0.5`.
impl fmt::Display for CompensatedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.temperature < 0 { "-" } else { "" };
        let magnitude = self.temperature.unsigned_abs();
        write!(
            f,
            "Temperature: {}{}.{} °C\nPressure: {} Pa\n",
            sign,
            magnitude / 10,
            magnitude % 10,
            self.pressure
        )
    }
}

/// The cached result of the last successful acquisition together with its
/// rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingSnapshot {
    reading: Option<CompensatedReading>,
    text: String<TEXT_CAPACITY>,
}

impl ReadingSnapshot {
    /// The "no data yet" snapshot.
    pub fn placeholder() -> Self {
        let mut text = String::new();
        // NO_DATA is far below TEXT_CAPACITY.
        let pushed = text.push_str(NO_DATA);
        debug_assert!(pushed.is_ok());
        Self {
            reading: None,
            text,
        }
    }

    pub fn from_reading(reading: CompensatedReading) -> Self {
        let mut text = String::new();
        // Cannot fail, see TEXT_CAPACITY.
        let written = write!(text, "{}", reading);
        debug_assert!(written.is_ok());
        Self {
            reading: Some(reading),
            text,
        }
    }

    /// `None` until a measurement has succeeded.
    pub fn reading(&self) -> Option<CompensatedReading> {
        self.reading
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl Default for ReadingSnapshot {
    fn default() -> Self {
        Self::placeholder()
    }
}
