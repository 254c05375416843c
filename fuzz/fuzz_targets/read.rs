#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    let pressure_sensor = bmp180::new(i2c, bmp180::mock_utils::SleepNop);
    if let Ok(mut pressure_sensor) = pressure_sensor.init() {
        // Arbitrary calibration words reach both zero divisors; they must
        // come back as errors, never as a panic.
        let _ = pressure_sensor.read_temperature_and_pressure();
    }
});
