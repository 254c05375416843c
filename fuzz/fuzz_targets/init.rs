#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    let sensor = bmp180::new(i2c, bmp180::mock_utils::SleepNop);
    // Only crashes matter. Any decoded calibration is run through the
    // temperature formula at the edges of the raw range and at UT = AC6.
    if let Ok(sensor) = sensor.init() {
        let calibration = *sensor.calibration();
        for ut in [0, 1, i32::from(calibration.ac6), 0xFFFF] {
            let _ = bmp180::true_temperature(ut, &calibration);
        }
    }
});
