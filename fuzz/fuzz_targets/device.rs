#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;
use std::io::Read;

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    let device = bmp180::Bmp180Device::new(i2c, bmp180::mock_utils::SleepNop);
    let _ = device.initialize();
    let _ = device.refresh();
    // Whatever happened above, the text must stay readable to the end.
    let mut text = String::new();
    device.open().read_to_string(&mut text).unwrap();
    assert!(text.ends_with('\n'));
});
