#![no_main]
use embedded_hal_fuzz::{i2c::I2cFuzz, shared_data::FuzzData};
use libfuzzer_sys::fuzz_target;
use ms5837_30ba::{mock_utils::SleepNop, DEFAULT_ADDRESS};

type Error = ();

fuzz_target!(|data: &[u8]| {
    let data = FuzzData::new(data);
    let i2c: I2cFuzz<'_, Error> = I2cFuzz::new(data);
    if let Ok(mut pressure_sensor) = ms5837_30ba::initialize(i2c, DEFAULT_ADDRESS, SleepNop) {
        // We ignore the result as it is likely garbage. We don't care about
        // the result/error just if it crashes or not.
        let _ = pressure_sensor.read();
        let _ = pressure_sensor.calibration().verify_checksum::<Error>();
    }
});
