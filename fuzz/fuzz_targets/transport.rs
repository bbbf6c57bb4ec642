#![no_main]
use libfuzzer_sys::fuzz_target;
use ms5837_30ba::{mock_utils::SleepNop, Event, TransportError};
use ms5837_30ba_fuzz::FuzzTransport;

// Drives the timeout, nack and short response paths the I2C fuzzer can't
// reach.
fuzz_target!(|data: &[u8]| {
    let transport = FuzzTransport::new(data);
    let pressure_sensor = ms5837_30ba::with_transport(transport, SleepNop).with_diagnostics(
        |event: Event, cause: Option<&TransportError<()>>| {
            assert_eq!(event.is_failure(), cause.is_some());
        },
    );
    if let Ok(mut pressure_sensor) = pressure_sensor.init() {
        let _ = pressure_sensor.read();
    }
});
