//! # Getting started
//!
//! A platform agnostic driver for the [MS5837-30BA](https://www.te.com/commerce/DocumentDelivery/DDEController?Action=showdoc&DocId=Data+Sheet%7FMS5837-30BA%7FB1%7Fpdf%7FEnglish%7FENG_DS_MS5837-30BA_B1.pdf%7FCAT-BLPS0017)
//! pressure and temperature sensor.
//!
//! The driver resets the sensor, loads its factory calibration and then
//! turns pairs of raw ADC conversions into second order compensated pressure
//! (mbar) and temperature (°C).
//!
//! ## Example
//! ```rust
//! # // NOTE: Use real i2c instance for your app.
//! # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! # let i2c = I2cMock::new(&[I2cTransaction::write(0x76, vec![0x1E]),
//! #     I2cTransaction::write_read(0x76, vec![0xA0], vec![0x20, 0x00]),
//! #     I2cTransaction::write_read(0x76, vec![0xA2], vec![0x88, 0xA6]),
//! #     I2cTransaction::write_read(0x76, vec![0xA4], vec![0x8E, 0x00]),
//! #     I2cTransaction::write_read(0x76, vec![0xA6], vec![0x4F, 0x68]),
//! #     I2cTransaction::write_read(0x76, vec![0xA8], vec![0x57, 0x52]),
//! #     I2cTransaction::write_read(0x76, vec![0xAA], vec![0x68, 0x16]),
//! #     I2cTransaction::write_read(0x76, vec![0xAC], vec![0x66, 0x22]),
//! #     I2cTransaction::write(0x76, vec![0x4A]),
//! #     I2cTransaction::write_read(0x76, vec![0x00], vec![0x4B, 0xA7, 0xE3]),
//! #     I2cTransaction::write(0x76, vec![0x5A]),
//! #     I2cTransaction::write_read(0x76, vec![0x00], vec![0x67, 0xFE, 0xB6]),
//! # ]);
//! use ms5837_30ba::mock_utils::SleepNop;
//! // NOTE: You should pass a real delay implementation for this driver to
//! // work correctly.
//! let mut pressure_sensor = ms5837_30ba::initialize(i2c, 0x76, SleepNop).unwrap();
//! let sample = pressure_sensor.read().unwrap();
//! assert_eq!(sample.pressure_mbar, 3999.8);
//! assert_eq!(sample.temperature_c, 19.82);
//! ```
//!
//! ## Concurrency
//!
//! Every call blocks until the bus transactions complete. The driver does no
//! locking of its own: hosts sharing a bus must arrange exclusive access for
//! the duration of each `init` and `read` call.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

use core::time::Duration;

use embedded_hal::blocking::{delay::DelayUs, i2c::WriteRead};

mod calibration;
mod compensation;
mod diagnostics;
mod error;
mod transport;

pub use calibration::{CalibrationTable, PROM_WORDS};
pub use compensation::{compensate, CalibratedSample, RawSample};
#[cfg(feature = "log")]
pub use diagnostics::LogSink;
pub use diagnostics::{DiagnosticSink, Event, NoDiagnostics};
pub use error::{Channel, InitStage, SensorError, TransportError};
pub use transport::{I2cMarker, I2cTransport, Transport, DEFAULT_ADDRESS};

/// Total number of reset attempts before initialisation gives up.
pub const RESET_ATTEMPTS: u8 = 5;
/// Pause between two reset attempts.
pub const RESET_RETRY_DELAY_US: u32 = 100_000;
/// Time the device needs after a reset before it accepts commands.
pub const RESET_SETTLE_TIME_US: u32 = 20_000;
/// Conversion time at the maximum oversampling ratio (8192).
pub const CONVERSION_TIME_US: u32 = 20_000;

/// Oversampling ratio bits for OSR 8192, the only ratio this driver uses.
const OSR_8192: u8 = 0x0A;

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
}

/// Driver configuration.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Config {
    /// Upper bound on each individual bus transaction.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
        }
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

/// Create an uninitialised driver object for a sensor at [`DEFAULT_ADDRESS`].
///
/// # Example
///
/// ```
/// // NOTE: Use real i2c instance for your app.
/// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// use ms5837_30ba::mock_utils::SleepNop;
/// // NOTE: You should pass a real delay implementation for this driver to
/// // work correctly.
/// let i2c = I2cMock::new(&[]);
/// let pressure_sensor = ms5837_30ba::new(i2c, SleepNop);
/// ```
pub fn new<I2C: I2cMarker, D: DelayUs<u32>>(
    i2c: I2C,
    sleep: D,
) -> Uninitialised<I2cTransport<I2C>, D> {
    with_transport(I2cTransport::new(i2c, DEFAULT_ADDRESS), sleep)
}

/// Create an uninitialised driver object talking through any [`Transport`].
pub fn with_transport<T: Transport, D: DelayUs<u32>>(transport: T, sleep: D) -> Uninitialised<T, D> {
    Uninitialised {
        transport,
        sleep,
        sink: NoDiagnostics,
        config: Config::default(),
    }
}

/// Reset the sensor at `address` and load its calibration with the default
/// configuration.
pub fn initialize<I2C: I2cMarker, D: DelayUs<u32>>(
    i2c: I2C,
    address: u8,
    sleep: D,
) -> Result<Initialised<I2cTransport<I2C>, D>, SensorError<<I2C as WriteRead>::Error>> {
    with_transport(I2cTransport::new(i2c, address), sleep).init()
}

/// An I2C command to send to the pressure sensor.
enum Command {
    Reset,
    ConvertD1,
    ConvertD2,
    AdcRead,
    PromRead(u8),
}

/// Convert the command into a single byte that can be sent over i2c.
impl From<Command> for u8 {
    fn from(val: Command) -> u8 {
        use Command::*;
        match val {
            Reset => 0x1E,
            ConvertD1 => 0x40u8 | OSR_8192,
            ConvertD2 => 0x50u8 | OSR_8192,
            AdcRead => 0x00,
            PromRead(address) => 0xA0u8 + (address << 1),
        }
    }
}

/// Fails unless a response carried exactly the expected number of bytes.
fn expect_length<E>(expected: usize, received: usize) -> Result<(), TransportError<E>> {
    if received != expected {
        return Err(TransportError::ShortResponse { expected, received });
    }
    Ok(())
}

/// An uninitialised ms5837 object.
pub struct Uninitialised<
    T: Transport,
    D: DelayUs<u32>,
    S: DiagnosticSink<T::Error> = NoDiagnostics,
> {
    transport: T,
    sleep: D,
    sink: S,
    config: Config,
}

impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> State for Uninitialised<T, D, S> {}
impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> sealed::Sealed
    for Uninitialised<T, D, S>
{
}

impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> Uninitialised<T, D, S> {
    /// Replaces the driver configuration, [`Config::default`] unless set.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Routes driver events to `sink`.
    pub fn with_diagnostics<S2: DiagnosticSink<T::Error>>(
        self,
        sink: S2,
    ) -> Uninitialised<T, D, S2> {
        Uninitialised {
            transport: self.transport,
            sleep: self.sleep,
            sink,
            config: self.config,
        }
    }

    /// Reset the ms5837 internal state machine, retrying a failed reset.
    fn reset(&mut self) -> Result<(), TransportError<T::Error>> {
        let mut attempt = 1;
        loop {
            match self
                .transport
                .transmit(Command::Reset.into(), self.config.timeout)
            {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= RESET_ATTEMPTS => return Err(e),
                Err(e) => {
                    self.sink.event(Event::ResetRetry { attempt }, Some(&e));
                    self.sleep.delay_us(RESET_RETRY_DELAY_US);
                    attempt += 1;
                }
            }
        }
    }

    /// Read the contents of the PROM. On failure returns the slot that
    /// could not be read.
    fn read_calibration(&mut self) -> Result<CalibrationTable, (u8, TransportError<T::Error>)> {
        let mut prom = [0u16; PROM_WORDS];
        for (slot, entry) in (0u8..).zip(prom.iter_mut()) {
            let mut buffer = [0, 0];
            self.transport
                .transmit_then_receive(
                    Command::PromRead(slot).into(),
                    &mut buffer,
                    self.config.timeout,
                )
                .and_then(|received| expect_length(buffer.len(), received))
                .map_err(|cause| (slot, cause))?;
            *entry = u16::from_be_bytes(buffer);
        }
        Ok(CalibrationTable::new(prom))
    }

    /// Reports the failure and drops the transport.
    fn fail(mut self, stage: InitStage, cause: TransportError<T::Error>) -> SensorError<T::Error> {
        self.sink.event(Event::InitializationFailed { stage }, Some(&cause));
        SensorError::InitializationFailed { stage, cause }
    }

    /// Releases the transport and delay handles consuming the driver object.
    ///
    /// # Example
    ///
    /// ```
    /// // NOTE: Use real i2c instance for your app.
    /// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// // Dummy sleep implementation.
    /// use ms5837_30ba::mock_utils::SleepNop;
    /// let i2c = I2cMock::new(&[]);
    /// let pressure_sensor = ms5837_30ba::new(i2c, SleepNop);
    /// let (transport, _) = pressure_sensor.release();
    /// let i2c = transport.release();
    /// ```
    pub fn release(self) -> (T, D) {
        (self.transport, self.sleep)
    }

    /// Initialises the pressure sensor.
    ///
    /// Resets the device, retrying up to [`RESET_ATTEMPTS`] times, waits for
    /// it to settle and reads all [`PROM_WORDS`] calibration words. The CRC is
    /// not checked; see [`CalibrationTable::verify_checksum`].
    ///
    /// # Errors
    /// Initialisation fails with [`SensorError::InitializationFailed`] if;
    /// - Every reset attempt failed.
    /// - Any PROM word could not be read in full. Reads are not retried.
    ///
    /// NOTE: on failure the transport is dropped before the error is returned.
    ///
    /// # Example
    ///
    /// ```rust
    /// // NOTE: Use real i2c instance for your app.
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// # let i2c = I2cMock::new(&[I2cTransaction::write(0x76, vec![0x1E]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA0], vec![0x6F, 0xA6]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA2], vec![0x8E, 0x00]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA4], vec![0x4F, 0x68]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA6], vec![0x57, 0x52]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA8], vec![0x66, 0x22]),
    /// #     I2cTransaction::write_read(0x76, vec![0xAA], vec![0x66, 0x22]),
    /// #     I2cTransaction::write_read(0x76, vec![0xAC], vec![0x66, 0x22])
    /// # ]);
    /// use ms5837_30ba::mock_utils::SleepNop;
    /// let pressure_sensor = ms5837_30ba::new(i2c, SleepNop);
    /// let pressure_sensor = pressure_sensor.init();
    /// ```
    pub fn init(mut self) -> Result<Initialised<T, D, S>, SensorError<T::Error>> {
        self.sink.event(Event::Resetting, None);
        if let Err(cause) = self.reset() {
            return Err(self.fail(InitStage::Reset, cause));
        }
        self.sleep.delay_us(RESET_SETTLE_TIME_US);

        self.sink.event(Event::ReadingCalibration, None);
        let calibration = match self.read_calibration() {
            Ok(calibration) => calibration,
            Err((slot, cause)) => return Err(self.fail(InitStage::Calibration { slot }, cause)),
        };

        self.sink.event(Event::Ready, None);
        Ok(Initialised {
            transport: self.transport,
            calibration,
            sleep: self.sleep,
            sink: self.sink,
            config: self.config,
        })
    }
}

/// An initialised ms5837 object.
pub struct Initialised<
    T: Transport,
    D: DelayUs<u32>,
    S: DiagnosticSink<T::Error> = NoDiagnostics,
> {
    transport: T,
    calibration: CalibrationTable,
    sleep: D,
    sink: S,
    config: Config,
}

impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> State for Initialised<T, D, S> {}
impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> sealed::Sealed
    for Initialised<T, D, S>
{
}

impl<T: Transport, D: DelayUs<u32>, S: DiagnosticSink<T::Error>> Initialised<T, D, S> {
    /// Release the transport and delay handles consuming the driver.
    pub fn release(self) -> (T, D) {
        (self.transport, self.sleep)
    }

    /// The factory calibration loaded during initialisation.
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    // Starts a conversion and reads back the 24 bit ADC result.
    fn convert(&mut self, command: Command) -> Result<u32, TransportError<T::Error>> {
        let mut buffer = [0u8; 4];
        self.transport
            .transmit(command.into(), self.config.timeout)?;
        self.sleep.delay_us(CONVERSION_TIME_US);
        let received = self.transport.transmit_then_receive(
            Command::AdcRead.into(),
            // ADC is 24bit but we are storing in u32.
            &mut buffer[1..],
            self.config.timeout,
        )?;
        expect_length(3, received)?;
        Ok(u32::from_be_bytes(buffer))
    }

    fn read_channel(&mut self, channel: Channel) -> Result<u32, SensorError<T::Error>> {
        let command = match channel {
            Channel::Pressure => Command::ConvertD1,
            Channel::Temperature => Command::ConvertD2,
        };
        self.convert(command).map_err(|cause| {
            self.sink.event(Event::ConversionFailed { channel }, Some(&cause));
            SensorError::ConversionFailed { channel, cause }
        })
    }

    /// Runs the pressure then the temperature conversion and returns the raw
    /// ADC words.
    ///
    /// # Errors
    /// Any bus failure aborts the read with [`SensorError::ConversionFailed`].
    pub fn read_raw(&mut self) -> Result<RawSample, SensorError<T::Error>> {
        let pressure = self.read_channel(Channel::Pressure)?;
        let temperature = self.read_channel(Channel::Temperature)?;
        Ok(RawSample {
            pressure,
            temperature,
        })
    }

    /// Reads the temperature and pressure samples from the sensor.
    ///
    /// Takes two conversions at the maximum oversampling ratio, about 40 ms
    /// in total.
    ///
    /// # Errors
    /// This returns [`SensorError::ConversionFailed`] if there is a problem
    /// with bus communication. Nothing is retried and no partial sample is
    /// returned.
    ///
    /// # Example
    ///
    /// ```rust
    /// # // NOTE: Use real i2c instance for your app.
    /// # use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    /// # let i2c = I2cMock::new(&[I2cTransaction::write(0x76, vec![0x1E]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA0], vec![0x6F, 0xA6]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA2], vec![0x8E, 0x00]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA4], vec![0x4F, 0x68]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA6], vec![0x57, 0x52]),
    /// #     I2cTransaction::write_read(0x76, vec![0xA8], vec![0x66, 0x22]),
    /// #     I2cTransaction::write_read(0x76, vec![0xAA], vec![0x66, 0x22]),
    /// #     I2cTransaction::write_read(0x76, vec![0xAC], vec![0x66, 0x22]),
    /// #     I2cTransaction::write(0x76, vec![0x4A]),
    /// #     I2cTransaction::write_read(0x76, vec![0x00], vec![0x4B, 0xA7, 0xE3]),
    /// #     I2cTransaction::write(0x76, vec![0x5A]),
    /// #     I2cTransaction::write_read(0x76, vec![0x00], vec![0x67, 0xFE, 0xB6]),
    /// # ]);
    /// use ms5837_30ba::mock_utils::SleepNop;
    /// let pressure_sensor = ms5837_30ba::new(i2c, SleepNop);
    /// let mut pressure_sensor = pressure_sensor.init().unwrap();
    /// println!("{:?}", pressure_sensor.read().unwrap());
    /// ```
    pub fn read(&mut self) -> Result<CalibratedSample, SensorError<T::Error>> {
        let raw = self.read_raw()?;
        Ok(compensate(&self.calibration, raw))
    }
}
