//! The bus seam between the driver and the host.
//!
//! The driver only ever sends single byte commands, optionally followed by a
//! read of a fixed number of response bytes. [`Transport`] captures exactly
//! that, which keeps the driver independent of any particular bus stack.
//! [`I2cTransport`] implements it for any `embedded-hal` blocking I²C bus.

use core::time::Duration;

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::TransportError;

/// 7-bit I²C address of the MS5837-30BA.
pub const DEFAULT_ADDRESS: u8 = 0x76;

/// A blocking, command oriented connection to a single device.
///
/// Implementations are bound to one device address. `timeout` bounds how long
/// each call may block; implementations that cannot honour it should rely on
/// the bus peripheral's own timeout.
pub trait Transport {
    type Error;

    /// Sends `command` on its own.
    fn transmit(&mut self, command: u8, timeout: Duration)
        -> Result<(), TransportError<Self::Error>>;

    /// Sends `command` and reads the device's answer into `response`,
    /// returning how many bytes were received.
    fn transmit_then_receive(
        &mut self,
        command: u8,
        response: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError<Self::Error>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn transmit(
        &mut self,
        command: u8,
        timeout: Duration,
    ) -> Result<(), TransportError<Self::Error>> {
        (**self).transmit(command, timeout)
    }

    fn transmit_then_receive(
        &mut self,
        command: u8,
        response: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError<Self::Error>> {
        (**self).transmit_then_receive(command, response, timeout)
    }
}

/// Bus traits required by [`I2cTransport`].
pub trait I2cMarker: WriteRead + Write
where
    Self: Write<Error = <Self as WriteRead>::Error>,
{
}
impl<T: WriteRead + Write> I2cMarker for T where Self: Write<Error = <Self as WriteRead>::Error> {}

/// A [`Transport`] over an `embedded-hal` blocking I²C bus.
///
/// The HAL traits carry no per call timeout, so the timeout passed by the
/// driver is left to the bus configuration. Every HAL error surfaces as
/// [`TransportError::Bus`].
///
/// # Example
///
/// ```
/// use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
/// use ms5837_30ba::{I2cTransport, Transport};
/// use core::time::Duration;
///
/// let mut i2c = I2cMock::new(&[I2cTransaction::write(0x77, vec![0x1E])]);
/// let mut transport = I2cTransport::new(i2c.clone(), 0x77);
/// transport.transmit(0x1E, Duration::from_millis(10)).unwrap();
/// i2c.done();
/// ```
pub struct I2cTransport<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2cMarker> I2cTransport<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2cMarker> Transport for I2cTransport<I2C> {
    type Error = <I2C as WriteRead>::Error;

    fn transmit(
        &mut self,
        command: u8,
        _timeout: Duration,
    ) -> Result<(), TransportError<Self::Error>> {
        self.i2c
            .write(self.address, &[command])
            .map_err(TransportError::Bus)
    }

    fn transmit_then_receive(
        &mut self,
        command: u8,
        response: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError<Self::Error>> {
        self.i2c
            .write_read(self.address, &[command], response)
            .map_err(TransportError::Bus)?;
        Ok(response.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::{
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
        MockError,
    };
    use std::io::ErrorKind;

    const TIMEOUT: Duration = Duration::from_millis(1000);

    #[test]
    fn transmit_targets_bound_address() {
        let i2c = I2cMock::new(&[I2cTransaction::write(0x77, vec![0x4A])]);
        let mut transport = I2cTransport::new(i2c, 0x77);
        assert_eq!(transport.address(), 0x77);
        transport.transmit(0x4A, TIMEOUT).unwrap();
        let mut i2c = transport.release();
        i2c.done();
    }

    #[test]
    fn transmit_then_receive_fills_response() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(
            DEFAULT_ADDRESS,
            vec![0x00],
            vec![0x12, 0x34, 0x56],
        )]);
        let mut transport = I2cTransport::new(i2c, DEFAULT_ADDRESS);
        let mut buffer = [0u8; 3];
        let received = transport
            .transmit_then_receive(0x00, &mut buffer, TIMEOUT)
            .unwrap();
        assert_eq!(received, 3);
        assert_eq!(buffer, [0x12, 0x34, 0x56]);
        let mut i2c = transport.release();
        i2c.done();
    }

    #[test]
    fn bus_errors_are_wrapped() {
        let i2c = I2cMock::new(&[I2cTransaction::write(DEFAULT_ADDRESS, vec![0x1E])
            .with_error(MockError::Io(ErrorKind::Other))]);
        let mut transport = I2cTransport::new(i2c, DEFAULT_ADDRESS);
        let err = transport.transmit(0x1E, TIMEOUT).unwrap_err();
        assert_eq!(err, TransportError::Bus(MockError::Io(ErrorKind::Other)));
        let mut i2c = transport.release();
        i2c.done();
    }

    #[test]
    fn borrowed_transport_forwards() {
        let i2c = I2cMock::new(&[I2cTransaction::write(DEFAULT_ADDRESS, vec![0x1E])]);
        let mut transport = I2cTransport::new(i2c, DEFAULT_ADDRESS);
        {
            let mut borrowed = &mut transport;
            Transport::transmit(&mut borrowed, 0x1E, TIMEOUT).unwrap();
        }
        let mut i2c = transport.release();
        i2c.done();
    }
}
