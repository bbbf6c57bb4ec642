//! Transports shared by the fuzz targets.

use core::time::Duration;

use ms5837_30ba::{Transport, TransportError};

/// A transport whose every outcome is decided by a byte stream.
///
/// Each transaction consumes one control byte: `0` is a timeout, `1` a nack,
/// anything else succeeds. A successful receive then consumes a length byte
/// followed by up to that many response bytes. Running out of data is a
/// timeout.
pub struct FuzzTransport<'a> {
    data: &'a [u8],
}

impl<'a> FuzzTransport<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn next(&mut self) -> Option<u8> {
        let (first, rest) = self.data.split_first()?;
        self.data = rest;
        Some(*first)
    }

    fn outcome(&mut self) -> Result<(), TransportError<()>> {
        match self.next() {
            None | Some(0) => Err(TransportError::Timeout),
            Some(1) => Err(TransportError::Nack),
            Some(_) => Ok(()),
        }
    }
}

impl Transport for FuzzTransport<'_> {
    type Error = ();

    fn transmit(&mut self, _command: u8, _timeout: Duration) -> Result<(), TransportError<()>> {
        self.outcome()
    }

    fn transmit_then_receive(
        &mut self,
        _command: u8,
        response: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError<()>> {
        self.outcome()?;
        let wanted = usize::from(self.next().ok_or(TransportError::Timeout)?);
        let received = wanted.min(response.len()).min(self.data.len());
        let (head, rest) = self.data.split_at(received);
        response[..received].copy_from_slice(head);
        self.data = rest;
        Ok(received)
    }
}
