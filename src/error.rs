use core::fmt;

/// A failure reported by the transport, or detected by the driver while
/// decoding a transport response.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<E> {
    /// The transaction did not complete within the caller supplied timeout.
    Timeout,
    /// The device did not acknowledge the transfer.
    Nack,
    /// Any other bus failure, passed through untouched.
    Bus(E),
    /// The device answered with fewer bytes than the command requires.
    ShortResponse { expected: usize, received: usize },
}

/// The step of initialisation that failed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStage {
    /// Every reset attempt failed.
    Reset,
    /// Reading the PROM word at `slot` failed.
    Calibration { slot: u8 },
}

/// Which ADC channel a conversion was sampling.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// D1
    Pressure,
    /// D2
    Temperature,
}

/// A catch all error for this driver
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError<E> {
    /// The device never reached the ready state. The transport handle has
    /// been dropped.
    InitializationFailed {
        stage: InitStage,
        cause: TransportError<E>,
    },
    /// One of the bus operations making up a reading failed.
    ConversionFailed {
        channel: Channel,
        cause: TransportError<E>,
    },
    /// The PROM contents do not match their CRC-4.
    PromCrcMismatch { got: u8, expected: u8 },
}

impl<E> SensorError<E> {
    /// The transport failure behind this error, if there is one.
    pub fn cause(&self) -> Option<&TransportError<E>> {
        match self {
            SensorError::InitializationFailed { cause, .. }
            | SensorError::ConversionFailed { cause, .. } => Some(cause),
            SensorError::PromCrcMismatch { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause(), Some(TransportError::Timeout))
    }
}

impl<E: fmt::Debug> fmt::Display for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => f.write_str("bus transaction timed out"),
            TransportError::Nack => f.write_str("device did not acknowledge"),
            TransportError::Bus(e) => write!(f, "bus error: {:?}", e),
            TransportError::ShortResponse { expected, received } => write!(
                f,
                "short response: expected {} bytes, received {}",
                expected, received
            ),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::InitializationFailed {
                stage: InitStage::Reset,
                cause,
            } => write!(f, "initialisation failed during reset: {}", cause),
            SensorError::InitializationFailed {
                stage: InitStage::Calibration { slot },
                cause,
            } => write!(
                f,
                "initialisation failed reading PROM word {}: {}",
                slot, cause
            ),
            SensorError::ConversionFailed { channel, cause } => {
                write!(f, "{:?} conversion failed: {}", channel, cause)
            }
            SensorError::PromCrcMismatch { got, expected } => write!(
                f,
                "PROM crc mismatch: got {:#x}, expected {:#x}",
                got, expected
            ),
        }
    }
}
