//! Caller supplied diagnostics.
//!
//! The driver holds no global state; anything worth reporting is handed to
//! the [`DiagnosticSink`] owned by the device. Failure events come with the
//! [`TransportError`] that caused them.

use crate::{Channel, InitStage, TransportError};

/// Something noteworthy that happened while talking to the device.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The reset sequence is starting.
    Resetting,
    /// Reset attempt `attempt` (1 based) failed and will be retried.
    ResetRetry { attempt: u8 },
    /// Reading the factory calibration from the PROM.
    ReadingCalibration,
    /// Initialisation completed.
    Ready,
    /// Initialisation gave up at `stage`.
    InitializationFailed { stage: InitStage },
    /// A conversion on `channel` failed.
    ConversionFailed { channel: Channel },
}

impl Event {
    /// Whether this event reports a failed transaction. These are the only
    /// events delivered with a cause.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::ResetRetry { .. }
                | Event::InitializationFailed { .. }
                | Event::ConversionFailed { .. }
        )
    }
}

/// Receives driver [`Event`]s, along with the transport error behind each
/// failure.
///
/// `E` is the error type of the device's transport.
pub trait DiagnosticSink<E> {
    fn event(&mut self, event: Event, cause: Option<&TransportError<E>>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl<E> DiagnosticSink<E> for NoDiagnostics {
    fn event(&mut self, _event: Event, _cause: Option<&TransportError<E>>) {
        // Nop
    }
}

impl<E, F: FnMut(Event, Option<&TransportError<E>>)> DiagnosticSink<E> for F {
    fn event(&mut self, event: Event, cause: Option<&TransportError<E>>) {
        self(event, cause)
    }
}

/// Forwards events to the [`log`] facade under the `ms5837` target.
#[cfg(feature = "log")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

/// Renders an optional cause as ` (cause)`.
#[cfg(feature = "log")]
struct Because<'a, E>(Option<&'a TransportError<E>>);

#[cfg(feature = "log")]
impl<E: core::fmt::Debug> core::fmt::Display for Because<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(cause) => write!(f, " ({})", cause),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "log")]
impl<E: core::fmt::Debug> DiagnosticSink<E> for LogSink {
    fn event(&mut self, event: Event, cause: Option<&TransportError<E>>) {
        const TARGET: &str = "ms5837";
        let because = Because(cause);
        match event {
            Event::Resetting => log::info!(target: TARGET, "Resetting sensor..."),
            Event::ResetRetry { attempt } => {
                log::warn!(
                    target: TARGET,
                    "Reset attempt {} failed{}, retrying...",
                    attempt,
                    because
                )
            }
            Event::ReadingCalibration => log::info!(target: TARGET, "Reading calibration..."),
            Event::Ready => log::debug!(target: TARGET, "Sensor ready"),
            Event::InitializationFailed { stage } => {
                log::error!(target: TARGET, "Initialisation failed: {:?}{}", stage, because)
            }
            Event::ConversionFailed { channel } => {
                log::error!(target: TARGET, "{:?} conversion failed{}", channel, because)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::{String, ToString};
    use std::vec::Vec;

    #[test]
    fn closures_collect_events_with_causes() {
        let mut seen = Vec::new();
        {
            let mut collect = |event: Event, cause: Option<&TransportError<u8>>| {
                seen.push((event, cause.cloned()))
            };
            let sink: &mut dyn DiagnosticSink<u8> = &mut collect;
            sink.event(Event::Resetting, None);
            sink.event(Event::ResetRetry { attempt: 1 }, Some(&TransportError::Bus(7)));
        }
        assert_eq!(
            seen,
            [
                (Event::Resetting, None),
                (Event::ResetRetry { attempt: 1 }, Some(TransportError::Bus(7))),
            ]
        );
    }

    #[test]
    fn failure_events() {
        assert!(!Event::Resetting.is_failure());
        assert!(!Event::Ready.is_failure());
        assert!(Event::ResetRetry { attempt: 3 }.is_failure());
        assert!(Event::InitializationFailed {
            stage: InitStage::Calibration { slot: 2 }
        }
        .is_failure());
        assert!(Event::ConversionFailed {
            channel: Channel::Pressure
        }
        .is_failure());
    }

    #[cfg(feature = "log")]
    #[test]
    fn log_lines_name_the_cause() {
        let cause: TransportError<u8> = TransportError::Timeout;
        let rendered: String = Because(Some(&cause)).to_string();
        assert_eq!(rendered, std::format!(" ({})", cause));
        assert_eq!(Because::<u8>(None).to_string(), "");
    }

    #[cfg(feature = "log")]
    #[test]
    fn log_sink_accepts_every_event() {
        let mut log_sink = LogSink;
        let sink: &mut dyn DiagnosticSink<u8> = &mut log_sink;
        let cause = TransportError::Nack;
        sink.event(Event::Resetting, None);
        sink.event(Event::ResetRetry { attempt: 2 }, Some(&cause));
        sink.event(Event::ReadingCalibration, None);
        sink.event(Event::Ready, None);
        sink.event(
            Event::InitializationFailed {
                stage: InitStage::Reset,
            },
            Some(&cause),
        );
        sink.event(
            Event::ConversionFailed {
                channel: Channel::Temperature,
            },
            Some(&cause),
        );
    }
}
