//! Radio and clock capabilities the protocol runs on.
//!
//! # Half-Duplex Contract
//!
//! A transceiver is either idle, transmitting or listening, never two at
//! once. Whoever owns it serializes all use: one `Sender`, one `Receiver`, or
//! one [`Station`](super::Station) combining both. Implementations are
//! supplied by the platform (a LoRa driver on hardware, UDP sockets or an
//! in-process loopback on the host).

use std::fmt;
use std::io;
use std::time::{Duration, Instant};

/// What the radio is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioMode {
    #[default]
    Idle,
    Transmitting,
    Listening,
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Transmitting => write!(f, "transmitting"),
            Self::Listening => write!(f, "listening"),
        }
    }
}

/// Half-duplex frame transport.
pub trait Transceiver {
    /// Send one frame. A fault is local; the frame may still have gone out.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransmitFault>;

    /// Enter listening mode. Idempotent.
    fn begin_listening(&mut self);

    /// Return at most one inbound frame, waiting no longer than `max_wait`.
    fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>>;

    /// Signal strength of the last received frame in dBm. Diagnostic only.
    fn last_signal_strength(&self) -> i16;
}

impl<T: Transceiver + ?Sized> Transceiver for &mut T {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransmitFault> {
        (**self).transmit(bytes)
    }

    fn begin_listening(&mut self) {
        (**self).begin_listening()
    }

    fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>> {
        (**self).poll_receive(max_wait)
    }

    fn last_signal_strength(&self) -> i16 {
        (**self).last_signal_strength()
    }
}

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Local transmit errors reported by a transceiver.
#[derive(Debug)]
pub enum TransmitFault {
    /// Underlying socket or bus error.
    Io(io::Error),
    /// Refused to send an empty frame.
    EmptyPacket,
    /// Frame exceeds the transport MTU.
    PacketTooLarge { size: usize, max: usize },
    /// Channel stayed busy.
    ChannelBusy,
}

impl fmt::Display for TransmitFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::EmptyPacket => write!(f, "empty packet"),
            Self::PacketTooLarge { size, max } => {
                write!(f, "packet too large: {} bytes (max {})", size, max)
            }
            Self::ChannelBusy => write!(f, "channel busy"),
        }
    }
}

impl std::error::Error for TransmitFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransmitFault {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_transmit_fault_display() {
        assert_eq!(TransmitFault::ChannelBusy.to_string(), "channel busy");
        assert_eq!(
            TransmitFault::PacketTooLarge { size: 300, max: 255 }.to_string(),
            "packet too large: 300 bytes (max 255)"
        );
    }

    #[test]
    fn test_transmit_fault_source() {
        use std::error::Error;

        let fault = TransmitFault::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(fault.source().is_some());
        assert!(TransmitFault::EmptyPacket.source().is_none());
    }

    #[test]
    fn test_default_mode_is_idle() {
        assert_eq!(RadioMode::default(), RadioMode::Idle);
        assert_eq!(RadioMode::Listening.to_string(), "listening");
    }
}
