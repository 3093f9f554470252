//! Reliable point-to-point delivery over a lossy half-duplex radio link.
//!
//! The protocol is stop-and-wait ARQ with a one-bit alternating sequence
//! number: one fixed-size data frame in flight, a two-byte ack back, bounded
//! retransmission, and receiver-side duplicate suppression. Everything
//! protocol-related lives in [`arq`] and only talks to the outside world
//! through the [`arq::Transceiver`] and [`arq::Clock`] traits, so it runs the
//! same against a radio driver, the UDP simulator in [`sim`], or a fully
//! deterministic in-process loopback.

pub mod arq;
pub mod config;
pub mod sim;
pub mod stats;
pub mod transfer;

// Re-export commonly used items
pub use arq::{
    AckStatus, ArqConfig, Clock, Framer, ReceiveEvent, Receiver, SendOutcome, Sender,
    SequenceBit, Station, SystemClock, Transceiver, TransmitFault,
};
pub use config::{ConfigError, ConfigOverrides, LinkConfig};
pub use stats::{LinkStats, StatsServer};
pub use transfer::{send_file, FileAssembler, TransferError, TransferReport};
