//! Stop-and-wait ARQ over a half-duplex link.
//!
//! This module contains:
//! - [`frame`]: Data and ack wire formats
//! - [`sequence`]: The alternating sequence bit
//! - [`config`]: Retry, timeout and payload sizing
//! - [`transceiver`]: Radio and clock capabilities the protocol depends on
//! - [`sender`]: Bounded retry loop for one outstanding frame
//! - [`receiver`]: Duplicate suppression and ack replies
//! - [`station`]: Combined sender/receiver on one radio

mod config;
mod frame;
mod receiver;
mod sender;
mod sequence;
mod station;
mod transceiver;

pub use config::{
    ArqConfig, ArqConfigError, DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL,
};
pub use frame::{
    AckFrame, AckStatus, DataFrame, FrameError, Framer, ACK_FRAME_LEN, DATA_HEADER_LEN,
    DEFAULT_PAYLOAD_CAPACITY, MAX_PAYLOAD_CAPACITY,
};
pub use receiver::{ReceiveEvent, Receiver, ReceiverState};
pub use sender::{SendOutcome, Sender, SenderState};
pub use sequence::SequenceBit;
pub use station::Station;
pub use transceiver::{Clock, RadioMode, SystemClock, Transceiver, TransmitFault};
