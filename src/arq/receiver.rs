//! Stop-and-wait receiver with one-bit duplicate suppression.
//!
//! The only protocol memory is the sequence bit of the last accepted frame.
//! One bit is enough because the sender never has more than one frame in
//! flight: a retransmission after a lost ack carries the same bit as the
//! frame already accepted and is answered with DUPLICATE instead of being
//! delivered again.

use super::frame::{AckFrame, AckStatus, FrameError, Framer};
use super::sequence::SequenceBit;
use super::transceiver::Transceiver;
use crate::stats::{bump, LinkStats};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Where the receiver is in handling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    #[default]
    Listening,
    Validating,
    Accepting,
    RejectingDuplicate,
    RejectingMalformed,
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// New frame; `payload` is for the application, exactly once.
    Accepted {
        sequence: SequenceBit,
        payload: Vec<u8>,
    },
    /// Retransmission of the last accepted frame; nothing to deliver.
    Duplicate { sequence: SequenceBit },
    /// Wrong frame length; nothing to deliver.
    Malformed { len: usize },
}

impl ReceiveEvent {
    /// Payload to hand to the application, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Accepted { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Receiving half of the protocol.
#[derive(Debug)]
pub struct Receiver {
    framer: Framer,
    last_accepted: Option<SequenceBit>,
    state: ReceiverState,
    stats: Arc<LinkStats>,
}

impl Receiver {
    /// Create a receiver that has accepted nothing yet.
    pub fn new(framer: Framer) -> Self {
        Self {
            framer,
            last_accepted: None,
            state: ReceiverState::Listening,
            stats: Arc::new(LinkStats::new("receiver")),
        }
    }

    /// Record counters into shared stats.
    pub fn with_stats(mut self, stats: Arc<LinkStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Sequence bit of the last newly accepted frame.
    pub fn last_accepted(&self) -> Option<SequenceBit> {
        self.last_accepted
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.stats
    }

    /// Validate one inbound frame and decide the reply, updating delivery
    /// state. Does no I/O.
    pub fn classify(&mut self, bytes: &[u8]) -> (ReceiveEvent, AckFrame) {
        self.state = ReceiverState::Validating;

        let frame = match self.framer.decode_data(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.state = ReceiverState::RejectingMalformed;
                bump(&self.stats.receiver.malformed_rejected);
                // Echo is advisory: a short frame may not carry a real sequence byte.
                let echo = bytes.first().copied().map(SequenceBit::from_byte).unwrap_or_default();
                if let FrameError::BadLength { len, expected } = e {
                    info!("Bad length {} (want {}) -> ACK(BAD_LENGTH) seq {}", len, expected, echo);
                }
                return (
                    ReceiveEvent::Malformed { len: bytes.len() },
                    self.framer.encode_ack(echo, AckStatus::BadLength),
                );
            }
        };

        let sequence = frame.sequence;
        if self.last_accepted == Some(sequence) {
            self.state = ReceiverState::RejectingDuplicate;
            bump(&self.stats.receiver.duplicates_rejected);
            info!("Duplicate seq {} -> ACK(DUPLICATE)", sequence);
            return (
                ReceiveEvent::Duplicate { sequence },
                self.framer.encode_ack(sequence, AckStatus::Duplicate),
            );
        }

        self.state = ReceiverState::Accepting;
        self.last_accepted = Some(sequence);
        bump(&self.stats.receiver.frames_accepted);
        info!("Accepted seq {} -> ACK(DELIVERED)", sequence);
        (
            ReceiveEvent::Accepted {
                sequence,
                payload: frame.payload,
            },
            self.framer.encode_ack(sequence, AckStatus::Delivered),
        )
    }

    /// Handle one inbound frame: classify, send the ack, resume listening.
    ///
    /// An ack transmit fault is logged; the delivery decision stands and the
    /// sender's retransmission will be answered as a duplicate.
    pub fn handle<T: Transceiver + ?Sized>(&mut self, radio: &mut T, bytes: &[u8]) -> ReceiveEvent {
        let (event, ack) = self.classify(bytes);

        match radio.transmit(&ack.to_bytes()) {
            Ok(()) => bump(&self.stats.receiver.acks_sent),
            Err(e) => {
                bump(&self.stats.receiver.ack_transmit_faults);
                warn!("Ack transmit error for seq {}: {}", ack.sequence, e);
            }
        }
        radio.begin_listening();
        self.state = ReceiverState::Listening;

        event
    }

    /// Listen for up to `max_wait` and handle at most one frame.
    pub fn poll<T: Transceiver + ?Sized>(
        &mut self,
        radio: &mut T,
        max_wait: Duration,
    ) -> Option<ReceiveEvent> {
        radio.begin_listening();
        let bytes = radio.poll_receive(max_wait)?;
        debug!("RX {} bytes, RSSI {} dBm", bytes.len(), radio.last_signal_strength());
        Some(self.handle(radio, &bytes))
    }
}
