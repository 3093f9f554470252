//! A device that both listens for frames and originates its own sends.
//!
//! # Half-Duplex Management
//!
//! The station owns the only handle to the transceiver. It sits in listening
//! mode between calls. [`Station::send`] suspends listening for exactly the
//! duration of the stop-and-wait exchange and resumes listening before
//! returning, so the window where inbound data frames go unseen is one send
//! call. While a send awaits its ack, inbound data frames fail to decode as
//! acks and are dropped; their sender will retransmit.

use super::config::ArqConfig;
use super::frame::{FrameError, Framer};
use super::receiver::{ReceiveEvent, Receiver};
use super::sender::{SendOutcome, Sender};
use super::transceiver::{Clock, RadioMode, Transceiver};
use crate::stats::LinkStats;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Combined sender and receiver sharing one transceiver.
pub struct Station<T: Transceiver, C: Clock> {
    radio: T,
    clock: C,
    sender: Sender,
    receiver: Receiver,
    mode: RadioMode,
}

impl<T: Transceiver, C: Clock> Station<T, C> {
    /// Build a station and start listening.
    pub fn new(mut radio: T, clock: C, config: ArqConfig) -> Self {
        let stats = Arc::new(LinkStats::new("station"));
        radio.begin_listening();
        Self {
            radio,
            clock,
            sender: Sender::new(config).with_stats(stats.clone()),
            receiver: Receiver::new(Framer::new(config.payload_capacity)).with_stats(stats),
            mode: RadioMode::Listening,
        }
    }

    /// Share counters with a stats server.
    pub fn with_stats(mut self, stats: Arc<LinkStats>) -> Self {
        self.sender = self.sender.with_stats(stats.clone());
        self.receiver = self.receiver.with_stats(stats);
        self
    }

    /// What the station is doing, not the instantaneous radio state.
    ///
    /// `Transmitting` covers a whole [`send`](Self::send), including the ack
    /// wait, during which the radio itself is listening for the ack.
    /// `Listening` means inbound data frames are being served.
    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn radio(&self) -> &T {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut T {
        &mut self.radio
    }

    /// Serve at most one inbound data frame.
    pub fn poll(&mut self, max_wait: Duration) -> Option<ReceiveEvent> {
        let event = self.receiver.poll(&mut self.radio, max_wait);
        self.mode = RadioMode::Listening;
        event
    }

    /// Originate one payload, then go straight back to listening.
    pub fn send(&mut self, payload: &[u8]) -> Result<SendOutcome, FrameError> {
        debug!("Suspending listening for send");
        self.mode = RadioMode::Transmitting;
        let result = self.sender.send(&mut self.radio, &self.clock, payload);
        self.radio.begin_listening();
        self.mode = RadioMode::Listening;
        result
    }

    /// Release the transceiver and clock.
    pub fn into_parts(self) -> (T, C) {
        (self.radio, self.clock)
    }
}
