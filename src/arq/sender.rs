//! Stop-and-wait sender.
//!
//! # Algorithm
//!
//! 1. Wrap the payload in a data frame tagged with the current sequence bit
//! 2. Transmit; a local transmit fault is logged but the attempt still waits
//! 3. Poll for an ack until the per-attempt deadline, discarding acks whose
//!    sequence bit does not match
//! 4. DELIVERED or DUPLICATE ends the call and flips the sequence bit
//! 5. Timeout or BAD_LENGTH moves on to the next attempt with the same frame
//! 6. Give up after `max_retries` attempts without flipping the bit
//!
//! The ack wait re-reads the clock on every poll and never asks the
//! transceiver to wait past the deadline, so a prompt ack is seen within one
//! poll slice and the total wait per attempt overshoots by at most one slice
//! of transceiver latency.

use super::config::ArqConfig;
use super::frame::{AckStatus, DataFrame, FrameError, Framer};
use super::sequence::SequenceBit;
use super::transceiver::{Clock, Transceiver};
use crate::stats::{bump, LinkStats};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Where the sender is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    #[default]
    Idle,
    Transmitting,
    AwaitingAck,
    Retrying,
    Delivered,
    Failed,
}

/// Result of one [`Sender::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a Failed outcome leaves the frame undelivered"]
pub enum SendOutcome {
    /// The receiver confirmed possession of the frame.
    Delivered {
        /// Attempt that got the confirming ack (1-based).
        attempts: u32,
        /// DELIVERED or DUPLICATE.
        status: AckStatus,
    },
    /// Every attempt ended in a timeout or BAD_LENGTH.
    Failed { attempts: u32 },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Delivered { attempts, .. } | Self::Failed { attempts } => attempts,
        }
    }
}

/// How one attempt ended.
enum AttemptResult {
    Confirmed(AckStatus),
    BadLength,
    Timeout,
}

/// Sending half of the protocol.
///
/// Holds the only cross-call state: the sequence bit for the next frame.
#[derive(Debug)]
pub struct Sender {
    config: ArqConfig,
    framer: Framer,
    sequence: SequenceBit,
    state: SenderState,
    stats: Arc<LinkStats>,
}

impl Sender {
    /// Create a sender starting at sequence bit 0.
    ///
    /// `config` should have passed [`ArqConfig::validate`].
    pub fn new(config: ArqConfig) -> Self {
        Self {
            config,
            framer: Framer::new(config.payload_capacity),
            sequence: SequenceBit::Zero,
            state: SenderState::Idle,
            stats: Arc::new(LinkStats::new("sender")),
        }
    }

    /// Record counters into shared stats.
    pub fn with_stats(mut self, stats: Arc<LinkStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Sequence bit the next `send` will use.
    pub fn sequence(&self) -> SequenceBit {
        self.sequence
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.stats
    }

    /// Deliver one payload, blocking until confirmed or out of attempts.
    ///
    /// Only a payload larger than the frame capacity is an error; delivery
    /// failure is reported as [`SendOutcome::Failed`].
    pub fn send<T, C>(
        &mut self,
        radio: &mut T,
        clock: &C,
        payload: &[u8],
    ) -> Result<SendOutcome, FrameError>
    where
        T: Transceiver + ?Sized,
        C: Clock + ?Sized,
    {
        let frame = self.framer.encode_data(self.sequence, payload)?;
        let bytes = frame.to_bytes();
        let max_retries = self.config.max_retries;

        for attempt in 1..=max_retries {
            if attempt > 1 {
                bump(&self.stats.sender.retransmissions);
            }

            self.transmit(radio, &frame, &bytes, attempt);

            self.state = SenderState::AwaitingAck;
            match self.wait_for_ack(radio, clock, frame.sequence) {
                AttemptResult::Confirmed(status) => {
                    if status == AckStatus::Duplicate {
                        info!(
                            "Seq {} receiver says DUPLICATE, treating as delivered",
                            frame.sequence
                        );
                    } else {
                        info!(
                            "Seq {} delivered (attempt {}/{})",
                            frame.sequence, attempt, max_retries
                        );
                    }
                    self.state = SenderState::Delivered;
                    self.sequence.toggle();
                    bump(&self.stats.sender.sends_delivered);
                    return Ok(SendOutcome::Delivered {
                        attempts: attempt,
                        status,
                    });
                }
                AttemptResult::BadLength => {
                    bump(&self.stats.sender.bad_length_acks);
                    info!(
                        "Seq {} receiver reported BAD_LENGTH, retry {}/{}",
                        frame.sequence, attempt, max_retries
                    );
                }
                AttemptResult::Timeout => {
                    bump(&self.stats.sender.ack_timeouts);
                    info!("Seq {} ack timeout, retry {}/{}", frame.sequence, attempt, max_retries);
                }
            }
            self.state = SenderState::Retrying;
        }

        warn!("Seq {} FAILED after {} attempts", frame.sequence, max_retries);
        self.state = SenderState::Failed;
        bump(&self.stats.sender.sends_failed);
        Ok(SendOutcome::Failed {
            attempts: max_retries,
        })
    }

    fn transmit<T: Transceiver + ?Sized>(
        &mut self,
        radio: &mut T,
        frame: &DataFrame,
        bytes: &[u8],
        attempt: u32,
    ) {
        self.state = SenderState::Transmitting;
        bump(&self.stats.sender.data_frames_sent);
        match radio.transmit(bytes) {
            Ok(()) => debug!(
                "Sent seq {} attempt {}/{}",
                frame.sequence, attempt, self.config.max_retries
            ),
            Err(e) => {
                bump(&self.stats.sender.transmit_faults);
                warn!(
                    "Seq {} transmit error: {} (attempt {}/{}), waiting for ack anyway",
                    frame.sequence, e, attempt, self.config.max_retries
                );
            }
        }
        radio.begin_listening();
    }

    /// Poll for a matching ack until the attempt deadline passes.
    fn wait_for_ack<T, C>(&self, radio: &mut T, clock: &C, expected: SequenceBit) -> AttemptResult
    where
        T: Transceiver + ?Sized,
        C: Clock + ?Sized,
    {
        let deadline = clock.now() + self.config.ack_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(clock.now());
            if remaining == Duration::ZERO {
                return AttemptResult::Timeout;
            }

            let Some(bytes) = radio.poll_receive(remaining.min(self.config.poll_interval)) else {
                continue;
            };

            match self.framer.decode_ack(&bytes) {
                Ok(ack) if ack.sequence == expected => {
                    return match ack.status {
                        AckStatus::BadLength => AttemptResult::BadLength,
                        status => AttemptResult::Confirmed(status),
                    };
                }
                Ok(ack) => {
                    bump(&self.stats.sender.stale_acks);
                    debug!("Ignoring stale ack for seq {} (want {})", ack.sequence, expected);
                }
                Err(e) => {
                    bump(&self.stats.sender.stale_acks);
                    debug!("Ignoring undecodable ack: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ManualClock;
    use std::collections::VecDeque;
    use std::time::Instant;

    /// Scripted transceiver: each poll pops the next scripted reply, or
    /// burns the whole poll budget on the manual clock when the script is
    /// empty or holds `None`.
    struct ScriptedRadio {
        clock: ManualClock,
        replies: VecDeque<Option<Vec<u8>>>,
        sent: Vec<Vec<u8>>,
        fail_transmit: bool,
        polls: Vec<Duration>,
    }

    impl ScriptedRadio {
        fn new(clock: &ManualClock) -> Self {
            Self {
                clock: clock.clone(),
                replies: VecDeque::new(),
                sent: Vec::new(),
                fail_transmit: false,
                polls: Vec::new(),
            }
        }

        fn reply(&mut self, bytes: &[u8]) {
            self.replies.push_back(Some(bytes.to_vec()));
        }

        fn silence(&mut self) {
            self.replies.push_back(None);
        }
    }

    impl Transceiver for ScriptedRadio {
        fn transmit(&mut self, bytes: &[u8]) -> Result<(), crate::arq::TransmitFault> {
            self.sent.push(bytes.to_vec());
            if self.fail_transmit {
                Err(crate::arq::TransmitFault::ChannelBusy)
            } else {
                Ok(())
            }
        }

        fn begin_listening(&mut self) {}

        fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>> {
            self.polls.push(max_wait);
            match self.replies.pop_front() {
                Some(Some(bytes)) => Some(bytes),
                _ => {
                    self.clock.advance(max_wait);
                    None
                }
            }
        }

        fn last_signal_strength(&self) -> i16 {
            -40
        }
    }

    fn config() -> ArqConfig {
        ArqConfig::default()
    }

    #[test]
    fn test_delivered_toggles_sequence() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"P1").unwrap();
        assert_eq!(
            outcome,
            SendOutcome::Delivered {
                attempts: 1,
                status: AckStatus::Delivered
            }
        );
        assert_eq!(sender.sequence(), SequenceBit::One);
        assert_eq!(sender.state(), SenderState::Delivered);
        assert_eq!(radio.sent.len(), 1);
        assert_eq!(radio.sent[0].len(), 32);
        assert_eq!(radio.sent[0][0], 0);

        radio.reply(&[1, 0]);
        sender.send(&mut radio, &clock, b"P2").unwrap();
        assert_eq!(radio.sent[1][0], 1);
        assert_eq!(sender.sequence(), SequenceBit::Zero);
    }

    #[test]
    fn test_duplicate_ack_counts_as_delivered() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.reply(&[0, 1]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"x").unwrap();
        assert!(outcome.is_delivered());
        assert_eq!(sender.sequence(), SequenceBit::One);
    }

    #[test]
    fn test_all_timeouts_fail_without_toggle() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut radio = ScriptedRadio::new(&clock);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"lost").unwrap();
        assert_eq!(outcome, SendOutcome::Failed { attempts: 5 });
        assert_eq!(sender.sequence(), SequenceBit::Zero);
        assert_eq!(sender.state(), SenderState::Failed);
        assert_eq!(radio.sent.len(), 5);
        assert!(radio.sent.iter().all(|f| f == &radio.sent[0]));

        // 5 attempts x 1000 ms of manual time, no overshoot.
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }

    #[test]
    fn test_failed_send_reuses_sequence_next_time() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        let mut sender = Sender::new(config());

        let _ = sender.send(&mut radio, &clock, b"first").unwrap();
        radio.reply(&[0, 0]);
        let outcome = sender.send(&mut radio, &clock, b"again").unwrap();

        assert!(outcome.is_delivered());
        assert_eq!(radio.sent.last().unwrap()[0], 0);
    }

    #[test]
    fn test_bad_length_ack_retries_same_frame() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.reply(&[0, 2]);
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"data").unwrap();
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(radio.sent.len(), 2);
        assert_eq!(radio.sent[0], radio.sent[1]);
        assert_eq!(sender.stats().snapshot().sender.bad_length_acks, 1);
    }

    #[test]
    fn test_stale_ack_ignored_within_same_attempt() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.reply(&[1, 0]);
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"data").unwrap();
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(radio.sent.len(), 1);
        assert_eq!(sender.stats().snapshot().sender.stale_acks, 1);
    }

    #[test]
    fn test_garbled_ack_ignored() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.reply(&[0, 0, 0]);
        radio.reply(&[0, 9]);
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"data").unwrap();
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn test_transmit_fault_still_waits_for_ack() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        radio.fail_transmit = true;
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"data").unwrap();
        assert!(outcome.is_delivered());
        assert_eq!(sender.stats().snapshot().sender.transmit_faults, 1);
    }

    #[test]
    fn test_ack_after_timeout_belongs_to_next_attempt() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        for _ in 0..10 {
            radio.silence();
        }
        radio.reply(&[0, 0]);
        let mut sender = Sender::new(config());

        let outcome = sender.send(&mut radio, &clock, b"data").unwrap();
        // 10 silent polls of 100 ms exhaust attempt 1 exactly.
        assert_eq!(outcome.attempts(), 2);
    }

    #[test]
    fn test_poll_never_exceeds_remaining_budget() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        let config = ArqConfig {
            max_retries: 1,
            ack_timeout: Duration::from_millis(250),
            poll_interval: Duration::from_millis(100),
            ..ArqConfig::default()
        };
        let mut sender = Sender::new(config);

        let _ = sender.send(&mut radio, &clock, b"data").unwrap();
        assert_eq!(
            radio.polls,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(50)
            ]
        );
    }

    #[test]
    fn test_oversized_payload_is_error() {
        let clock = ManualClock::new();
        let mut radio = ScriptedRadio::new(&clock);
        let mut sender = Sender::new(config());

        let result = sender.send(&mut radio, &clock, &[0u8; 40]);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
        assert!(radio.sent.is_empty());
        assert_eq!(sender.sequence(), SequenceBit::Zero);
    }

    #[test]
    fn test_real_clock_bounded_termination() {
        struct Deaf;
        impl Transceiver for Deaf {
            fn transmit(&mut self, _: &[u8]) -> Result<(), crate::arq::TransmitFault> {
                Ok(())
            }
            fn begin_listening(&mut self) {}
            fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>> {
                std::thread::sleep(max_wait);
                None
            }
            fn last_signal_strength(&self) -> i16 {
                0
            }
        }

        let config = ArqConfig {
            max_retries: 3,
            ack_timeout: Duration::from_millis(60),
            poll_interval: Duration::from_millis(20),
            ..ArqConfig::default()
        };
        let mut sender = Sender::new(config);
        let start = Instant::now();
        let outcome = sender
            .send(&mut Deaf, &crate::arq::SystemClock, b"data")
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome, SendOutcome::Failed { attempts: 3 });
        assert!(elapsed >= Duration::from_millis(180));
        assert!(elapsed < Duration::from_millis(180 + 500));
    }
}
