//! In-process link for deterministic end-to-end runs.
//!
//! [`Loopback`] is the sender's transceiver: each transmitted frame is handed
//! straight to a [`Receiver`] living on the far side, and its ack is queued
//! for the sender to poll. Both directions get their own [`FaultInjector`],
//! and all delays are charged to a shared [`ManualClock`], so a long lossy
//! transfer runs in microseconds and replays identically from the same seeds.

use super::clock::ManualClock;
use super::fault::FaultInjector;
use crate::arq::{Framer, ReceiveEvent, Receiver, Transceiver, TransmitFault};
use log::{debug, info};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sender-side view of a simulated link with the receiver attached.
#[derive(Debug)]
pub struct Loopback {
    clock: ManualClock,
    receiver: Receiver,
    data_faults: FaultInjector,
    ack_faults: FaultInjector,
    /// Acks in flight back to the sender, with their arrival time.
    in_flight: VecDeque<(Instant, Vec<u8>)>,
    delivered: Vec<Vec<u8>>,
    events: Vec<ReceiveEvent>,
}

impl Loopback {
    pub fn new(
        clock: ManualClock,
        framer: Framer,
        data_faults: FaultInjector,
        ack_faults: FaultInjector,
    ) -> Self {
        Self {
            clock,
            receiver: Receiver::new(framer),
            data_faults,
            ack_faults,
            in_flight: VecDeque::new(),
            delivered: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Lossless, zero-latency link.
    pub fn perfect(clock: ManualClock, framer: Framer) -> Self {
        Self::new(clock, framer, FaultInjector::perfect(), FaultInjector::perfect())
    }

    /// Payloads the far side has handed to its application, in order.
    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    /// Every frame the far side classified, including duplicates.
    pub fn events(&self) -> &[ReceiveEvent] {
        &self.events
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }
}

impl Transceiver for Loopback {
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransmitFault> {
        if bytes.is_empty() {
            return Err(TransmitFault::EmptyPacket);
        }
        if self.data_faults.should_drop() {
            info!("Data frame seq {} DROPPED", bytes[0]);
            return Ok(());
        }
        let data_delay = self.data_faults.delay();

        let (event, ack) = self.receiver.classify(bytes);
        if let Some(payload) = event.payload() {
            self.delivered.push(payload.to_vec());
        }
        self.events.push(event);

        if self.ack_faults.should_drop() {
            info!("Ack seq {} DROPPED", ack.sequence);
            return Ok(());
        }
        let arrives = self.clock.now() + data_delay + self.ack_faults.delay();
        self.in_flight.push_back((arrives, ack.to_bytes().to_vec()));
        Ok(())
    }

    fn begin_listening(&mut self) {}

    fn poll_receive(&mut self, max_wait: Duration) -> Option<Vec<u8>> {
        let now = self.clock.now();
        let horizon = now + max_wait;

        match self.in_flight.front() {
            Some((arrives, _)) if *arrives <= horizon => {
                if *arrives > now {
                    self.clock.advance(*arrives - now);
                }
                let (_, bytes) = self.in_flight.pop_front()?;
                debug!("Loopback RX {} bytes", bytes.len());
                Some(bytes)
            }
            _ => {
                self.clock.advance(max_wait);
                None
            }
        }
    }

    fn last_signal_strength(&self) -> i16 {
        super::udp::SIMULATED_RSSI_DBM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arq::{ArqConfig, AckStatus, SendOutcome, Sender};
    use crate::sim::FaultConfig;

    fn lossy(p: f64, seed: u64) -> FaultInjector {
        FaultInjector::new(FaultConfig::lossy(p, seed)).unwrap()
    }

    fn messages(n: u8) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i; 1 + (i as usize % 31)]).collect()
    }

    fn padded(payload: &[u8]) -> Vec<u8> {
        let mut out = payload.to_vec();
        out.resize(31, 0);
        out
    }

    #[test]
    fn test_perfect_link_delivers_in_order() {
        let clock = ManualClock::new();
        let mut link = Loopback::perfect(clock.clone(), Framer::default());
        let mut sender = Sender::new(ArqConfig::default());

        for msg in messages(10) {
            let outcome = sender.send(&mut link, &clock, &msg).unwrap();
            assert_eq!(
                outcome,
                SendOutcome::Delivered {
                    attempts: 1,
                    status: AckStatus::Delivered
                }
            );
        }

        let expected: Vec<Vec<u8>> = messages(10).iter().map(|m| padded(m)).collect();
        assert_eq!(link.delivered(), &expected[..]);
    }

    #[test]
    fn test_lost_acks_never_duplicate_delivery() {
        let clock = ManualClock::new();
        let mut link = Loopback::new(
            clock.clone(),
            Framer::default(),
            FaultInjector::perfect(),
            lossy(0.4, 12),
        );
        let config = ArqConfig {
            max_retries: 20,
            ..ArqConfig::default()
        };
        let mut sender = Sender::new(config);

        for msg in messages(50) {
            assert!(sender.send(&mut link, &clock, &msg).unwrap().is_delivered());
        }

        let expected: Vec<Vec<u8>> = messages(50).iter().map(|m| padded(m)).collect();
        assert_eq!(link.delivered(), &expected[..]);
        assert!(link
            .events()
            .iter()
            .any(|e| matches!(e, ReceiveEvent::Duplicate { .. })));
    }

    #[test]
    fn test_lossy_both_ways_is_reproducible() {
        let run = || {
            let clock = ManualClock::new();
            let mut link = Loopback::new(
                clock.clone(),
                Framer::default(),
                lossy(0.15, 12),
                lossy(0.08, 13),
            );
            let mut sender = Sender::new(ArqConfig::default());
            let attempts: Vec<u32> = messages(30)
                .iter()
                .map(|m| sender.send(&mut link, &clock, m).unwrap().attempts())
                .collect();
            (attempts, link.delivered().len())
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_ack_slower_than_timeout_forces_retries() {
        let clock = ManualClock::new();
        let slow_acks = FaultInjector::new(FaultConfig {
            delay_min_ms: 1500,
            delay_max_ms: 1500,
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        let mut link = Loopback::new(
            clock.clone(),
            Framer::default(),
            FaultInjector::perfect(),
            slow_acks,
        );
        let mut sender = Sender::new(ArqConfig::default());

        // First ack lands during attempt 2's window; it still matches.
        let outcome = sender.send(&mut link, &clock, b"slow").unwrap();
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(link.delivered().len(), 1);
    }

    #[test]
    fn test_dead_link_fails_without_delivery() {
        let clock = ManualClock::new();
        let mut link = Loopback::new(
            clock.clone(),
            Framer::default(),
            lossy(1.0, 5),
            FaultInjector::perfect(),
        );
        let mut sender = Sender::new(ArqConfig::default());
        let start = clock.now();

        let outcome = sender.send(&mut link, &clock, b"void").unwrap();
        assert_eq!(outcome, SendOutcome::Failed { attempts: 5 });
        assert!(link.delivered().is_empty());
        assert_eq!(clock.now() - start, Duration::from_millis(5000));
    }
}
