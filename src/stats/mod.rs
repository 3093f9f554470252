//! Link counters and the HTTP endpoint that serves them.
//!
//! [`LinkStats`] is shared between the protocol roles and the
//! [`StatsServer`] thread. All counters are atomics so recording never locks.
//!
//! # Example Response
//!
//! ```json
//! {
//!   "uptime_secs": 42,
//!   "role": "tx",
//!   "sender": {
//!     "data_frames_sent": 12, "transmit_faults": 0, "retransmissions": 2,
//!     "ack_timeouts": 2, "bad_length_acks": 0, "stale_acks": 1,
//!     "sends_delivered": 10, "sends_failed": 0
//!   },
//!   "receiver": {
//!     "frames_accepted": 0, "duplicates_rejected": 0, "malformed_rejected": 0,
//!     "acks_sent": 0, "ack_transmit_faults": 0
//!   }
//! }
//! ```

mod server;

pub use server::{StatsServer, DEFAULT_STATS_PORT};

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Sender-side counters.
#[derive(Debug, Default)]
pub struct SenderStats {
    /// Data frames handed to the transceiver, retransmissions included.
    pub data_frames_sent: AtomicUsize,
    /// Transmit calls that reported a local fault.
    pub transmit_faults: AtomicUsize,
    /// Attempts beyond the first.
    pub retransmissions: AtomicUsize,
    /// Attempts that ended without a matching ack.
    pub ack_timeouts: AtomicUsize,
    /// Matching acks carrying BAD_LENGTH.
    pub bad_length_acks: AtomicUsize,
    /// Acks discarded for a sequence mismatch or bad encoding.
    pub stale_acks: AtomicUsize,
    /// `send` calls that returned Delivered.
    pub sends_delivered: AtomicUsize,
    /// `send` calls that returned Failed.
    pub sends_failed: AtomicUsize,
}

/// Receiver-side counters.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    /// Frames newly accepted and delivered.
    pub frames_accepted: AtomicUsize,
    /// Frames answered with DUPLICATE.
    pub duplicates_rejected: AtomicUsize,
    /// Frames answered with BAD_LENGTH.
    pub malformed_rejected: AtomicUsize,
    /// Acks transmitted without a local fault.
    pub acks_sent: AtomicUsize,
    /// Ack transmissions that reported a local fault.
    pub ack_transmit_faults: AtomicUsize,
}

/// Statistics for one link endpoint.
#[derive(Debug)]
pub struct LinkStats {
    start_time: Instant,
    /// Label for this endpoint (e.g. "tx", "rx").
    pub role: String,
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
}

impl LinkStats {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            role: role.into(),
            sender: SenderStats::default(),
            receiver: ReceiverStats::default(),
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        let s = &self.sender;
        let r = &self.receiver;
        LinkStatsSnapshot {
            uptime_secs: self.uptime_secs(),
            role: self.role.clone(),
            sender: SenderSnapshot {
                data_frames_sent: load(&s.data_frames_sent),
                transmit_faults: load(&s.transmit_faults),
                retransmissions: load(&s.retransmissions),
                ack_timeouts: load(&s.ack_timeouts),
                bad_length_acks: load(&s.bad_length_acks),
                stale_acks: load(&s.stale_acks),
                sends_delivered: load(&s.sends_delivered),
                sends_failed: load(&s.sends_failed),
            },
            receiver: ReceiverSnapshot {
                frames_accepted: load(&r.frames_accepted),
                duplicates_rejected: load(&r.duplicates_rejected),
                malformed_rejected: load(&r.malformed_rejected),
                acks_sent: load(&r.acks_sent),
                ack_transmit_faults: load(&r.ack_transmit_faults),
            },
        }
    }

    /// Serialize all statistics to JSON.
    pub fn to_json(&self) -> String {
        // Plain integers and strings only, serialization cannot fail.
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new("link")
    }
}

/// Increment a counter.
pub(crate) fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn load(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::Relaxed)
}

/// Serializable copy of [`LinkStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatsSnapshot {
    pub uptime_secs: u64,
    pub role: String,
    pub sender: SenderSnapshot,
    pub receiver: ReceiverSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderSnapshot {
    pub data_frames_sent: usize,
    pub transmit_faults: usize,
    pub retransmissions: usize,
    pub ack_timeouts: usize,
    pub bad_length_acks: usize,
    pub stale_acks: usize,
    pub sends_delivered: usize,
    pub sends_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverSnapshot {
    pub frames_accepted: usize,
    pub duplicates_rejected: usize,
    pub malformed_rejected: usize,
    pub acks_sent: usize,
    pub ack_transmit_faults: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = LinkStats::new("tx");
        let snap = stats.snapshot();
        assert_eq!(snap.role, "tx");
        assert_eq!(snap.sender.data_frames_sent, 0);
        assert_eq!(snap.receiver.frames_accepted, 0);
    }

    #[test]
    fn test_bump_counts() {
        let stats = LinkStats::default();
        bump(&stats.sender.data_frames_sent);
        bump(&stats.sender.data_frames_sent);
        bump(&stats.receiver.acks_sent);

        let snap = stats.snapshot();
        assert_eq!(snap.sender.data_frames_sent, 2);
        assert_eq!(snap.receiver.acks_sent, 1);
    }

    #[test]
    fn test_json_shape() {
        let stats = LinkStats::new("rx");
        bump(&stats.receiver.duplicates_rejected);
        let json = stats.to_json();

        assert!(json.contains("\"role\":\"rx\""));
        assert!(json.contains("\"uptime_secs\":"));
        assert!(json.contains("\"duplicates_rejected\":1"));
        assert!(json.contains("\"sender\":"));
    }
}
