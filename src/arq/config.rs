//! Protocol timing and sizing parameters.

use super::frame::{DEFAULT_PAYLOAD_CAPACITY, MAX_PAYLOAD_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default transmit attempts per frame.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default time to wait for a matching ack, per attempt.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default single poll slice within the ack wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stop-and-wait configuration.
///
/// Durations are (de)serialized as whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArqConfig {
    /// Transmit attempts per `send` before giving up.
    pub max_retries: u32,

    /// Ack wait budget per attempt.
    #[serde(rename = "ack_timeout_ms", with = "millis")]
    pub ack_timeout: Duration,

    /// Upper bound on one `poll_receive` call inside the ack wait.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    /// Payload bytes per data frame.
    pub payload_capacity: usize,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
        }
    }
}

impl ArqConfig {
    /// Worst-case time spent waiting for acks in one `send`, excluding
    /// transmit time.
    pub fn max_ack_wait(&self) -> Duration {
        self.ack_timeout * self.max_retries
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ArqConfigError> {
        if self.max_retries == 0 {
            return Err(ArqConfigError::InvalidConfig("max_retries must be > 0"));
        }
        if self.ack_timeout.is_zero() {
            return Err(ArqConfigError::InvalidConfig("ack_timeout must be > 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(ArqConfigError::InvalidConfig("poll_interval must be > 0"));
        }
        if self.poll_interval > self.ack_timeout {
            return Err(ArqConfigError::InvalidConfig("poll_interval must be <= ack_timeout"));
        }
        if self.payload_capacity == 0 {
            return Err(ArqConfigError::InvalidConfig("payload_capacity must be > 0"));
        }
        if self.payload_capacity > MAX_PAYLOAD_CAPACITY {
            return Err(ArqConfigError::InvalidConfig("payload_capacity must be <= 254"));
        }
        Ok(())
    }
}

/// Invalid [`ArqConfig`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArqConfigError {
    /// Invalid configuration parameter.
    InvalidConfig(&'static str),
}

impl fmt::Display for ArqConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid ARQ config: {}", msg),
        }
    }
}

impl std::error::Error for ArqConfigError {}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
