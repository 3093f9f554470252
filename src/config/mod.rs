//! Link configuration file.
//!
//! One JSON document covers the protocol parameters and the simulated
//! channel. Every field is optional; missing fields take their defaults.
//!
//! ```json
//! {
//!   "arq": { "max_retries": 5, "ack_timeout_ms": 1000, "poll_interval_ms": 100 },
//!   "fault": { "loss_probability": 0.15, "delay_min_ms": 300, "delay_max_ms": 400, "seed": 12 }
//! }
//! ```
//!
//! Values are layered: built-in defaults or the file, then any
//! [`ConfigOverrides`] from the command line, then one
//! [`LinkConfig::validate`] on the result (see [`LinkConfig::resolve`]).

use crate::arq::{ArqConfig, ArqConfigError};
use crate::sim::{FaultConfig, FaultConfigError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Configuration for one link endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub arq: ArqConfig,
    /// Channel faults applied to this endpoint's outbound frames.
    pub fault: FaultConfig,
}

impl LinkConfig {
    /// Read and parse a JSON config file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded link config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Channel defaults for the data direction (transmitting end).
    pub fn tx_defaults() -> Self {
        Self {
            arq: ArqConfig::default(),
            fault: FaultConfig {
                loss_probability: 0.15,
                delay_min_ms: 300,
                delay_max_ms: 400,
                seed: Some(12),
            },
        }
    }

    /// Channel defaults for the ack direction (receiving end).
    pub fn rx_defaults() -> Self {
        Self {
            arq: ArqConfig::default(),
            fault: FaultConfig {
                loss_probability: 0.08,
                delay_min_ms: 25,
                delay_max_ms: 40,
                seed: Some(12),
            },
        }
    }

    /// Load `file` if given, else start from `defaults`; apply `overrides`
    /// and validate.
    pub fn resolve(
        file: Option<&Path>,
        defaults: Self,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::load(path)?,
            None => defaults,
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply every override that is set. Does not validate.
    ///
    /// An overridden ack timeout shorter than the poll interval pulls the
    /// poll interval down to match.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(retries) = overrides.max_retries {
            self.arq.max_retries = retries;
        }
        if let Some(ms) = overrides.ack_timeout_ms {
            self.arq.ack_timeout = Duration::from_millis(ms);
            self.arq.poll_interval = self.arq.poll_interval.min(self.arq.ack_timeout);
        }
        if let Some(seed) = overrides.seed {
            self.fault.seed = Some(seed);
        }
        if let Some(p) = overrides.loss_probability {
            self.fault.loss_probability = p;
        }
        if let Some(ms) = overrides.delay_min_ms {
            self.fault.delay_min_ms = ms;
        }
        if let Some(ms) = overrides.delay_max_ms {
            self.fault.delay_max_ms = ms;
        }
        self
    }

    /// Validate both sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arq.validate()?;
        self.fault.validate()?;
        Ok(())
    }
}

/// Values given explicitly on the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigOverrides {
    pub max_retries: Option<u32>,
    pub ack_timeout_ms: Option<u64>,
    pub seed: Option<u64>,
    pub loss_probability: Option<f64>,
    pub delay_min_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
}

/// Configuration loading or validation error.
#[derive(Debug)]
pub enum ConfigError {
    /// A value is out of range.
    InvalidConfig(&'static str),
    /// The file could not be read.
    Io(io::Error),
    /// The file is not valid JSON for [`LinkConfig`].
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            Self::Io(e) => write!(f, "config I/O error: {}", e),
            Self::Parse(e) => write!(f, "config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<ArqConfigError> for ConfigError {
    fn from(e: ArqConfigError) -> Self {
        match e {
            ArqConfigError::InvalidConfig(msg) => Self::InvalidConfig(msg),
        }
    }
}

impl From<FaultConfigError> for ConfigError {
    fn from(e: FaultConfigError) -> Self {
        match e {
            FaultConfigError::InvalidConfig(msg) => Self::InvalidConfig(msg),
        }
    }
}
