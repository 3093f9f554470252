//! Seeded fault model for simulated links.
//!
//! Decides per frame whether it is lost in the air and how long it takes to
//! arrive. A fixed seed makes a whole simulated transfer reproducible.
//!
//! # Example
//!
//! ```
//! use lora_arq::sim::{FaultConfig, FaultInjector};
//!
//! let config = FaultConfig {
//!     loss_probability: 0.15,
//!     delay_min_ms: 300,
//!     delay_max_ms: 400,
//!     seed: Some(12),
//! };
//! let mut faults = FaultInjector::new(config).unwrap();
//! let delay = faults.delay();
//! assert!(delay.as_millis() >= 300 && delay.as_millis() <= 400);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Loss and delay parameters for one direction of a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Probability in `[0.0, 1.0]` that a frame is silently lost.
    pub loss_probability: f64,
    /// Minimum delivery delay in milliseconds.
    pub delay_min_ms: u64,
    /// Maximum delivery delay in milliseconds.
    pub delay_max_ms: u64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for FaultConfig {
    /// A perfect link: no loss, no delay.
    fn default() -> Self {
        Self {
            loss_probability: 0.0,
            delay_min_ms: 0,
            delay_max_ms: 0,
            seed: None,
        }
    }
}

impl FaultConfig {
    /// Lossy link with no delay.
    pub fn lossy(loss_probability: f64, seed: u64) -> Self {
        Self {
            loss_probability,
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), FaultConfigError> {
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(FaultConfigError::InvalidConfig(
                "loss_probability must be within [0.0, 1.0]",
            ));
        }
        if self.delay_max_ms < self.delay_min_ms {
            return Err(FaultConfigError::InvalidConfig("delay_max_ms must be >= delay_min_ms"));
        }
        Ok(())
    }
}

/// Invalid [`FaultConfig`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultConfigError {
    /// Invalid configuration parameter.
    InvalidConfig(&'static str),
}

impl fmt::Display for FaultConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid fault config: {}", msg),
        }
    }
}

impl std::error::Error for FaultConfigError {}

/// Draws loss and delay decisions from a seeded RNG.
pub struct FaultInjector {
    config: FaultConfig,
    rng: StdRng,
}

impl FaultInjector {
    pub fn new(config: FaultConfig) -> Result<Self, FaultConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| OsRng.next_u64());
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Injector that never drops or delays.
    pub fn perfect() -> Self {
        Self {
            config: FaultConfig::default(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Whether the next frame is lost.
    pub fn should_drop(&mut self) -> bool {
        if self.config.loss_probability <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < self.config.loss_probability
    }

    /// Delivery delay for the next frame.
    pub fn delay(&mut self) -> Duration {
        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(min..=max))
    }
}

impl fmt::Debug for FaultInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultInjector")
            .field("config", &self.config)
            .finish()
    }
}
