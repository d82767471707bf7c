//! Pool configuration that hosts can serialize/deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of buffer slots. Total pool memory never exceeds
    /// `max_count * buffer_size`.
    pub max_count: usize,

    /// Fixed length of every buffer, in bytes.
    pub buffer_size: usize,

    /// Reclaimer period in milliseconds. `0` disables the reclaimer.
    pub sweep_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_count: 64,
            buffer_size: 64 * 1024, // 64 KiB
            sweep_interval_ms: 10_000,
        }
    }
}

impl PoolConfig {
    pub fn new(max_count: usize, buffer_size: usize, sweep_interval: Duration) -> Self {
        Self {
            max_count,
            buffer_size,
            sweep_interval_ms: u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Reclaimer period, or `None` when the reclaimer is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }

    /// Upper bound on resident buffer memory.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_count.saturating_mul(self.buffer_size)
    }

    /// Reject configurations that would deadlock or overflow.
    pub fn validate(&self) -> Result<()> {
        if self.max_count == 0 {
            return Err(Error::Config(
                "max_count must be at least 1; a zero-capacity pool blocks every acquire".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer_size must be greater than 0".into()));
        }
        if self.max_count.checked_mul(self.buffer_size).is_none() {
            return Err(Error::Config(format!(
                "max_count ({}) * buffer_size ({}) overflows usize",
                self.max_count, self.buffer_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config fragment. Missing fields take defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
