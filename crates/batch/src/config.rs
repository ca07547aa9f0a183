use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_BATCH_SIZE_LIMIT: usize = 50;
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_batch_size must be between 1 and 50, got {0}")]
    BatchSize(usize),
    #[error("max_retries must be at most 10, got {0}")]
    Retries(u32),
    #[error("gas_limit must be greater than zero")]
    GasLimit,
    #[error("Failed to parse batch config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Items per chunk; one chunk is in flight at a time.
    pub max_batch_size: usize,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Passed through to the submission service untouched.
    pub gas_limit: u64,
    /// When false, a terminal failure cancels everything still queued.
    pub allow_partial_import: bool,
    pub retry_failed_transactions: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            max_retries: 3,
            gas_limit: 500_000,
            allow_partial_import: true,
            retry_failed_transactions: true,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BATCH_SIZE_LIMIT).contains(&self.max_batch_size) {
            return Err(ConfigError::BatchSize(self.max_batch_size));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Retries(self.max_retries));
        }
        if self.gas_limit == 0 {
            return Err(ConfigError::GasLimit);
        }
        Ok(())
    }

    /// Parse and validate in one step.
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Whether an item that has failed `attempts` times before this failure
    /// goes back in the queue.
    pub fn should_requeue(&self, attempts: u32) -> bool {
        self.retry_failed_transactions && attempts < self.max_retries
    }
}
