//! Scheduler configuration structures.

use std::collections::HashMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Concurrency limit used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Environment variable read by [`SchedulerConfig::from_env`].
pub const CONCURRENCY_ENV: &str = "ADMISSION_CONCURRENCY";

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Configuration of a single scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum operations running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SchedulerConfig {
    /// Configuration with an explicit concurrency limit.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the environment (and a `.env` file if present), reading
    /// [`CONCURRENCY_ENV`]. Falls back to the default when unset.
    ///
    /// # Errors
    ///
    /// Fails if the variable is set but not a valid positive integer.
    pub fn from_env() -> AppResult<Self> {
        Self::from_env_key(CONCURRENCY_ENV)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable name.
    ///
    /// # Errors
    ///
    /// Fails if the variable is set but not a valid positive integer.
    pub fn from_env_key(key: &str) -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let cfg = match std::env::var(key) {
            Ok(raw) => Self::new(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{key} must be an integer, got `{raw}`"))?,
            ),
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(e) => return Err(e).with_context(|| format!("reading {key}")),
        };
        cfg.validate().map_err(|e| anyhow!("{key}: {e}"))?;
        Ok(cfg)
    }
}

/// Several independently bounded schedulers, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Map of scheduler name to configuration.
    pub schedulers: HashMap<String, SchedulerConfig>,
}

impl RegistryConfig {
    /// Validate all schedulers and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid scheduler.
    pub fn validate(&self) -> Result<(), String> {
        if self.schedulers.is_empty() {
            return Err("at least one scheduler must be defined".into());
        }
        for (name, cfg) in &self.schedulers {
            cfg.validate()
                .map_err(|e| format!("scheduler `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse registry configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
