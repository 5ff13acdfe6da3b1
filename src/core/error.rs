//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler construction and configuration.
///
/// Failures of the scheduled operations themselves never show up here; they
/// are delivered through the operation's own [`Handle`](crate::core::Handle).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Concurrency limit must be at least one.
    #[error("invalid concurrency limit: {0}")]
    InvalidConcurrency(usize),
    /// Configuration could not be parsed or failed validation.
    #[error("config error: {0}")]
    Config(String),
    /// No async runtime is available to drive admitted operations.
    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
