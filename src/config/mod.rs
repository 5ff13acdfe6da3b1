//! Configuration models for schedulers.

pub mod scheduler;

pub use scheduler::{RegistryConfig, SchedulerConfig, CONCURRENCY_ENV, DEFAULT_CONCURRENCY};
