//! Builders to construct schedulers from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{build_schedulers, build_schedulers_with_audit};
