//! # Prometheus Admission
//!
//! A bounded-concurrency admission scheduler for cancellable asynchronous
//! operations.
//!
//! Callers submit operation factories. Up to `concurrency` of them run at
//! once; the rest park in a first-come-first-served queue and are admitted as
//! running operations finish, fail, or are cancelled.
//!
//! ## Core Problem Solved
//!
//! Interactive clients fire many expensive operations in bursts (a user drops
//! fifty files on an upload field). Running all of them at once saturates the
//! link and the backend; serializing them wastes capacity. The scheduler keeps
//! exactly `N` in flight and guarantees that bound under any interleaving of
//! submission, completion, failure, and cancellation.
//!
//! ## Key Features
//!
//! - **Strict FIFO admission**: waiters start in submission order, always
//! - **Cancellation everywhere**: queued work is dropped without ever
//!   starting; running work is stopped and its slot released exactly once
//! - **Transparent handles**: a [`Handle`](core::Handle) is a stream of the
//!   operation's own values and error, unchanged
//! - **No unbounded recursion**: a chain of instantly finishing operations is
//!   drained by a loop
//! - **Pluggable runtime**: drivers are spawned through the
//!   [`Spawn`](core::Spawn) trait, tokio by default
//!
//! ## Usage
//!
//! ```rust,ignore
//! use futures::{stream, StreamExt};
//! use prometheus_admission::core::Scheduler;
//!
//! let scheduler = Scheduler::new(4)?;
//!
//! // Any `FnOnce() -> impl Stream<Item = Result<T, E>>` is an operation.
//! let mut upload = scheduler.submit(move || upload_progress(file));
//! while let Some(progress) = upload.next().await {
//!     render(progress?);
//! }
//!
//! // User removed the item: the upload is dropped if still queued,
//! // or stopped if running.
//! upload.cancel();
//! ```
//!
//! For complete examples, see:
//! - `tests/admission_test.rs` - end-to-end scheduling scenarios
//! - `tests/cascade_test.rs` - synchronous completion chains

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and slot accounting.
pub mod core;
/// Configuration models for schedulers.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure backing the scheduler's bookkeeping.
pub mod infra;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
