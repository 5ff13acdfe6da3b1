//! Core scheduling abstractions and slot accounting.

pub mod audit;
pub mod error;
pub mod handle;
pub mod operation;
pub mod scheduler;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use error::{AppResult, SchedulerError};
pub use handle::{Handle, HandleId, HandleState};
pub use operation::{from_future, Operation};
pub use scheduler::{Scheduler, SchedulerStats, Spawn};
