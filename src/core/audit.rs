//! Audit sink implementations.
//!
//! Every lifecycle transition of a submission can be mirrored into an
//! [`AuditSink`]. The in-memory sink keeps a bounded window of recent events.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::HandleId;
use crate::util::clock::now_ms;

/// Lifecycle transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Submission placed in the wait queue.
    Enqueue,
    /// Submission admitted into a slot.
    Admit,
    /// Operation completed normally.
    Complete,
    /// Operation failed.
    Fail,
    /// Submission cancelled.
    Cancel,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related submission.
    pub handle: HandleId,
    /// Scheduler name.
    pub scheduler: String,
    /// Transition taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Running operations after the transition.
    pub active: usize,
    /// Waiting submissions after the transition.
    pub queued: usize,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so one clone can be handed to a scheduler
/// while another is kept for inspection.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Audit sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            event_id = %event.event_id,
            scheduler = %event.scheduler,
            handle = event.handle,
            action = ?event.action,
            active = event.active,
            queued = event.queued,
            "admission audit"
        );
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    handle: HandleId,
    scheduler: impl Into<String>,
    action: AuditAction,
    active: usize,
    queued: usize,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        handle,
        scheduler: scheduler.into(),
        action,
        created_at_ms: now_ms(),
        active,
        queued,
    }
}
