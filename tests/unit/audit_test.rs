//! Tests for audit sink

use prometheus_admission::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, TracingAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(7, "uploads", AuditAction::Enqueue, 0, 1);

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].handle, 7);
    assert_eq!(events[0].action, AuditAction::Enqueue);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(1, "uploads", AuditAction::Enqueue, 0, 1));
    sink.record(build_audit_event(2, "uploads", AuditAction::Enqueue, 0, 2));
    sink.record(build_audit_event(3, "uploads", AuditAction::Enqueue, 0, 3));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].handle, 2); // First one popped
    assert_eq!(events[1].handle, 3);
}

#[test]
fn test_audit_sink_clones_share_buffer() {
    let observer = InMemoryAuditSink::new(4);
    let mut writer = observer.clone();

    writer.record(build_audit_event(1, "previews", AuditAction::Admit, 1, 0));

    assert_eq!(observer.events().len(), 1);
    assert_eq!(observer.events()[0].scheduler, "previews");
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(1, "uploads", AuditAction::Fail, 0, 0));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(3, "uploads", AuditAction::Complete, 2, 5);

    assert_eq!(event.handle, 3);
    assert_eq!(event.scheduler, "uploads");
    assert_eq!(event.action, AuditAction::Complete);
    assert_eq!(event.active, 2);
    assert_eq!(event.queued, 5);
    assert!(event.created_at_ms > 0);
    assert_eq!(event.event_id.len(), 36);

    let other = build_audit_event(3, "uploads", AuditAction::Complete, 2, 5);
    assert_ne!(event.event_id, other.event_id);
}

#[test]
fn test_audit_action_serializes_snake_case() {
    let json = serde_json::to_string(&AuditAction::Cancel).unwrap();
    assert_eq!(json, "\"cancel\"");
}

#[test]
fn test_tracing_audit_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(1, "uploads", AuditAction::Admit, 1, 0));
}
