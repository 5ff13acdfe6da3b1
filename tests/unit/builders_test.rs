//! Tests for builder modules

use std::collections::HashMap;

use prometheus_admission::builders::{build_schedulers, build_schedulers_with_audit};
use prometheus_admission::config::{RegistryConfig, SchedulerConfig};
use prometheus_admission::core::{AuditSink, InMemoryAuditSink, SchedulerError};
use prometheus_admission::runtime::TokioSpawner;

fn registry() -> RegistryConfig {
    let mut schedulers = HashMap::new();
    schedulers.insert("uploads".to_string(), SchedulerConfig::new(4));
    schedulers.insert("previews".to_string(), SchedulerConfig::new(1));
    RegistryConfig { schedulers }
}

#[tokio::test]
async fn test_build_schedulers_from_registry() {
    let schedulers = build_schedulers(&registry(), TokioSpawner::current().unwrap()).unwrap();

    assert_eq!(schedulers.len(), 2);
    assert_eq!(schedulers["uploads"].concurrency(), 4);
    assert_eq!(schedulers["uploads"].name(), "uploads");
    assert_eq!(schedulers["previews"].concurrency(), 1);
}

#[tokio::test]
async fn test_build_schedulers_rejects_invalid_registry() {
    let result = build_schedulers(&RegistryConfig::default(), TokioSpawner::current().unwrap());
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[tokio::test]
async fn test_build_schedulers_with_audit() {
    let sink = InMemoryAuditSink::new(16);
    let for_uploads = sink.clone();

    let schedulers = build_schedulers_with_audit(
        &registry(),
        TokioSpawner::current().unwrap(),
        move |name| {
            (name == "uploads").then(|| Box::new(for_uploads.clone()) as Box<dyn AuditSink>)
        },
    )
    .unwrap();

    let handle = schedulers["previews"].submit_future(|| async { Ok::<_, ()>(1) });
    drop(handle);
    assert!(sink.events().is_empty());

    let _handle = schedulers["uploads"].submit_future(|| async { Ok::<_, ()>(1) });
    assert!(sink.events().iter().all(|event| event.scheduler == "uploads"));
    assert!(!sink.events().is_empty());
}
