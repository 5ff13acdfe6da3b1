//! Tests for tokio spawner and API models

use std::collections::HashMap;

use futures::stream;
use prometheus_admission::core::{HandleState, Scheduler, Spawn};
use prometheus_admission::runtime::tokio_spawner::TokioSpawner;
use prometheus_admission::runtime::{handle_status, list_schedulers, snapshot};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_tokio_spawner_current_outside_runtime() {
    assert!(TokioSpawner::current().is_err());
}

#[tokio::test]
async fn test_snapshot_and_handle_status() {
    let scheduler = Scheduler::named("uploads", 1, TokioSpawner::current().unwrap()).unwrap();
    let running = scheduler.submit(stream::pending::<Result<(), ()>>);
    let queued = scheduler.submit(stream::pending::<Result<(), ()>>);

    let status = handle_status(&queued);
    assert_eq!(status.id, queued.id());
    assert_eq!(status.state, HandleState::Queued);
    assert_eq!(handle_status(&running).state, HandleState::Running);

    let snap = snapshot(&scheduler);
    assert_eq!(snap.name, "uploads");
    assert_eq!(snap.stats.active, 1);
    assert_eq!(snap.stats.queued, 1);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["name"], "uploads");
    assert_eq!(json["concurrency"], 1);
    assert_eq!(json["queued"], 1);
}

#[tokio::test]
async fn test_list_schedulers_sorted() {
    let spawner = TokioSpawner::current().unwrap();
    let mut schedulers = HashMap::new();
    schedulers.insert("uploads".to_string(), Scheduler::with_spawner(4, spawner.clone()).unwrap());
    schedulers.insert("previews".to_string(), Scheduler::with_spawner(2, spawner).unwrap());

    let listed = list_schedulers(&schedulers);
    let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["previews", "uploads"]);
    assert_eq!(listed[0].stats.concurrency, 2);
}
