//! API-facing status models for consumers such as progress views.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Handle, HandleId, HandleState, Scheduler, SchedulerStats, Spawn};

/// Status of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleStatusResponse {
    /// Submission identifier.
    pub id: HandleId,
    /// Current state.
    pub state: HandleState,
}

/// Snapshot of one scheduler for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    /// Scheduler name.
    pub name: String,
    /// Counters and occupancy at snapshot time.
    #[serde(flatten)]
    pub stats: SchedulerStats,
}

/// Status payload for a handle.
pub fn handle_status<T, E>(handle: &Handle<T, E>) -> HandleStatusResponse {
    HandleStatusResponse {
        id: handle.id(),
        state: handle.state(),
    }
}

/// Snapshot a single scheduler.
pub fn snapshot<S>(scheduler: &Scheduler<S>) -> SchedulerSnapshot
where
    S: Spawn + Clone + Send + 'static,
{
    SchedulerSnapshot {
        name: scheduler.name().to_string(),
        stats: scheduler.stats(),
    }
}

/// Snapshot every scheduler in a registry, sorted by name.
pub fn list_schedulers<S>(schedulers: &HashMap<String, Scheduler<S>>) -> Vec<SchedulerSnapshot>
where
    S: Spawn + Clone + Send + 'static,
{
    let mut snapshots: Vec<_> = schedulers
        .iter()
        .map(|(name, scheduler)| SchedulerSnapshot {
            name: name.clone(),
            stats: scheduler.stats(),
        })
        .collect();
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    snapshots
}
