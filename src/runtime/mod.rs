//! Runtime adapters and API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{handle_status, list_schedulers, snapshot, HandleStatusResponse, SchedulerSnapshot};
pub use tokio_spawner::TokioSpawner;
