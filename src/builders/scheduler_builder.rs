//! Builders to construct schedulers from configuration.

use std::collections::HashMap;

use tracing::info;

use crate::config::RegistryConfig;
use crate::core::{AuditSink, Scheduler, SchedulerError, Spawn};

/// Build one scheduler per entry of the registry, all sharing `spawner`.
///
/// # Errors
///
/// Returns `SchedulerError::Config` if the registry fails validation.
pub fn build_schedulers<S>(
    cfg: &RegistryConfig,
    spawner: S,
) -> Result<HashMap<String, Scheduler<S>>, SchedulerError>
where
    S: Spawn + Clone + Send + 'static,
{
    build_schedulers_with_audit(cfg, spawner, |_| None)
}

/// Like [`build_schedulers`], asking `audit_factory` for an optional sink per
/// scheduler name.
///
/// # Errors
///
/// Returns `SchedulerError::Config` if the registry fails validation.
pub fn build_schedulers_with_audit<S, FA>(
    cfg: &RegistryConfig,
    spawner: S,
    mut audit_factory: FA,
) -> Result<HashMap<String, Scheduler<S>>, SchedulerError>
where
    S: Spawn + Clone + Send + 'static,
    FA: FnMut(&str) -> Option<Box<dyn AuditSink>>,
{
    cfg.validate()
        .map_err(|e| SchedulerError::Config(format!("config invalid: {e}")))?;

    let mut schedulers = HashMap::with_capacity(cfg.schedulers.len());
    for (name, scheduler_cfg) in &cfg.schedulers {
        let mut scheduler = Scheduler::from_config(name.as_str(), scheduler_cfg, spawner.clone())?;
        if let Some(sink) = audit_factory(name) {
            scheduler = scheduler.with_audit(sink);
        }
        schedulers.insert(name.clone(), scheduler);
    }
    info!(count = schedulers.len(), "schedulers built from registry");

    Ok(schedulers)
}
