use std::sync::Arc;
use std::time::Instant;

use threadpool::ThreadPool;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument};
use zps_aio::fs::ensure_skeleton;
use zps_common::config::Config;
use zps_common::error::Result as ZpsResult;
use zps_common::manifest;
use zps_common::model::{PluginTarget, ResolvedPlugin, SyncResult};
use zps_common::pipeline::SyncEvent;

use super::worker;
use crate::resolve::{plan_targets, PluginResolver, RepoResolver};

/// Everything one sync run produced, in input order.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub results: Vec<SyncResult>,
    pub resolved: Vec<ResolvedPlugin>,
}

impl SyncOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &SyncResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Syncs every target on a pool of `jobs` workers.
///
/// All jobs run to completion regardless of individual failures; the
/// outcome is only assembled once the pool has drained.
#[instrument(skip_all, name = "core_sync_engine", fields(targets = targets.len()))]
pub fn sync_all(
    targets: Vec<PluginTarget>,
    resolver: Arc<dyn PluginResolver>,
    jobs: usize,
    event_tx: Option<broadcast::Sender<SyncEvent>>,
) -> SyncOutcome {
    let started = Instant::now();
    let workers = jobs.max(1).min(targets.len().max(1));
    let pool = ThreadPool::new(workers);
    debug!("Sync pool started with {} workers.", workers);
    if let Some(tx) = &event_tx {
        let _ = tx.send(SyncEvent::SyncStarted {
            total_jobs: targets.len(),
            workers,
        });
    }

    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let shared: Arc<Vec<PluginTarget>> = Arc::new(targets);

    for index in 0..shared.len() {
        let targets = Arc::clone(&shared);
        let resolver = Arc::clone(&resolver);
        let event_tx = event_tx.clone();
        let result_tx = result_tx.clone();
        debug!("[{}] Submitting job to worker pool.", shared[index].slug);

        pool.execute(move || {
            let outcome =
                worker::execute_sync_job(&targets[index], resolver.as_ref(), event_tx.as_ref());
            let _ = result_tx.send((index, outcome));
        });
    }
    drop(result_tx);
    pool.join();

    let mut slots: Vec<Option<ZpsResult<ResolvedPlugin>>> = vec![None; shared.len()];
    for (index, outcome) in result_rx.iter() {
        slots[index] = Some(outcome);
    }

    let mut outcome = SyncOutcome::default();
    for (target, slot) in shared.iter().zip(slots) {
        match slot {
            Some(Ok(resolved)) => {
                outcome.results.push(SyncResult::ok(&resolved));
                outcome.resolved.push(resolved);
            }
            Some(Err(e)) => {
                outcome.results.push(SyncResult::failed(target, e.to_string()));
            }
            None => {
                error!("[{}] Worker exited without reporting a result", target.slug);
                if let Some(tx) = &event_tx {
                    let _ = tx.send(SyncEvent::LogWarn {
                        message: format!("{}: worker exited without a result", target.slug),
                    });
                }
                outcome
                    .results
                    .push(SyncResult::failed(target, "worker panicked"));
            }
        }
    }

    let fail_count = outcome.failures().count();
    let success_count = outcome.results.len() - fail_count;
    debug!(
        "Sync finished: {} succeeded, {} failed",
        success_count, fail_count
    );
    if let Some(tx) = &event_tx {
        let _ = tx.send(SyncEvent::SyncFinished {
            duration_secs: started.elapsed().as_secs_f64(),
            success_count,
            fail_count,
        });
    }
    outcome
}

/// Loads `config.toml`, prepares the root skeleton and syncs every plugin.
///
/// Config, resolution and skeleton failures abort before any plugin is
/// touched.
pub fn sync_from_config(
    config: &Config,
    event_tx: Option<broadcast::Sender<SyncEvent>>,
) -> ZpsResult<SyncOutcome> {
    let specs = manifest::load(&config.config_path())?;
    let targets = plan_targets(&specs, config)?;
    ensure_skeleton(&config.skeleton_dirs())?;
    Ok(sync_all(
        targets,
        Arc::new(RepoResolver::new()),
        config.jobs,
        event_tx,
    ))
}
