// zps-common/src/pipeline.rs
use serde::{Deserialize, Serialize};

use crate::manifest::PluginKind;

/// Progress notifications emitted by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    SyncStarted {
        total_jobs: usize,
        workers: usize,
    },
    JobStarted {
        slug: String,
        repo: String,
    },
    JobSucceeded {
        slug: String,
        kind: PluginKind,
        commit: String,
    },
    JobFailed {
        slug: String,
        repo: String,
        error: String,
    },
    SyncFinished {
        duration_secs: f64,
        success_count: usize,
        fail_count: usize,
    },
    LogWarn {
        message: String,
    },
}
