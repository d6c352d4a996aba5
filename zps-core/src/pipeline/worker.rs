use tokio::sync::broadcast;
use tracing::{debug, instrument};
use zps_common::error::{Result as ZpsResult, ZpsError};
use zps_common::model::{PluginTarget, ResolvedPlugin};
use zps_common::pipeline::SyncEvent;

use crate::resolve::PluginResolver;

fn send(event_tx: Option<&broadcast::Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event);
    }
}

/// Runs one plugin through the resolver. Whatever goes wrong is reported as
/// a per-plugin error so it never aborts the rest of the run.
#[instrument(skip_all, fields(slug = %target.slug))]
pub(super) fn execute_sync_job(
    target: &PluginTarget,
    resolver: &dyn PluginResolver,
    event_tx: Option<&broadcast::Sender<SyncEvent>>,
) -> ZpsResult<ResolvedPlugin> {
    send(
        event_tx,
        SyncEvent::JobStarted {
            slug: target.slug.clone(),
            repo: target.repo().to_string(),
        },
    );

    let result = resolver.resolve(target).map_err(|e| match e {
        ZpsError::Sync { .. } | ZpsError::PluginFilesystem { .. } => e,
        other => ZpsError::sync(&target.slug, target.repo(), other),
    });

    match &result {
        Ok(resolved) => {
            debug!("[{}] Synced at {}", target.slug, resolved.short_commit());
            send(
                event_tx,
                SyncEvent::JobSucceeded {
                    slug: resolved.slug.clone(),
                    kind: resolved.kind(),
                    commit: resolved.resolved_commit.clone(),
                },
            );
        }
        Err(e) => {
            debug!("[{}] Sync failed: {}", target.slug, e);
            send(
                event_tx,
                SyncEvent::JobFailed {
                    slug: target.slug.clone(),
                    repo: target.repo().to_string(),
                    error: e.to_string(),
                },
            );
        }
    }
    result
}
