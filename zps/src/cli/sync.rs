// zps/src/cli/sync.rs
use clap::Args;
use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{debug, error};
use zps_common::config::Config;
use zps_common::error::{Result, ZpsError};
use zps_core::{plan, sync_from_config, FsListing};

use crate::cli::order::print_plan;
use crate::cli::status;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Skip printing the load order after syncing
    #[arg(long)]
    pub quiet: bool,
}

impl SyncArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let (event_tx, event_rx) = broadcast::channel(256);
        let status_handle = tokio::spawn(status::handle_events(event_rx));

        let engine_config = config.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            sync_from_config(&engine_config, Some(event_tx))
        })
        .await
        .map_err(|e| ZpsError::Generic(format!("sync task panicked: {e}")))?;

        if let Err(e) = status_handle.await {
            debug!("Status display task ended abnormally: {}", e);
        }
        let outcome = outcome?;

        if !self.quiet && !outcome.resolved.is_empty() {
            println!();
            print_plan(&plan(&outcome.resolved, &FsListing));
        }

        let failed: Vec<&str> = outcome.failures().map(|r| r.slug.as_str()).collect();
        if failed.is_empty() {
            return Ok(());
        }
        for result in outcome.failures() {
            error!(
                "[{}] {}",
                result.slug,
                result.message.as_deref().unwrap_or("unknown error")
            );
        }
        eprintln!(
            "{} {}",
            "Failed plugins:".red().bold(),
            failed.join(", ")
        );
        Err(ZpsError::Generic(format!(
            "{} of {} plugins failed to sync: {}",
            failed.len(),
            outcome.results.len(),
            failed.join(", ")
        )))
    }
}
