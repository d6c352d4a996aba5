// zps/src/cli/upgrade.rs
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use tracing::info;
use zps_aio::fs::ensure_skeleton;
use zps_common::config::Config;
use zps_common::error::{Result, ZpsError};
use zps_core::resolve::{self_target, RepoResolver};
use zps_core::sync_all;

#[derive(Args, Debug)]
pub struct Upgrade {}

impl Upgrade {
    /// Syncs zps's own repository like any other plugin. Rebuilding and
    /// replacing the running binary is left to the user.
    pub async fn run(&self, config: &Config) -> Result<()> {
        let target = self_target(config, env!("CARGO_PKG_REPOSITORY"))?;
        ensure_skeleton(&config.skeleton_dirs())?;
        info!("Upgrading zps from {}", target.url);

        let repo_path = target.repo_path.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            sync_all(vec![target], Arc::new(RepoResolver::new()), 1, None)
        })
        .await
        .map_err(|e| ZpsError::Generic(format!("upgrade task panicked: {e}")))?;

        if let Some(failed) = outcome.failures().next() {
            return Err(ZpsError::Generic(format!(
                "could not update zps: {}",
                failed.message.as_deref().unwrap_or("unknown error")
            )));
        }

        let commit = outcome
            .resolved
            .first()
            .map(|p| p.short_commit().to_string())
            .unwrap_or_default();
        println!(
            "{} zps source at {} ({})",
            "Updated".green().bold(),
            repo_path.display(),
            commit
        );
        println!(
            "Rebuild with: cargo install --path {}",
            repo_path.join("zps").display()
        );
        Ok(())
    }
}
