// zps/src/cli/init.rs
use clap::Args;
use tracing::{debug, warn};
use zps_common::config::Config;
use zps_common::error::Result;
use zps_core::report::{render_init, shell_quote};
use zps_core::{plan, FsListing, LoadPlan};

use crate::cli::inspect_configured;

#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    /// Writes shell setup to stdout; diagnostics go to stderr so the
    /// output stays safe to `eval`.
    pub async fn run(&self, config: &Config) -> Result<()> {
        if !config.config_path().exists() {
            warn!(
                "No config at {}; emitting an empty setup",
                config.config_path().display()
            );
            print!("{}", render_init(config, &LoadPlan::default()));
            return Ok(());
        }

        let (resolved, missing) = inspect_configured(config)?;
        let load = plan(&resolved, &FsListing);
        debug!(
            "Init: {} source plugins, {} fpath dirs",
            load.source_order.len(),
            load.fpath_dirs.len()
        );

        print!("{}", render_init(config, &load));
        for target in &missing {
            println!(
                "# zps: {} is not synced; run 'zps sync' (repo {})",
                target.slug,
                shell_quote(&target.repo_path)
            );
        }
        Ok(())
    }
}
