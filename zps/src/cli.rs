// zps/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use tracing::warn;
use zps_common::error::Result;
use zps_common::model::{PluginTarget, ResolvedPlugin};
use zps_common::{manifest, Config};
use zps_core::resolve::{plan_targets, RepoResolver};

pub mod config;
pub mod home;
pub mod init;
pub mod list;
pub mod order;
pub mod status;
pub mod sync;
pub mod upgrade;

use crate::cli::config::EditConfig;
use crate::cli::home::Home;
use crate::cli::init::InitArgs;
use crate::cli::list::List;
use crate::cli::order::Order;
use crate::cli::sync::SyncArgs;
use crate::cli::upgrade::Upgrade;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "zps", bin_name = "zps")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print shell initialization code (use with `eval "$(zps init)"`)
    Init(InitArgs),
    /// Clone or update every configured plugin
    Sync(SyncArgs),
    /// Show configured plugins with their checked-out revision
    List(List),
    /// Show the load order and fpath block
    Order(Order),
    /// Print the zps root directory
    Home(Home),
    /// Update zps's own checkout
    Upgrade(Upgrade),
    /// Open config.toml in $EDITOR
    Config(EditConfig),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Init(command) => command.run(config).await,
            Self::Sync(command) => command.run(config).await,
            Self::List(command) => command.run(config).await,
            Self::Order(command) => command.run(config).await,
            Self::Home(command) => command.run(config).await,
            Self::Upgrade(command) => command.run(config).await,
            Self::Config(command) => command.run(config).await,
        }
    }
}

/// Reads the configured plugins and their on-disk state, without syncing.
/// Plugins that were never synced come back in the second list.
pub(crate) fn inspect_configured(
    config: &Config,
) -> Result<(Vec<ResolvedPlugin>, Vec<PluginTarget>)> {
    let specs = manifest::load(&config.config_path())?;
    let targets = plan_targets(&specs, config)?;
    let (present, missing) = RepoResolver::new().inspect_all(&targets);
    for target in &missing {
        warn!("{} is not synced yet (run 'zps sync')", target.slug);
    }
    Ok((present, missing))
}
