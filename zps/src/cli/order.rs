// zps/src/cli/order.rs
use clap::Args;
use colored::Colorize;
use zps_common::config::Config;
use zps_common::error::Result;
use zps_core::report::source_file;
use zps_core::{plan, FsListing, LoadPlan};

use crate::cli::inspect_configured;

#[derive(Args, Debug)]
pub struct Order {}

impl Order {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let (resolved, _missing) = inspect_configured(config)?;
        print_plan(&plan(&resolved, &FsListing));
        Ok(())
    }
}

/// Prints the source order and the fpath block.
pub fn print_plan(plan: &LoadPlan) {
    println!("{}", "Source order".bold());
    if plan.source_order.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for (i, plugin) in plan.source_order.iter().enumerate() {
        let note = match source_file(plugin) {
            Ok(_) => String::new(),
            Err(_) => format!(" {}", "(not sourced)".yellow()),
        };
        println!(
            "  {:>2}. {} {}{}",
            i + 1,
            plugin.slug.cyan(),
            plugin.short_commit().dimmed(),
            note
        );
    }

    println!("{}", "fpath".bold());
    if plan.fpath_dirs.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for dir in &plan.fpath_dirs {
        println!("  {}", dir.display());
    }
}
