// zps/src/cli/list.rs
use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use tracing::debug;
use zps_aio::git2::upstream_status;
use zps_common::config::Config;
use zps_common::error::Result;
use zps_common::manifest::PluginKind;
use zps_common::model::{ResolvedPlugin, RevState};
use zps_core::report::source_file;
use zps_core::{plan, plugin_fpath_dirs, FsListing};

use crate::cli::inspect_configured;

#[derive(Args, Debug)]
pub struct List {
    /// Compare each checkout with its upstream branch (as of the last sync)
    #[arg(long)]
    pub check: bool,
}

fn rev_cell(state: &RevState) -> Cell {
    let text = state.to_string();
    match state {
        RevState::TrackingBranch { .. } => Cell::new(&text).style_spec("Fg"),
        RevState::Detached { tag: Some(_) } => Cell::new(&text).style_spec("Fy"),
        RevState::Detached { tag: None } => Cell::new(&text).style_spec("Fr"),
    }
}

impl List {
    fn header(&self) -> Row {
        let mut cells = vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Repo").style_spec("b"),
            Cell::new("Source").style_spec("b"),
            Cell::new("Rev").style_spec("b"),
            Cell::new("Commit").style_spec("b"),
        ];
        if self.check {
            cells.push(Cell::new("Behind").style_spec("b"));
            cells.push(Cell::new("Ahead").style_spec("b"));
            cells.push(Cell::new("Dirty").style_spec("b"));
        }
        Row::new(cells)
    }

    fn row(&self, plugin: &ResolvedPlugin, note: Option<&str>) -> Row {
        let name = match note {
            Some(note) => format!("{} {}", plugin.slug, note),
            None => plugin.slug.clone(),
        };
        let mut cells = vec![
            Cell::new(&name).style_spec("Fb"),
            Cell::new(&plugin.spec.repo),
            Cell::new(&plugin.spec.source.to_string()),
            rev_cell(&plugin.rev_state),
            Cell::new(plugin.short_commit()),
        ];
        if self.check {
            match upstream_status(&plugin.local_repo_path) {
                Ok(status) if status.known => {
                    cells.push(Cell::new(&status.behind.to_string()));
                    cells.push(Cell::new(&status.ahead.to_string()));
                    cells.push(Cell::new(if status.dirty { "*" } else { "" }));
                }
                Ok(status) => {
                    cells.push(Cell::new("-"));
                    cells.push(Cell::new("-"));
                    cells.push(Cell::new(if status.dirty { "*" } else { "" }));
                }
                Err(e) => {
                    debug!("[{}] upstream status unavailable: {}", plugin.slug, e);
                    cells.push(Cell::new("?"));
                    cells.push(Cell::new("?"));
                    cells.push(Cell::new("?"));
                }
            }
        }
        Row::new(cells)
    }

    pub async fn run(&self, config: &Config) -> Result<()> {
        let (resolved, missing) = inspect_configured(config)?;
        if resolved.is_empty() && missing.is_empty() {
            println!("{}", "0 plugins configured".yellow());
            return Ok(());
        }
        let load = plan(&resolved, &FsListing);

        let mut sources = Table::new();
        sources.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        sources.add_row(self.header());
        for plugin in &load.source_order {
            let note = source_file(plugin).err().map(|_| "(not sourced)");
            sources.add_row(self.row(plugin, note));
        }

        let mut fpaths = Table::new();
        fpaths.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        fpaths.add_row(self.header());
        let fpath_plugins: Vec<&ResolvedPlugin> = resolved
            .iter()
            .filter(|p| p.kind() == PluginKind::Fpath)
            .collect();
        for plugin in &fpath_plugins {
            fpaths.add_row(self.row(plugin, None));
        }

        if !load.source_order.is_empty() {
            println!("{}", "Source order".bold());
            sources.printstd();
        }
        if !fpath_plugins.is_empty() {
            println!("{}", "fpath".bold());
            fpaths.printstd();
            for plugin in &fpath_plugins {
                let dirs = plugin_fpath_dirs(plugin, &FsListing);
                if dirs.is_empty() {
                    println!("  {} {}", plugin.slug.cyan(), "(no completion dirs)".dimmed());
                    continue;
                }
                println!("  {}", plugin.slug.cyan());
                for dir in &dirs {
                    println!("    {}", dir.display());
                }
            }
        }
        if !missing.is_empty() {
            println!("{}", "Not synced".bold());
            for target in &missing {
                println!("  {} ({})", target.slug.yellow(), target.repo());
            }
        }

        println!(
            "{}",
            format!(
                "{} source, {} fpath, {} not synced",
                load.source_order.len(),
                fpath_plugins.len(),
                missing.len()
            )
            .bold()
        );
        Ok(())
    }
}
