// zps-core/src/report.rs
//! Shell initialization text.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use zps_common::config::Config;
use zps_common::model::ResolvedPlugin;

use crate::order::LoadPlan;

/// File suffixes zsh will be asked to `source`.
pub const SOURCE_SUFFIXES: &[&str] = &[".plugin.zsh", ".zsh", ".zsh-theme"];

/// The path to `source` for a plugin, or why it will not be sourced.
pub fn source_file(plugin: &ResolvedPlugin) -> Result<PathBuf, String> {
    let path = &plugin.published_path;
    let target = fs::canonicalize(path)
        .map_err(|e| format!("{} does not resolve: {e}", path.display()))?;
    let meta = fs::metadata(&target)
        .map_err(|e| format!("cannot stat {}: {e}", target.display()))?;
    if !meta.is_file() {
        return Err(format!("{} is not a regular file", target.display()));
    }
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !SOURCE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Err(format!("{name} has no zsh suffix"));
    }
    Ok(path.clone())
}

/// Single-quotes a path for zsh.
pub fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Renders the text evaluated by `eval "$(zps init)"`.
pub fn render_init(config: &Config, plan: &LoadPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "export ZPS_HOME={}", shell_quote(config.zps_root()));
    let _ = writeln!(out, "export PATH={}:\"$PATH\"", shell_quote(&config.bin_dir()));

    if !plan.fpath_dirs.is_empty() {
        out.push_str("fpath=(\n");
        for dir in &plan.fpath_dirs {
            let _ = writeln!(out, "  {}", shell_quote(dir));
        }
        out.push_str("  $fpath\n)\n");
    }

    out.push_str("autoload -Uz compinit && compinit\n");

    for plugin in &plan.source_order {
        match source_file(plugin) {
            Ok(path) => {
                let _ = writeln!(out, "source {}", shell_quote(&path));
            }
            Err(reason) => {
                warn!("Not sourcing {}: {}", plugin.slug, reason);
                let _ = writeln!(out, "# zps: skipped {}: {}", plugin.slug, reason);
            }
        }
    }
    out
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::symlink;

    use zps_common::manifest::{PluginKind, PluginSpec};
    use zps_common::model::RevState;

    use super::*;

    fn plugin(slug: &str, link: PathBuf) -> ResolvedPlugin {
        ResolvedPlugin {
            slug: slug.to_string(),
            spec: PluginSpec {
                source: Default::default(),
                repo: format!("o/{slug}"),
                rev: None,
                file: None,
                kind: PluginKind::Source,
                name: None,
                fpath_dirs: None,
            },
            local_repo_path: PathBuf::from("/unused"),
            published_path: link,
            rev_state: RevState::Detached { tag: None },
            resolved_commit: "abc".to_string(),
        }
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote(Path::new("/a b/it's")), r"'/a b/it'\''s'");
    }

    #[test]
    fn init_sources_eligible_plugins_in_order() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config::with_root(td.path());
        fs::create_dir_all(cfg.plugins_dir()).unwrap();
        let repo = td.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("b.plugin.zsh"), "").unwrap();
        fs::write(repo.join("a.zsh-theme"), "").unwrap();
        fs::write(repo.join("notes.txt"), "").unwrap();

        symlink(repo.join("b.plugin.zsh"), cfg.plugin_link_path("b")).unwrap();
        symlink(repo.join("a.zsh-theme"), cfg.plugin_link_path("a")).unwrap();
        symlink(repo.join("notes.txt"), cfg.plugin_link_path("txt")).unwrap();
        symlink(&repo, cfg.plugin_link_path("dir")).unwrap();

        let plan = LoadPlan {
            source_order: vec![
                plugin("b", cfg.plugin_link_path("b")),
                plugin("dir", cfg.plugin_link_path("dir")),
                plugin("a", cfg.plugin_link_path("a")),
                plugin("txt", cfg.plugin_link_path("txt")),
            ],
            fpath_dirs: vec![PathBuf::from("/x/src"), PathBuf::from("/y")],
        };
        let text = render_init(&cfg, &plan);

        let b = text.find(&format!("source {}", shell_quote(&cfg.plugin_link_path("b"))));
        let a = text.find(&format!("source {}", shell_quote(&cfg.plugin_link_path("a"))));
        assert!(b.is_some() && a.is_some() && b < a, "{text}");
        assert!(text.contains("# zps: skipped dir:"));
        assert!(text.contains("# zps: skipped txt:"));
        assert_eq!(text.matches("source ").count(), 2);
        assert!(text.contains("fpath=(\n  '/x/src'\n  '/y'\n  $fpath\n)\n"));
        assert_eq!(text.matches("compinit").count(), 2);
        assert!(text.starts_with("export ZPS_HOME="));
    }

    #[test]
    fn dangling_link_is_not_sourced() {
        let td = tempfile::tempdir().unwrap();
        let link = td.path().join("gone");
        symlink(td.path().join("missing.zsh"), &link).unwrap();
        assert!(source_file(&plugin("gone", link)).is_err());
    }
}
