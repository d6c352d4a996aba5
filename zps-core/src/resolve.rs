// zps-core/src/resolve.rs
//! Maps plugin specs to slugs and on-disk locations, and materializes them.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use zps_aio::fs::{list_directory_entries, publish_symlink};
use zps_aio::git2::{ensure_repo, inspect_repo, RepoHead};
use zps_common::config::Config;
use zps_common::error::{Result, ZpsError};
use zps_common::manifest::{PluginKind, PluginSpec};
use zps_common::model::{PluginTarget, ResolvedPlugin};

use crate::report::SOURCE_SUFFIXES;

/// Keeps `[A-Za-z0-9._-]`, replacing everything else with `-`. A leading
/// `.` is replaced too, so a slug never names `.`, `..` or a hidden entry
/// that could clash with staging paths under `repos/`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .enumerate()
        .map(|(i, c)| {
            if c == '.' && i == 0 {
                '-'
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// `name` when given, otherwise `owner__name`.
pub fn slug_for(spec: &PluginSpec) -> String {
    match spec.name.as_deref() {
        Some(name) => sanitize(name),
        None => sanitize(&spec.repo.replacen('/', "__", 1)),
    }
}

/// Computes every target's slug and paths, rejecting slug collisions.
pub fn plan_targets(specs: &[PluginSpec], config: &Config) -> Result<Vec<PluginTarget>> {
    let mut by_slug: BTreeMap<String, Vec<&PluginSpec>> = BTreeMap::new();
    for spec in specs {
        by_slug.entry(slug_for(spec)).or_default().push(spec);
    }

    if let Some((slug, colliding)) = by_slug.iter().find(|(_, v)| v.len() > 1) {
        let hint = if colliding.iter().any(|s| s.name.is_none()) {
            "; give each entry a distinct `name`".to_string()
        } else {
            String::new()
        };
        return Err(ZpsError::Resolution {
            slug: slug.clone(),
            repos: colliding.iter().map(|s| s.repo.clone()).collect(),
            hint,
        });
    }

    Ok(specs
        .iter()
        .map(|spec| {
            let slug = slug_for(spec);
            PluginTarget {
                url: config.github_url(&spec.repo),
                repo_path: config.repo_path(&slug),
                link_path: config.plugin_link_path(&slug),
                spec: spec.clone(),
                slug,
            }
        })
        .collect())
}

/// The tool's own repository as a managed target, derived from a
/// `https://host/owner/name` repository URL.
pub fn self_target(config: &Config, repository_url: &str) -> Result<PluginTarget> {
    let trimmed = repository_url.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = trimmed.rsplit('/');
    let (name, owner) = match (parts.next(), parts.next()) {
        (Some(n), Some(o)) if !n.is_empty() && !o.is_empty() => (n, o),
        _ => {
            return Err(ZpsError::Config(format!(
                "cannot derive owner/name from repository URL '{repository_url}'"
            )))
        }
    };
    let spec = PluginSpec {
        source: Default::default(),
        repo: format!("{owner}/{name}"),
        rev: None,
        file: None,
        kind: PluginKind::Source,
        name: Some("zps".to_string()),
        fpath_dirs: None,
    };
    let mut targets = plan_targets(std::slice::from_ref(&spec), config)?;
    targets
        .pop()
        .ok_or_else(|| ZpsError::Generic("self target planning produced nothing".to_string()))
}

/// First root-level file matching the entry patterns, names sorted per pattern.
pub fn discover_entry_file(repo_root: &Path) -> Result<Option<PathBuf>> {
    let mut files: Vec<(String, PathBuf)> = list_directory_entries(repo_root)?
        .into_iter()
        .filter(|(_, _, is_dir)| !is_dir)
        .map(|(name, path, _)| (name, path))
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for suffix in SOURCE_SUFFIXES {
        if let Some((_, path)) = files.iter().find(|(name, _)| name.ends_with(suffix)) {
            return Ok(Some(path.clone()));
        }
    }
    Ok(None)
}

/// Where a target's published symlink should point once its tree is checked out.
fn publish_target(target: &PluginTarget) -> Result<PathBuf> {
    let root = &target.repo_path;
    match target.kind() {
        PluginKind::Fpath => Ok(root.clone()),
        PluginKind::Source => match target.spec.file.as_deref() {
            Some(file) => {
                let path = root.join(file);
                if path.symlink_metadata().is_err() {
                    return Err(ZpsError::sync(
                        &target.slug,
                        target.repo(),
                        format!("configured file '{file}' does not exist in the repository"),
                    ));
                }
                Ok(path)
            }
            None => match discover_entry_file(root)? {
                Some(entry) => Ok(entry),
                None => {
                    debug!(
                        "[{}] No entry file found, publishing repository root",
                        target.slug
                    );
                    Ok(root.clone())
                }
            },
        },
    }
}

fn to_resolved(target: &PluginTarget, head: RepoHead) -> ResolvedPlugin {
    ResolvedPlugin {
        slug: target.slug.clone(),
        spec: target.spec.clone(),
        local_repo_path: target.repo_path.clone(),
        published_path: target.link_path.clone(),
        rev_state: head.rev_state,
        resolved_commit: head.commit,
    }
}

/// The seam between the sync engine and whatever brings a plugin up to date.
pub trait PluginResolver: Send + Sync {
    fn resolve(&self, target: &PluginTarget) -> Result<ResolvedPlugin>;
}

/// Resolves plugins into git working trees under `repos/` and symlinks under `plugins/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoResolver;

impl RepoResolver {
    pub fn new() -> Self {
        Self
    }

    /// Builds a [`ResolvedPlugin`] from what is already on disk, without any
    /// network access. `None` when the plugin has never been synced.
    pub fn inspect(&self, target: &PluginTarget) -> Result<Option<ResolvedPlugin>> {
        let head = inspect_repo(&target.repo_path)
            .map_err(|e| ZpsError::sync(&target.slug, target.repo(), e))?;
        Ok(head.map(|h| to_resolved(target, h)))
    }

    /// Inspects every target; those never synced are returned separately.
    pub fn inspect_all(
        &self,
        targets: &[PluginTarget],
    ) -> (Vec<ResolvedPlugin>, Vec<PluginTarget>) {
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for target in targets {
            match self.inspect(target) {
                Ok(Some(resolved)) => present.push(resolved),
                Ok(None) => missing.push(target.clone()),
                Err(e) => {
                    warn!("[{}] Could not inspect working tree: {}", target.slug, e);
                    missing.push(target.clone());
                }
            }
        }
        (present, missing)
    }
}

impl PluginResolver for RepoResolver {
    #[instrument(skip_all, fields(slug = %target.slug, repo = %target.repo()))]
    fn resolve(&self, target: &PluginTarget) -> Result<ResolvedPlugin> {
        debug!("Resolving {} from {}", target.slug, target.url);
        let head = ensure_repo(&target.url, &target.repo_path, target.spec.rev.as_deref())
            .map_err(|e| ZpsError::sync(&target.slug, target.repo(), e))?;
        debug!(
            "[{}] Checked out {} ({})",
            target.slug, head.commit, head.rev_state
        );

        let link_target = publish_target(target).map_err(|e| match e {
            ZpsError::Sync { .. } => e,
            other => ZpsError::sync(&target.slug, target.repo(), other),
        })?;
        publish_symlink(&link_target, &target.link_path)
            .map_err(|e| ZpsError::plugin_fs(&target.slug, target.repo(), e))?;

        Ok(to_resolved(target, head))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use zps_common::manifest::parse;

    use super::*;

    fn specs(doc: &str) -> Vec<PluginSpec> {
        parse(doc.as_bytes()).unwrap()
    }

    #[test]
    fn slug_prefers_name_and_sanitizes() {
        let s = specs(
            r#"
[[plugins]]
repo = "zsh-users/zsh-autosuggestions"

[[plugins]]
repo = "ohmyzsh/ohmyzsh"
name = "clipboard"

[[plugins]]
repo = "some one/plug+in"
"#,
        );
        assert_eq!(slug_for(&s[0]), "zsh-users__zsh-autosuggestions");
        assert_eq!(slug_for(&s[1]), "clipboard");
        assert_eq!(slug_for(&s[2]), "some-one__plug-in");
    }

    #[test]
    fn slugs_never_start_with_a_dot() {
        let s = specs(
            r#"
[[plugins]]
repo = ".dotfiles/plug"

[[plugins]]
repo = "../x"
"#,
        );
        assert_eq!(slug_for(&s[0]), "-dotfiles__plug");
        assert_eq!(slug_for(&s[1]), "-.__x");

        let mut unchecked = s[0].clone();
        for name in [".", "..", ".hidden"] {
            unchecked.name = Some(name.to_string());
            let slug = slug_for(&unchecked);
            assert!(!slug.starts_with('.'), "{name} -> {slug}");
        }
    }

    #[test]
    fn aliases_disambiguate_same_repo() {
        let s = specs(
            r#"
[[plugins]]
repo = "ohmyzsh/ohmyzsh"
name = "clipboard"

[[plugins]]
repo = "ohmyzsh/ohmyzsh"
name = "copypath"
"#,
        );
        let cfg = Config::with_root("/r");
        let targets = plan_targets(&s, &cfg).unwrap();
        let slugs: Vec<_> = targets.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, ["clipboard", "copypath"]);
        assert_eq!(targets[0].repo_path, PathBuf::from("/r/repos/clipboard"));
        assert_eq!(targets[1].link_path, PathBuf::from("/r/plugins/copypath"));
        assert_eq!(targets[0].url, "https://github.com/ohmyzsh/ohmyzsh.git");
    }

    #[test]
    fn same_repo_without_name_is_resolution_error() {
        let s = specs(
            r#"
[[plugins]]
repo = "ohmyzsh/ohmyzsh"

[[plugins]]
repo = "ohmyzsh/ohmyzsh"
file = "lib/git.zsh"
"#,
        );
        let err = plan_targets(&s, &Config::with_root("/r")).unwrap_err();
        assert!(err.is_fatal());
        match err {
            ZpsError::Resolution { slug, repos, hint } => {
                assert_eq!(slug, "ohmyzsh__ohmyzsh");
                assert_eq!(repos.len(), 2);
                assert!(hint.contains("name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn alias_colliding_with_derived_slug_is_rejected() {
        let s = specs(
            r#"
[[plugins]]
repo = "a/b"

[[plugins]]
repo = "c/d"
name = "a__b"
"#,
        );
        assert!(matches!(
            plan_targets(&s, &Config::with_root("/r")),
            Err(ZpsError::Resolution { .. })
        ));
    }

    #[test]
    fn self_target_uses_fixed_slug() {
        let cfg = Config::with_root("/r");
        let t = self_target(&cfg, "https://github.com/zps-dev/zps").unwrap();
        assert_eq!(t.slug, "zps");
        assert_eq!(t.spec.repo, "zps-dev/zps");
        assert_eq!(t.repo_path, PathBuf::from("/r/repos/zps"));
        assert!(self_target(&cfg, "zps").is_err());
    }

    #[test]
    fn entry_file_discovery_follows_pattern_priority() {
        let td = tempfile::tempdir().unwrap();
        let root = td.path();
        fs::write(root.join("b.zsh"), "").unwrap();
        fs::write(root.join("a.zsh-theme"), "").unwrap();
        fs::write(root.join("z.plugin.zsh"), "").unwrap();
        fs::create_dir_all(root.join("dir.plugin.zsh")).unwrap();
        assert_eq!(
            discover_entry_file(root).unwrap(),
            Some(root.join("z.plugin.zsh"))
        );

        fs::remove_file(root.join("z.plugin.zsh")).unwrap();
        fs::write(root.join("a.zsh"), "").unwrap();
        assert_eq!(discover_entry_file(root).unwrap(), Some(root.join("a.zsh")));

        fs::remove_file(root.join("a.zsh")).unwrap();
        fs::remove_file(root.join("b.zsh")).unwrap();
        assert_eq!(
            discover_entry_file(root).unwrap(),
            Some(root.join("a.zsh-theme"))
        );

        fs::remove_file(root.join("a.zsh-theme")).unwrap();
        assert_eq!(discover_entry_file(root).unwrap(), None);
    }

    #[test]
    fn missing_configured_file_is_sync_error() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config::with_root(td.path());
        let s = specs("[[plugins]]\nrepo = \"o/p\"\nfile = \"nope.zsh\"\n");
        let target = plan_targets(&s, &cfg).unwrap().remove(0);
        fs::create_dir_all(&target.repo_path).unwrap();

        let err = publish_target(&target).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.slug(), Some("o__p"));
    }

    #[test]
    fn inspect_of_unsynced_plugin_is_none() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config::with_root(td.path());
        let targets = plan_targets(&specs("[[plugins]]\nrepo = \"o/p\"\n"), &cfg).unwrap();
        let (present, missing) = RepoResolver::new().inspect_all(&targets);
        assert!(present.is_empty());
        assert_eq!(missing.len(), 1);
    }
}
