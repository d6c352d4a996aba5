// zps-common/src/manifest.rs
//! Decoding of `config.toml` into an ordered list of [`PluginSpec`]s.
//!
//! ```toml
//! [[plugins]]
//! source = "github"
//! repo   = "zsh-users/zsh-autosuggestions"
//! type   = "source"
//! file   = "zsh-autosuggestions.zsh"
//! ```
use std::fmt;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ZpsError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginSource {
    #[default]
    Github,
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Github => write!(f, "github"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    #[default]
    Source,
    Fpath,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Source => write!(f, "source"),
            PluginKind::Fpath => write!(f, "fpath"),
        }
    }
}

/// One `[[plugins]]` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSpec {
    #[serde(default)]
    pub source: PluginSource,
    pub repo: String,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: PluginKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fpath_dirs: Option<Vec<String>>,
}

impl PluginSpec {
    /// Splits `repo` into `(owner, name)`.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        let (owner, name) = self.repo.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some((owner, name))
    }

    /// Label used in human output: alias if set, otherwise the repo.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.repo)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let at = || format!("plugins[{index}] ({})", self.repo);
        if self.owner_and_name().is_none() {
            return Err(ZpsError::Config(format!(
                "{}: repo must have the form 'owner/name'",
                at()
            )));
        }
        if let Some(name) = self.name.as_deref() {
            if name.trim().is_empty() {
                return Err(ZpsError::Config(format!("{}: name must not be empty", at())));
            }
            if name.starts_with('.') {
                return Err(ZpsError::Config(format!(
                    "{}: name '{name}' must not start with '.'",
                    at()
                )));
            }
        }
        if self.rev.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ZpsError::Config(format!("{}: rev must not be empty", at())));
        }
        if let Some(file) = self.file.as_deref() {
            check_repo_relative(file).map_err(|why| {
                ZpsError::Config(format!("{}: file '{file}' {why}", at()))
            })?;
        }
        for dir in self.fpath_dirs.iter().flatten() {
            check_repo_relative(dir).map_err(|why| {
                ZpsError::Config(format!("{}: fpath_dirs entry '{dir}' {why}", at()))
            })?;
        }
        match self.kind {
            PluginKind::Source if self.fpath_dirs.is_some() => Err(ZpsError::Config(format!(
                "{}: fpath_dirs is only valid for type = \"fpath\"",
                at()
            ))),
            PluginKind::Fpath if self.file.is_some() => Err(ZpsError::Config(format!(
                "{}: file is only valid for type = \"source\"",
                at()
            ))),
            _ => Ok(()),
        }
    }
}

/// Paths inside a plugin must stay within its repository.
fn check_repo_relative(raw: &str) -> std::result::Result<(), &'static str> {
    if raw.trim().is_empty() {
        return Err("must not be empty");
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return Err("must be relative to the repository");
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return Err("must not contain '..'");
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    plugins: Vec<PluginSpec>,
}

/// Parses raw config bytes into plugin specs, preserving file order.
pub fn parse(bytes: &[u8]) -> Result<Vec<PluginSpec>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ZpsError::Config(format!("config is not valid UTF-8: {e}")))?;
    let manifest: Manifest =
        toml::from_str(text).map_err(|e| ZpsError::Config(format!("invalid config: {e}")))?;
    for (index, spec) in manifest.plugins.iter().enumerate() {
        spec.validate(index)?;
    }
    debug!("Parsed {} plugin specs", manifest.plugins.len());
    Ok(manifest.plugins)
}

/// Reads and parses the config file at `path`.
pub fn load(path: &Path) -> Result<Vec<PluginSpec>> {
    let bytes = fs::read(path).map_err(|e| {
        ZpsError::Config(format!("cannot read config {}: {e}", path.display()))
    })?;
    parse(&bytes)
}
