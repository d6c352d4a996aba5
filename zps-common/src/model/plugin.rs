// zps-common/src/model/plugin.rs
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::manifest::{PluginKind, PluginSpec};

/// A spec paired with its slug and on-disk locations, computed before sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginTarget {
    pub slug: String,
    pub spec: PluginSpec,
    pub url: String,
    pub repo_path: PathBuf,
    pub link_path: PathBuf,
}

impl PluginTarget {
    pub fn repo(&self) -> &str {
        &self.spec.repo
    }

    pub fn kind(&self) -> PluginKind {
        self.spec.kind
    }
}

/// How `HEAD` sits in a managed working tree after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevState {
    /// Attached to a local branch that follows `origin/<branch>`.
    TrackingBranch { branch: String },
    /// Pinned to a tag or commit.
    Detached { tag: Option<String> },
}

impl fmt::Display for RevState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevState::TrackingBranch { branch } => write!(f, "@{branch}"),
            RevState::Detached { tag: Some(tag) } => write!(f, "@{tag}"),
            RevState::Detached { tag: None } => write!(f, "@detached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlugin {
    pub slug: String,
    pub spec: PluginSpec,
    pub local_repo_path: PathBuf,
    pub published_path: PathBuf,
    pub rev_state: RevState,
    pub resolved_commit: String,
}

impl ResolvedPlugin {
    pub fn kind(&self) -> PluginKind {
        self.spec.kind
    }

    pub fn short_commit(&self) -> &str {
        let end = self.resolved_commit.len().min(7);
        &self.resolved_commit[..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Ok,
    Error,
}

/// Per-plugin outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub slug: String,
    pub repo: String,
    pub status: SyncStatus,
    pub message: Option<String>,
    pub resolved_commit: Option<String>,
}

impl SyncResult {
    pub fn ok(plugin: &ResolvedPlugin) -> Self {
        Self {
            slug: plugin.slug.clone(),
            repo: plugin.spec.repo.clone(),
            status: SyncStatus::Ok,
            message: None,
            resolved_commit: Some(plugin.resolved_commit.clone()),
        }
    }

    pub fn failed(target: &PluginTarget, message: impl Into<String>) -> Self {
        Self {
            slug: target.slug.clone(),
            repo: target.spec.repo.clone(),
            status: SyncStatus::Error,
            message: Some(message.into()),
            resolved_commit: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SyncStatus::Ok
    }
}
