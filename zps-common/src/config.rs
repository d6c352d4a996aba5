// zps-common/src/config.rs
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tracing::debug;

use super::error::{Result, ZpsError};

const ROOT_DIR_NAME: &str = ".zps";
const DEFAULT_GITHUB_URL: &str = "https://github.com";

/// Environment inputs that decide where the zps root lives, in precedence order.
#[derive(Debug, Clone, Default)]
pub struct RootEnv {
    pub zps_home: Option<OsString>,
    pub xdg_config_home: Option<OsString>,
    pub zdotdir: Option<OsString>,
    pub home: Option<OsString>,
}

impl RootEnv {
    pub fn from_process() -> Self {
        Self {
            zps_home: env::var_os("ZPS_HOME"),
            xdg_config_home: env::var_os("XDG_CONFIG_HOME"),
            zdotdir: env::var_os("ZDOTDIR"),
            home: env::var_os("HOME"),
        }
    }
}

fn non_empty(v: &Option<OsString>) -> Option<PathBuf> {
    v.as_ref().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Resolves the root directory:
/// `ZPS_HOME`, then `$XDG_CONFIG_HOME/.zps`, then `$ZDOTDIR/.zps`, then `$HOME/.zps`.
pub fn root_from_env(vars: &RootEnv) -> Option<PathBuf> {
    if let Some(root) = non_empty(&vars.zps_home) {
        return Some(root);
    }
    non_empty(&vars.xdg_config_home)
        .or_else(|| non_empty(&vars.zdotdir))
        .or_else(|| non_empty(&vars.home))
        .map(|base| base.join(ROOT_DIR_NAME))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub zps_root: PathBuf,
    pub github_base_url: String,
    pub jobs: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading zps configuration");

        let mut vars = RootEnv::from_process();
        if vars.home.as_ref().is_none_or(|h| h.is_empty()) {
            vars.home = UserDirs::new().map(|ud| ud.home_dir().as_os_str().to_owned());
        }
        let zps_root = root_from_env(&vars).ok_or_else(|| {
            ZpsError::Config(
                "could not determine zps root (set ZPS_HOME or HOME)".to_string(),
            )
        })?;
        debug!("Effective zps root set to: {}", zps_root.display());

        let github_base_url = env::var("ZPS_GITHUB_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_URL.to_string());

        let jobs = match env::var("ZPS_JOBS").ok().filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ZpsError::Config(format!("ZPS_JOBS must be a positive integer, got '{raw}'"))
                })?,
            None => default_jobs(),
        };
        debug!("Worker pool size: {}", jobs);

        Ok(Self {
            zps_root,
            github_base_url,
            jobs,
        })
    }

    /// Builds a config rooted at `root` with default settings.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            zps_root: root.into(),
            github_base_url: DEFAULT_GITHUB_URL.to_string(),
            jobs: default_jobs(),
        }
    }

    pub fn zps_root(&self) -> &Path {
        &self.zps_root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.zps_root.join("bin")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.zps_root.join("plugins")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.zps_root.join("repos")
    }

    pub fn config_path(&self) -> PathBuf {
        self.zps_root.join("config.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.zps_root.join("logs")
    }

    pub fn repo_path(&self, slug: &str) -> PathBuf {
        self.repos_dir().join(slug)
    }

    pub fn plugin_link_path(&self, slug: &str) -> PathBuf {
        self.plugins_dir().join(slug)
    }

    /// Directories that must exist before any sync.
    pub fn skeleton_dirs(&self) -> Vec<PathBuf> {
        vec![self.bin_dir(), self.plugins_dir(), self.repos_dir()]
    }

    /// Remote URL for a GitHub `owner/name` coordinate.
    pub fn github_url(&self, repo: &str) -> String {
        format!("{}/{}.git", self.github_base_url.trim_end_matches('/'), repo)
    }
}

/// One fewer than the physical core count, capped to keep remote hosts happy.
pub fn default_jobs() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(6)
}
