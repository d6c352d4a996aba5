use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ZpsError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("Git Error: {0}")]
    Git(#[from] Arc<git2::Error>),

    #[error("TOML Parsing Error: {0}")]
    Toml(#[from] Arc<toml::de::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resolution Error: slug '{slug}' is produced by more than one plugin ({}){hint}", repos.join(", "))]
    Resolution {
        slug: String,
        repos: Vec<String>,
        hint: String,
    },

    #[error("Sync Error [{slug}] ({repo}): {message}")]
    Sync {
        slug: String,
        repo: String,
        message: String,
    },

    #[error("Filesystem Error at {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    #[error("Filesystem Error [{slug}] ({repo}): {message}")]
    PluginFilesystem {
        slug: String,
        repo: String,
        message: String,
    },

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl ZpsError {
    /// Wraps a lower-level failure as a per-plugin sync error.
    pub fn sync(slug: &str, repo: &str, err: impl std::fmt::Display) -> Self {
        ZpsError::Sync {
            slug: slug.to_string(),
            repo: repo.to_string(),
            message: err.to_string(),
        }
    }

    /// Wraps a publish (symlink) failure for one plugin.
    pub fn plugin_fs(slug: &str, repo: &str, err: impl std::fmt::Display) -> Self {
        ZpsError::PluginFilesystem {
            slug: slug.to_string(),
            repo: repo.to_string(),
            message: err.to_string(),
        }
    }

    /// Errors that abort the whole run instead of being recorded per plugin.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ZpsError::Sync { .. } | ZpsError::PluginFilesystem { .. }
        )
    }

    /// Slug of the plugin an error belongs to, if it is a per-plugin error.
    pub fn slug(&self) -> Option<&str> {
        match self {
            ZpsError::Sync { slug, .. }
            | ZpsError::PluginFilesystem { slug, .. }
            | ZpsError::Resolution { slug, .. } => Some(slug),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ZpsError {
    fn from(err: std::io::Error) -> Self {
        ZpsError::Io(Arc::new(err))
    }
}

impl From<git2::Error> for ZpsError {
    fn from(err: git2::Error) -> Self {
        ZpsError::Git(Arc::new(err))
    }
}

impl From<toml::de::Error> for ZpsError {
    fn from(err: toml::de::Error) -> Self {
        ZpsError::Toml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ZpsError>;
