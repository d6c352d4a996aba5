// zps-common/src/lib.rs
pub mod config;
pub mod error;
pub mod manifest;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use error::{Result, ZpsError};
pub use manifest::{PluginKind, PluginSource, PluginSpec};
pub use model::{PluginTarget, ResolvedPlugin, RevState, SyncResult, SyncStatus};
