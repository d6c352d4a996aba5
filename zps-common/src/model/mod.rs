// zps-common/src/model/mod.rs
pub mod plugin;

// Re-export
pub use plugin::{PluginTarget, ResolvedPlugin, RevState, SyncResult, SyncStatus};
