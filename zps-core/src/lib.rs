// zps-core/src/lib.rs
//! Plugin resolution, parallel sync, completion-directory discovery and load ordering.

pub mod order;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod scan;

pub use order::{plan, plugin_fpath_dirs, LoadPlan, TAIL_SLUGS};
pub use pipeline::engine::{sync_all, sync_from_config, SyncOutcome};
pub use resolve::{plan_targets, slug_for, PluginResolver, RepoResolver};
pub use scan::{scan, DirListing, FsListing};
