// zps-aio/src/lib.rs
//! Synchronous IO for zps: directory skeleton, atomic symlinks and git working trees.

pub mod fs;
pub mod git2;

pub use fs::*;
pub use self::git2::{ensure_repo, inspect_repo, upstream_status, RepoHead, UpstreamStatus};
