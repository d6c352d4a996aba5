// zps-core/src/scan.rs
//! Finds directories in a plugin tree that hold completion functions.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use zps_aio::fs::list_directory_entries;
use zps_common::error::Result;

/// Directory names never treated as completion directories.
pub const BLOCKED_DIRS: &[&str] = &[
    "docs",
    "doc",
    "examples",
    "example",
    "samples",
    "sample",
    "tests",
    "test",
    "spec",
    "scripts",
    "script",
    "tools",
    "bin",
    "assets",
    "images",
    "img",
    "node_modules",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// Directory listing capability the scanner runs against.
pub trait DirListing {
    fn entries(&self, dir: &Path) -> Result<Vec<DirEntryInfo>>;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
    fn exists(&self, path: &Path) -> bool;
}

/// [`DirListing`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl DirListing for FsListing {
    fn entries(&self, dir: &Path) -> Result<Vec<DirEntryInfo>> {
        Ok(list_directory_entries(dir)?
            .into_iter()
            .map(|(name, _, is_dir)| DirEntryInfo { name, is_dir })
            .collect())
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(fs::canonicalize(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

pub fn blocked(name: &str) -> bool {
    name.starts_with('.') || BLOCKED_DIRS.contains(&name)
}

/// True iff `dir` directly contains an entry whose name starts with `_`.
pub fn is_completion_dir(listing: &dyn DirListing, dir: &Path) -> bool {
    match listing.entries(dir) {
        Ok(entries) => entries.iter().any(|e| e.name.starts_with('_')),
        Err(e) => {
            debug!("Cannot list {}: {}", dir.display(), e);
            false
        }
    }
}

/// Completion directories of the tree at `target_root`.
///
/// With `explicit_dirs`, each listed path that exists under the canonical
/// root is returned in the given order. Without, the root and its direct,
/// unblocked child directories (sorted by name) are returned when they hold
/// `_`-prefixed entries.
pub fn scan(
    listing: &dyn DirListing,
    target_root: &Path,
    explicit_dirs: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let root = listing.canonicalize(target_root)?;

    if let Some(dirs) = explicit_dirs {
        return Ok(dirs
            .iter()
            .map(|rel| root.join(rel))
            .filter(|path| {
                let found = listing.exists(path);
                if !found {
                    debug!("Declared fpath dir {} does not exist", path.display());
                }
                found
            })
            .collect());
    }

    let mut found = Vec::new();
    if is_completion_dir(listing, &root) {
        found.push(root.clone());
    }

    let mut children: Vec<String> = listing
        .entries(&root)?
        .into_iter()
        .filter(|e| e.is_dir && !blocked(&e.name))
        .map(|e| e.name)
        .collect();
    children.sort();

    for child in children {
        let path = root.join(&child);
        if is_completion_dir(listing, &path) {
            found.push(path);
        }
    }
    Ok(found)
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::BTreeMap;

    use zps_common::error::ZpsError;

    use super::*;

    /// In-memory directory tree: paths map to their direct entries.
    #[derive(Debug, Default)]
    pub struct MemListing {
        dirs: BTreeMap<PathBuf, Vec<DirEntryInfo>>,
        links: BTreeMap<PathBuf, PathBuf>,
    }

    impl MemListing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
            let path = PathBuf::from(path);
            let listed = entries
                .iter()
                .map(|e| match e.strip_suffix('/') {
                    Some(name) => DirEntryInfo {
                        name: name.to_string(),
                        is_dir: true,
                    },
                    None => DirEntryInfo {
                        name: e.to_string(),
                        is_dir: false,
                    },
                })
                .collect();
            self.dirs.insert(path, listed);
            self
        }

        pub fn link(mut self, from: &str, to: &str) -> Self {
            self.links.insert(PathBuf::from(from), PathBuf::from(to));
            self
        }
    }

    impl DirListing for MemListing {
        fn entries(&self, dir: &Path) -> Result<Vec<DirEntryInfo>> {
            self.dirs
                .get(dir)
                .cloned()
                .ok_or_else(|| ZpsError::Generic(format!("no such dir {}", dir.display())))
        }

        fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
            Ok(self
                .links
                .get(path)
                .cloned()
                .unwrap_or_else(|| path.to_path_buf()))
        }

        fn exists(&self, path: &Path) -> bool {
            self.dirs.contains_key(path)
                || path.parent().and_then(|p| self.dirs.get(p)).is_some_and(|entries| {
                    path.file_name()
                        .is_some_and(|n| entries.iter().any(|e| n == e.name.as_str()))
                })
        }
    }
}
