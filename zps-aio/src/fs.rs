/*
File: zps-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::fs;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use zps_common::error::{Result, ZpsError};

/// Checks if a path exists without following symlinks.
pub fn check_symlink_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        ZpsError::Filesystem {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}

/// Creates every directory in `dirs`; any failure is a fatal filesystem error.
pub fn ensure_skeleton(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        create_dir_all(dir)?;
    }
    Ok(())
}

/// Removes whatever sits at `path` (file, symlink or directory tree).
/// A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ZpsError::from(e)),
    };
    debug!("Removing {}", path.display());
    let res = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    res.map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove {}: {}", path.display(), e);
        }
        ZpsError::from(e)
    })
}

/// Points `link` at `target` without a window in which `link` is missing.
///
/// A fresh symlink is created next to `link` and renamed over it. A real
/// directory sitting at `link` cannot be replaced by rename and is removed
/// first.
#[cfg(unix)]
pub fn publish_symlink(target: &Path, link: &Path) -> Result<()> {
    let file_name = link
        .file_name()
        .ok_or_else(|| ZpsError::Generic(format!("invalid link path: {}", link.display())))?;
    let parent = link.parent().unwrap_or_else(|| Path::new("."));
    let staging = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    if fs::read_link(link).is_ok_and(|current| current.as_path() == target) {
        debug!("Symlink {} already points at {}", link.display(), target.display());
        return Ok(());
    }

    remove_path(&staging)?;
    debug!("Creating symlink {} -> {}", staging.display(), target.display());
    symlink(target, &staging).map_err(|e| {
        error!(
            "Failed create symlink {} -> {}: {}",
            staging.display(),
            target.display(),
            e
        );
        ZpsError::from(e)
    })?;

    if let Ok(meta) = fs::symlink_metadata(link) {
        if meta.is_dir() {
            warn!(
                "Replacing directory {} with a symlink (not atomic)",
                link.display()
            );
            fs::remove_dir_all(link)?;
        }
    }

    fs::rename(&staging, link).map_err(|e| {
        error!("Failed rename {} -> {}: {}", staging.display(), link.display(), e);
        let _ = fs::remove_file(&staging);
        ZpsError::from(e)
    })
}

#[cfg(not(unix))]
pub fn publish_symlink(target: &Path, link: &Path) -> Result<()> {
    warn!(
        "Symlink creation not supported on this platform: {} -> {}",
        link.display(),
        target.display()
    );
    Err(ZpsError::Generic(
        "Symlinks not supported on this platform".to_string(),
    ))
}

/// Lists directory entries as `(name, path, is_dir)`.
/// Skips entries that cause errors during reading.
pub fn list_directory_entries(dir_path: &Path) -> Result<Vec<(String, PathBuf, bool)>> {
    debug!("Listing directory entries for: {}", dir_path.display());
    let mut entries = Vec::new();

    let read_dir = fs::read_dir(dir_path).map_err(|e| {
        debug!("Failed to read directory {}: {}", dir_path.display(), e);
        ZpsError::from(e)
    })?;
    for entry_res in read_dir {
        match entry_res {
            Ok(entry) => {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                match entry.file_type() {
                    Ok(file_type) => entries.push((name, path, file_type.is_dir())),
                    Err(e) => warn!(
                        "Failed to get file type for {} in {}: {}",
                        path.display(),
                        dir_path.display(),
                        e
                    ),
                }
            }
            Err(e) => warn!("Error reading entry in {}: {}", dir_path.display(), e),
        }
    }
    Ok(entries)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn publish_creates_then_replaces_link() {
        let td = tempfile::tempdir().unwrap();
        let a = td.path().join("a.zsh");
        let b = td.path().join("b.zsh");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let link = td.path().join("plugins").join("slug");
        fs::create_dir_all(link.parent().unwrap()).unwrap();

        publish_symlink(&a, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), a);

        publish_symlink(&b, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), b);
        assert_eq!(fs::read_to_string(&link).unwrap(), "b");
        assert!(!check_symlink_exists(&td.path().join("plugins").join(".slug.tmp")));
    }

    #[test]
    fn publish_replaces_plain_directory() {
        let td = tempfile::tempdir().unwrap();
        let target = td.path().join("repo");
        fs::create_dir_all(&target).unwrap();
        let link = td.path().join("slug");
        fs::create_dir_all(link.join("junk")).unwrap();

        publish_symlink(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);
    }

    #[test]
    fn publish_clears_stale_staging_link() {
        let td = tempfile::tempdir().unwrap();
        let target = td.path().join("t");
        fs::write(&target, "").unwrap();
        symlink(td.path().join("gone"), td.path().join(".slug.tmp")).unwrap();

        publish_symlink(&target, &td.path().join("slug")).unwrap();
        assert_eq!(fs::read_link(td.path().join("slug")).unwrap(), target);
    }

    #[test]
    fn remove_path_handles_all_kinds() {
        let td = tempfile::tempdir().unwrap();
        let dir = td.path().join("d");
        fs::create_dir_all(dir.join("nested")).unwrap();
        let file = td.path().join("f");
        fs::write(&file, "").unwrap();

        remove_path(&dir).unwrap();
        remove_path(&file).unwrap();
        remove_path(&td.path().join("missing")).unwrap();
        assert!(!dir.exists());
        assert!(!file.exists());
    }

    #[test]
    fn skeleton_failure_is_filesystem_error() {
        let td = tempfile::tempdir().unwrap();
        let blocker = td.path().join("file");
        fs::write(&blocker, "").unwrap();
        let err = ensure_skeleton(&[blocker.join("bin")]).unwrap_err();
        assert!(matches!(err, ZpsError::Filesystem { .. }));
        assert!(err.is_fatal());
    }
}
