//! Filesystem utility functions
//!
//! This module provides common filesystem operations used across the codebase.

use std::fs;
use std::path::Path;

use crate::error::{PathContext, Result};

/// Recursively calculate the total size of a directory in bytes
///
/// Symbolic links are not followed, so linked hub items count as zero.
pub fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = fs::symlink_metadata(entry.path())?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

/// Write a file atomically: write to a temp sibling, then rename.
///
/// The destination is never observed half-written even if the process crashes.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).path_context("create directory", parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&temp_path, content).path_context("write", &temp_path)?;
    fs::rename(&temp_path, path).path_context("rename", path)
}

/// Remove whatever is at `path`: a symlink or file is unlinked, a directory
/// is removed recursively. Symlinks are never followed.
pub fn remove_tree(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(crate::error::Error::path("inspect", path, e)),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path).path_context("remove directory", path)
    } else {
        fs::remove_file(path).path_context("remove", path)
    }
}

/// Copy permission bits from `reference` onto `dir` when the reference exists
pub fn mirror_permissions(reference: &Path, dir: &Path) -> Result<()> {
    let Ok(meta) = fs::metadata(reference) else {
        return Ok(());
    };
    fs::set_permissions(dir, meta.permissions()).path_context("set permissions", dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/file.json");

        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
        assert!(!temp.path().join("nested/dir/file.json.tmp").exists());
    }

    #[test]
    fn test_dir_size() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a"), "1234").unwrap();
        fs::write(temp.path().join("sub/b"), "12").unwrap();

        assert_eq!(dir_size(temp.path()).unwrap(), 6);
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_tree_does_not_follow_links() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("keep"), "x").unwrap();

        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&outside, dir.join("link")).unwrap();

        remove_tree(&dir).unwrap();
        assert!(!dir.exists());
        assert!(outside.join("keep").exists());

        // Absent is fine
        remove_tree(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_mirror_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("ref");
        let dir = temp.path().join("dir");
        fs::create_dir(&reference).unwrap();
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&reference, fs::Permissions::from_mode(0o700)).unwrap();

        mirror_permissions(&reference, &dir).unwrap();
        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);

        // Missing reference leaves the directory alone
        mirror_permissions(&temp.path().join("missing"), &dir).unwrap();
    }
}
