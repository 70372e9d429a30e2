//! Symlink primitives.
//!
//! Everything here is stateless. Link targets are compared after resolving
//! relative targets against the link's parent directory and normalizing the
//! result lexically, so `../hub/skills/x` and `/abs/hub/skills/x` compare equal
//! when they name the same location.
//!
//! `swap` is atomic on unix (a temporary sibling link is renamed over the old
//! one). Other platforms cannot rename over a symlink, so the link is removed
//! and recreated and the path briefly does not exist.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, PathContext, Result};

/// What a path looks like on disk, without following it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub exists: bool,
    pub is_symlink: bool,
    /// Absolute, normalized link target (symlinks only)
    pub target: Option<PathBuf>,
    /// The link exists but its target cannot be stat'ed
    pub broken: bool,
}

/// Create a symlink at `link` pointing at `target`. The parent must exist.
pub fn create(link: &Path, target: &Path) -> Result<()> {
    make_link(target, link).path_context("create symlink", link)
}

/// Remove a symlink. Absent paths are fine; anything that is not a symlink is refused.
pub fn remove(link: &Path) -> Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            remove_link(link).path_context("remove symlink", link)
        }
        Ok(_) => Err(Error::NotASymlink {
            path: link.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::path("inspect", link, e)),
    }
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Raw link target, exactly as stored
pub fn read_link(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).path_context("read symlink", path)
}

pub fn info(path: &Path) -> LinkInfo {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return LinkInfo::default(),
    };

    if !meta.file_type().is_symlink() {
        return LinkInfo {
            exists: true,
            ..LinkInfo::default()
        };
    }

    let target = fs::read_link(path).ok().map(|t| resolve_target(path, &t));
    LinkInfo {
        exists: true,
        is_symlink: true,
        broken: fs::metadata(path).is_err(),
        target,
    }
}

/// True iff `path` is a symlink whose resolved target is `expected`
pub fn validate(path: &Path, expected: &Path) -> bool {
    let info = info(path);
    match info.target {
        Some(target) if info.is_symlink => target == absolute(expected),
        _ => false,
    }
}

/// Point an existing (or absent) symlink at a new target.
#[cfg(unix)]
pub fn swap(path: &Path, new_target: &Path) -> Result<()> {
    refuse_non_symlink(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.swap-{}", file_name, std::process::id()));

    // Leftover from an interrupted swap
    if is_symlink(&tmp) {
        remove_link(&tmp).path_context("remove stale symlink", &tmp)?;
    }

    make_link(new_target, &tmp).path_context("create symlink", &tmp)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = remove_link(&tmp);
        return Err(Error::path("replace symlink", path, e));
    }
    Ok(())
}

/// Point an existing (or absent) symlink at a new target.
///
/// Not atomic: between the remove and the create, `path` does not exist.
#[cfg(not(unix))]
pub fn swap(path: &Path, new_target: &Path) -> Result<()> {
    refuse_non_symlink(path)?;
    remove(path)?;
    create(path, new_target)
}

/// Idempotent directory creation
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).path_context("create directory", path)
}

/// Resolve a raw link target against the link's parent directory
pub fn resolve_target(link: &Path, raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        return normalize(raw);
    }
    let base = link.parent().map(absolute).unwrap_or_default();
    normalize(&base.join(raw))
}

/// Absolute form of `path` without touching the filesystem
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize(&cwd.join(path))
    }
}

/// Lexically drop `.` and fold `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn refuse_non_symlink(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.file_type().is_symlink() => Err(Error::NotASymlink {
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(unix)]
fn remove_link(link: &Path) -> std::io::Result<()> {
    fs::remove_file(link)
}

#[cfg(windows)]
fn remove_link(link: &Path) -> std::io::Result<()> {
    // Directory symlinks on Windows must be removed as directories
    fs::remove_file(link).or_else(|_| fs::remove_dir(link))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_info() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = temp.path().join("link");

        create(&link, &target).unwrap();

        let info = info(&link);
        assert!(info.exists);
        assert!(info.is_symlink);
        assert!(!info.broken);
        assert_eq!(info.target, Some(target.clone()));
        assert!(validate(&link, &target));
    }

    #[test]
    fn test_info_missing_and_regular() {
        let temp = TempDir::new().unwrap();
        assert_eq!(info(&temp.path().join("nope")), LinkInfo::default());

        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        let info = info(&file);
        assert!(info.exists);
        assert!(!info.is_symlink);
        assert!(info.target.is_none());
    }

    #[test]
    fn test_broken_link() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        create(&link, &temp.path().join("gone")).unwrap();

        let info = info(&link);
        assert!(info.is_symlink);
        assert!(info.broken);
        assert_eq!(info.target, Some(temp.path().join("gone")));
    }

    #[test]
    fn test_relative_target_resolved_against_parent() {
        let temp = TempDir::new().unwrap();
        let hub = temp.path().join("hub");
        fs::create_dir_all(hub.join("x")).unwrap();
        let links = temp.path().join("profile");
        fs::create_dir(&links).unwrap();
        let link = links.join("x");

        create(&link, Path::new("../hub/x")).unwrap();

        assert!(validate(&link, &hub.join("x")));
        assert!(validate(&link, &temp.path().join("profile/../hub/./x")));
    }

    #[test]
    fn test_remove_refuses_regular_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();

        let err = remove(&file).unwrap_err();
        assert!(matches!(err, Error::NotASymlink { .. }));
        assert!(file.exists());

        // Absent paths are fine
        remove(&temp.path().join("absent")).unwrap();
    }

    #[test]
    fn test_swap_replaces_target() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let link = temp.path().join("current");

        swap(&link, &a).unwrap();
        assert!(validate(&link, &a));

        swap(&link, &b).unwrap();
        assert!(validate(&link, &b));
        assert_eq!(read_link(&link).unwrap(), b);

        // No temp links left behind
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_swap_refuses_real_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("real");
        fs::create_dir(&dir).unwrap();

        let err = swap(&dir, temp.path()).unwrap_err();
        assert!(matches!(err, Error::NotASymlink { .. }));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }
}
