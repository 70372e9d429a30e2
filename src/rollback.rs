//! Undo log for multi-step filesystem operations.
//!
//! Records created directories and moves. `undo` restores moves first (newest
//! first), then removes directories (newest first). It keeps going past
//! individual failures and reports only the first one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Rollback {
    created_dirs: Vec<PathBuf>,
    moves: Vec<(PathBuf, PathBuf)>,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `dir` (and parents) and record it
    pub fn create_dir(&mut self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::path("create directory", dir, e))?;
        self.created_dirs.push(dir.to_path_buf());
        Ok(())
    }

    /// Rename `from` to `to` and record it
    pub fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| Error::path("move", from, e))?;
        self.moves.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.created_dirs.is_empty() && self.moves.is_empty()
    }

    /// Forget everything; the operation succeeded
    pub fn commit(mut self) {
        self.created_dirs.clear();
        self.moves.clear();
    }

    pub fn undo(mut self) -> Result<()> {
        let mut first_err = None;

        while let Some((from, to)) = self.moves.pop() {
            if let Err(e) = fs::rename(&to, &from) {
                tracing::warn!(from = %to.display(), to = %from.display(), "failed to restore move: {}", e);
                first_err.get_or_insert(Error::path("restore", &to, e));
            }
        }

        while let Some(dir) = self.created_dirs.pop() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                if e.kind() == std::io::ErrorKind::NotFound {
                    continue;
                }
                tracing::warn!(dir = %dir.display(), "failed to remove directory: {}", e);
                first_err.get_or_insert(Error::path("remove directory", &dir, e));
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_undo_restores_moves_before_removing_dirs() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        let original = temp.path().join("original");
        fs::create_dir(&original).unwrap();
        fs::write(original.join("data"), "x").unwrap();

        let mut rollback = Rollback::new();
        rollback.create_dir(&staging).unwrap();
        // Move into a directory that rollback will later delete
        rollback.rename(&original, &staging.join("moved")).unwrap();
        assert!(!original.exists());

        rollback.undo().unwrap();

        assert!(original.join("data").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn test_undo_continues_past_failures() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let dir = temp.path().join("dir");

        fs::create_dir(&a).unwrap();
        let mut rollback = Rollback::new();
        rollback.create_dir(&dir).unwrap();
        rollback.rename(&a, &b).unwrap();

        // Sabotage the move so it cannot be restored
        fs::remove_dir(&b).unwrap();

        let err = rollback.undo().unwrap_err();
        assert!(matches!(err, Error::Path { op: "restore", .. }));
        // Directory removal still happened
        assert!(!dir.exists());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");

        let mut rollback = Rollback::new();
        rollback.create_dir(&dir).unwrap();
        assert!(!rollback.is_empty());
        rollback.commit();

        assert!(dir.exists());
    }
}
