use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::hub::HubItemType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Profile not found: {name}")]
    ProfileNotFound { name: String },

    #[error("Hub item not found: {item_type}/{name}")]
    HubItemNotFound { item_type: HubItemType, name: String },

    #[error("Setting fragment not found: {name}")]
    FragmentNotFound { name: String },

    #[error("Source does not exist: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Profile already exists: {name}")]
    ProfileAlreadyExists { name: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Invalid profile name: '{name}' - must contain only alphanumeric, hyphen, underscore")]
    InvalidProfileName { name: String },

    #[error("Invalid item name: '{name}'")]
    InvalidItemName { name: String },

    #[error("Not a symlink: {path}")]
    NotASymlink { path: PathBuf },

    #[error("Broken symlink: {path}")]
    BrokenSymlink { path: PathBuf },

    #[error("Failed to {op} {path}: {source}")]
    Path {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Profile '{profile}' has {count} unresolved drift issue(s)")]
    Drift { profile: String, count: usize },

    #[error("Home directory not found")]
    HomeNotFound,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn path(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Path {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for any of the "does not exist" variants
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ProfileNotFound { .. }
            | Self::HubItemNotFound { .. }
            | Self::FragmentNotFound { .. }
            | Self::SourceNotFound { .. } => true,
            Self::Path { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProfileNotFound { .. } | Self::HubItemNotFound { .. } => 2,
            Self::ProfileAlreadyExists { .. } | Self::DestinationExists { .. } => 3,
            Self::Drift { .. } => 4,
            Self::InvalidProfileName { .. } | Self::InvalidItemName { .. } => 5,
            _ => 1,
        }
    }
}

/// Attach operation and path context to raw io results.
pub trait PathContext<T> {
    fn path_context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> PathContext<T> for std::io::Result<T> {
    fn path_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::path(op, path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_context_wraps_io_error() {
        let missing = Path::new("/definitely/not/here");
        let err = std::fs::read(missing)
            .path_context("read", missing)
            .unwrap_err();

        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("Failed to read"));
        assert!(msg.contains("/definitely/not/here"));
    }

    #[test]
    fn test_exit_codes() {
        let err = Error::ProfileNotFound {
            name: "x".to_string(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = Error::Drift {
            profile: "x".to_string(),
            count: 3,
        };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "Profile 'x' has 3 unresolved drift issue(s)");
    }
}
