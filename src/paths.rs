use directories::BaseDirs;
use std::path::{Path, PathBuf};

use crate::error::{Error, PathContext, Result};
use crate::hub::HubItemType;
use crate::manifest::DataItemType;

/// Manifest file name inside each profile directory
pub const MANIFEST_FILE: &str = "profile.json";

/// Generated settings file name inside each profile directory
pub const SETTINGS_FILE: &str = "settings.json";

/// All computed paths used by cchub
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~
    pub home_dir: PathBuf,
    /// ~/.cchub
    pub base_dir: PathBuf,
    /// ~/.cchub/hub
    pub hub_dir: PathBuf,
    /// ~/.cchub/profiles
    pub profiles_dir: PathBuf,
    /// ~/.cchub/shared
    pub shared_dir: PathBuf,
    /// ~/.claude (symlink to the active profile)
    pub active_link: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().ok_or(Error::HomeNotFound)?;
        Ok(Self::from_home(base_dirs.home_dir()))
    }

    /// Build the full layout under an explicit home directory.
    ///
    /// A relative home is resolved against the current directory, since
    /// link targets are stored as absolute paths.
    pub fn from_home(home: impl AsRef<Path>) -> Self {
        let home_dir = crate::symlink::absolute(home.as_ref());
        let base_dir = home_dir.join(".cchub");

        Self {
            hub_dir: base_dir.join("hub"),
            profiles_dir: base_dir.join("profiles"),
            shared_dir: base_dir.join("shared"),
            active_link: home_dir.join(".claude"),
            base_dir,
            home_dir,
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    /// Get the path to a specific profile's manifest file
    pub fn profile_manifest(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(MANIFEST_FILE)
    }

    /// Get the path to a specific profile's generated settings.json
    pub fn profile_settings(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(SETTINGS_FILE)
    }

    /// hub/<type>
    pub fn hub_type_dir(&self, item_type: HubItemType) -> PathBuf {
        self.hub_dir.join(item_type.dir_name())
    }

    /// hub/<type>/<name>
    pub fn hub_item(&self, item_type: HubItemType, name: &str) -> PathBuf {
        self.hub_type_dir(item_type).join(name)
    }

    /// profiles/<profile>/<type>/<name>
    pub fn profile_item(&self, profile: &str, item_type: HubItemType, name: &str) -> PathBuf {
        self.profile_dir(profile).join(item_type.dir_name()).join(name)
    }

    /// shared/<data-type>
    pub fn shared_data(&self, data_type: DataItemType) -> PathBuf {
        self.shared_dir.join(data_type.dir_name())
    }

    /// Name of the profile whose directory is exactly `path`
    pub fn profile_name_of(&self, path: &Path) -> Option<String> {
        if path.parent() != Some(self.profiles_dir.as_path()) {
            return None;
        }
        path.file_name().map(|n| n.to_string_lossy().to_string())
    }

    /// Express a path as `$HOME/...` when it lives under the home directory
    pub fn portable(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home_dir) {
            Ok(rel) if rel.as_os_str().is_empty() => "$HOME".to_string(),
            Ok(rel) => format!("$HOME/{}", rel.to_string_lossy().replace('\\', "/")),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.hub_dir, &self.profiles_dir, &self.shared_dir] {
            std::fs::create_dir_all(dir).path_context("create directory", dir)?;
        }
        Ok(())
    }
}
