//! Profile lifecycle.
//!
//! A profile lives in `~/.cchub/profiles/<name>/`:
//! - one directory per hub item type, holding symlinks into the hub
//! - one slot per data type, either a symlink into `~/.cchub/shared/` or a
//!   private directory
//! - `profile.json` (the manifest) and the generated `settings.json`
//!
//! The active profile is whichever profile `~/.claude` currently links to.

use std::fs;
use std::path::PathBuf;

use crate::error::{Error, PathContext, Result};
use crate::fs_utils::mirror_permissions;
use crate::hub::{HubCatalog, HubItemType};
use crate::manifest::{Manifest, ShareMode};
use crate::paths::{MANIFEST_FILE, Paths, SETTINGS_FILE};
use crate::rollback::Rollback;
use crate::settings::SettingsGenerator;
use crate::symlink;

/// A loaded profile
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub path: PathBuf,
    pub manifest: Manifest,
}

impl Profile {
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path.join(SETTINGS_FILE)
    }

    pub fn type_dir(&self, item_type: HubItemType) -> PathBuf {
        self.path.join(item_type.dir_name())
    }

    /// Where a linked item lives inside this profile
    pub fn item_path(&self, item_type: HubItemType, name: &str) -> PathBuf {
        self.type_dir(item_type).join(name)
    }

    pub fn save_manifest(&mut self) -> Result<()> {
        let path = self.manifest_path();
        self.manifest.save(&path)
    }
}

pub struct ProfileManager<'a> {
    paths: &'a Paths,
    hub: &'a HubCatalog,
}

impl<'a> ProfileManager<'a> {
    pub fn new(paths: &'a Paths, hub: &'a HubCatalog) -> Self {
        Self { paths, hub }
    }

    /// List available profiles, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = &self.paths.profiles_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut profiles = Vec::new();
        for entry in fs::read_dir(dir).path_context("read directory", dir)? {
            let entry = entry.path_context("read directory entry", dir)?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_dir() && !name.starts_with('.') {
                profiles.push(name);
            }
        }
        profiles.sort();
        Ok(profiles)
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_profile_name(name).is_ok() && self.paths.profile_dir(name).is_dir()
    }

    /// Load a profile and its manifest
    pub fn get(&self, name: &str) -> Result<Profile> {
        validate_profile_name(name)?;
        let path = self.paths.profile_dir(name);
        if !path.is_dir() {
            return Err(Error::ProfileNotFound {
                name: name.to_string(),
            });
        }

        let manifest = Manifest::load(&path.join(MANIFEST_FILE))?;
        Ok(Profile {
            name: name.to_string(),
            path,
            manifest,
        })
    }

    /// Create a profile directory tree from a manifest.
    ///
    /// Directory and symlink failures abort creation and the partial tree is
    /// removed. A settings generation failure only logs a warning.
    pub fn create(&self, name: &str, mut manifest: Manifest) -> Result<Profile> {
        validate_profile_name(name)?;

        let path = self.paths.profile_dir(name);
        if fs::symlink_metadata(&path).is_ok() {
            return Err(Error::ProfileAlreadyExists {
                name: name.to_string(),
            });
        }

        let mut rollback = Rollback::new();
        rollback.create_dir(&path)?;

        manifest.name = name.to_string();
        let mut profile = Profile {
            name: name.to_string(),
            path,
            manifest,
        };

        if let Err(e) = self.build_tree(&mut profile) {
            if let Err(undo_err) = rollback.undo() {
                tracing::warn!(profile = %name, "failed to clean up partial profile: {}", undo_err);
            }
            return Err(e);
        }
        rollback.commit();

        tracing::info!(profile = %name, "created profile");

        if profile.manifest.has_settings_inputs() {
            if let Err(e) = SettingsGenerator::new(self.paths, self.hub).regenerate(&profile) {
                tracing::warn!(profile = %name, "failed to generate settings: {}", e);
            }
        }

        Ok(profile)
    }

    fn build_tree(&self, profile: &mut Profile) -> Result<()> {
        for item_type in HubItemType::ALL {
            let dir = profile.type_dir(item_type);
            symlink::ensure_dir(&dir)?;
            mirror_permissions(&self.paths.hub_type_dir(item_type), &dir)?;
        }

        for (data_type, mode) in profile.manifest.data.resolved() {
            let slot = profile.path.join(data_type.dir_name());
            match mode {
                ShareMode::Shared => {
                    let shared = self.paths.shared_data(data_type);
                    symlink::ensure_dir(&shared)?;
                    symlink::create(&slot, &shared)?;
                }
                ShareMode::Isolated => symlink::ensure_dir(&slot)?,
            }
        }

        for (item_type, item_name) in profile.manifest.all_linked_items() {
            validate_item_name(&item_name)?;
            let target = self.hub.item_path(item_type, &item_name);
            symlink::create(&profile.item_path(item_type, &item_name), &target)?;
        }

        profile.save_manifest()
    }

    /// Remove a profile directory. Shared data slots are symlinks, so the
    /// shared roots are left untouched.
    pub fn delete(&self, name: &str) -> Result<()> {
        validate_profile_name(name)?;
        let path = self.paths.profile_dir(name);
        if !path.is_dir() {
            return Err(Error::ProfileNotFound {
                name: name.to_string(),
            });
        }

        fs::remove_dir_all(&path).path_context("remove profile directory", &path)?;
        tracing::info!(profile = %name, "deleted profile");
        Ok(())
    }

    /// Rename a profile, re-pointing the active link if it targeted the old name
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<Profile> {
        validate_profile_name(new_name)?;
        let mut profile = self.get(old_name)?;

        let new_path = self.paths.profile_dir(new_name);
        if fs::symlink_metadata(&new_path).is_ok() {
            return Err(Error::ProfileAlreadyExists {
                name: new_name.to_string(),
            });
        }

        let was_active = self.active_name()?.as_deref() == Some(old_name);

        let mut rollback = Rollback::new();
        rollback.rename(&profile.path, &new_path)?;

        profile.name = new_name.to_string();
        profile.path = new_path;
        profile.manifest.name = new_name.to_string();
        if let Err(e) = profile.save_manifest() {
            if let Err(undo_err) = rollback.undo() {
                tracing::warn!(profile = %old_name, "failed to restore renamed profile: {}", undo_err);
            }
            return Err(e);
        }
        rollback.commit();

        if was_active {
            symlink::swap(&self.paths.active_link, &profile.path)?;
        }

        // Hook commands embed the profile path
        if profile.manifest.has_settings_inputs() {
            if let Err(e) = SettingsGenerator::new(self.paths, self.hub).regenerate(&profile) {
                tracing::warn!(profile = %new_name, "failed to regenerate settings: {}", e);
            }
        }

        tracing::info!(from = %old_name, to = %new_name, "renamed profile");
        Ok(profile)
    }

    /// Link a hub item into a profile and record it in the manifest
    pub fn link_hub_item(&self, profile: &mut Profile, item_type: HubItemType, name: &str) -> Result<()> {
        validate_item_name(name)?;
        let item = self
            .hub
            .get(item_type, name)
            .ok_or_else(|| Error::HubItemNotFound {
                item_type,
                name: name.to_string(),
            })?;

        let link = profile.item_path(item_type, name);
        if !symlink::validate(&link, &item.path) {
            if fs::symlink_metadata(&link).is_ok() {
                return Err(Error::DestinationExists { path: link });
            }
            symlink::ensure_dir(&profile.type_dir(item_type))?;
            symlink::create(&link, &item.path)?;
        }

        profile.manifest.add_hub_item(item_type, name);
        profile.save_manifest()?;
        tracing::debug!(profile = %profile.name, %item_type, item = %name, "linked hub item");

        self.refresh_settings(profile, item_type);
        Ok(())
    }

    /// Unlink a hub item. Missing links and missing hub items are tolerated.
    ///
    /// Returns whether the manifest listed the item.
    pub fn unlink_hub_item(&self, profile: &mut Profile, item_type: HubItemType, name: &str) -> Result<bool> {
        validate_item_name(name)?;
        symlink::remove(&profile.item_path(item_type, name))?;

        let removed = profile.manifest.remove_hub_item(item_type, name);
        if removed {
            profile.save_manifest()?;
            tracing::debug!(profile = %profile.name, %item_type, item = %name, "unlinked hub item");
            self.refresh_settings(profile, item_type);
        }
        Ok(removed)
    }

    fn refresh_settings(&self, profile: &Profile, item_type: HubItemType) {
        if !matches!(item_type, HubItemType::Hooks | HubItemType::SettingFragments) {
            return;
        }
        if let Err(e) = SettingsGenerator::new(self.paths, self.hub).regenerate(profile) {
            tracing::warn!(profile = %profile.name, "failed to regenerate settings: {}", e);
        }
    }

    /// Name of the profile `~/.claude` links to, if it links into the profiles dir
    pub fn active_name(&self) -> Result<Option<String>> {
        let link = &self.paths.active_link;
        if !symlink::is_symlink(link) {
            return Ok(None);
        }

        let target = symlink::resolve_target(link, &symlink::read_link(link)?);
        let name = self.paths.profile_name_of(&target);
        if name.is_none() {
            tracing::debug!(target = %target.display(), "active link is not a profile directory");
        }
        Ok(name)
    }

    /// The active profile. A dangling `~/.claude` link is an error.
    pub fn active(&self) -> Result<Option<Profile>> {
        let link = &self.paths.active_link;
        if symlink::info(link).broken {
            return Err(Error::BrokenSymlink { path: link.clone() });
        }

        match self.active_name()? {
            Some(name) => self.get(&name).map(Some),
            None => Ok(None),
        }
    }

    /// Make `name` the active profile by swapping the `~/.claude` link
    pub fn set_active(&self, name: &str) -> Result<()> {
        validate_profile_name(name)?;
        let path = self.paths.profile_dir(name);
        if !path.is_dir() {
            return Err(Error::ProfileNotFound {
                name: name.to_string(),
            });
        }

        if let Some(parent) = self.paths.active_link.parent() {
            symlink::ensure_dir(parent)?;
        }
        symlink::swap(&self.paths.active_link, &path)?;
        tracing::info!(profile = %name, "activated profile");
        Ok(())
    }
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().count() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProfileName {
            name: name.to_string(),
        })
    }
}

/// Hub item names are single path components
pub fn validate_item_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidItemName {
            name: name.to_string(),
        })
    }
}
