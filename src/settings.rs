//! settings.json generation.
//!
//! A profile's settings document is derived from two inputs: setting
//! fragments (one key each, applied in manifest order so later fragments win)
//! and hook items (merged under the reserved `"hooks"` key).

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, PathContext, Result};
use crate::fs_utils::write_atomic;
use crate::hooks::{self, HookMap};
use crate::hub::{HubCatalog, HubItemType};
use crate::paths::Paths;
use crate::profiles::Profile;

pub const HOOKS_KEY: &str = "hooks";

/// File looked up inside a fragment item that is a directory
const FRAGMENT_DIR_FILE: &str = "fragment.json";

/// `hub/setting-fragments/<name>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SettingFragment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub key: String,
    pub value: Value,
}

impl SettingFragment {
    pub fn read(path: &Path) -> Result<Self> {
        let file = if path.is_dir() {
            let file = path.join(FRAGMENT_DIR_FILE);
            if !file.is_file() {
                return Err(Error::FragmentNotFound {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                });
            }
            file
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&file).path_context("read fragment", &file)?;
        serde_json::from_str(&content).map_err(|source| Error::Json { path: file, source })
    }
}

pub struct SettingsGenerator<'a> {
    paths: &'a Paths,
    hub: &'a HubCatalog,
}

impl<'a> SettingsGenerator<'a> {
    pub fn new(paths: &'a Paths, hub: &'a HubCatalog) -> Self {
        Self { paths, hub }
    }

    /// Apply linked fragments in manifest order; a later key overrides an earlier one
    pub fn apply_fragments(&self, profile: &Profile, doc: &mut Map<String, Value>) -> Result<()> {
        for name in profile.manifest.hub_items(HubItemType::SettingFragments) {
            let Some(item) = self.hub.get(HubItemType::SettingFragments, name) else {
                tracing::debug!(fragment = %name, "fragment not in hub, skipping");
                continue;
            };

            let fragment = SettingFragment::read(&item.path)?;
            if doc.contains_key(&fragment.key) {
                tracing::debug!(fragment = %name, key = %fragment.key, "fragment overrides earlier value");
            }
            doc.insert(fragment.key, fragment.value);
        }
        Ok(())
    }

    /// Collect hook entries from every linked hook, in manifest order
    pub fn generate_hooks(&self, profile: &Profile) -> Result<HookMap> {
        let mut out = HookMap::new();

        for name in profile.manifest.hub_items(HubItemType::Hooks) {
            let Some(item) = self.hub.get(HubItemType::Hooks, name) else {
                tracing::debug!(hook = %name, "hook not in hub, skipping");
                continue;
            };
            if !item.is_dir {
                continue;
            }

            let Some(source) = hooks::read_hook_source(&item.path)? else {
                tracing::debug!(hook = %name, "hook has no declaration file, skipping");
                continue;
            };

            let installed = profile.path.join(HubItemType::Hooks.dir_name()).join(name);
            hooks::merge_into(&mut out, source.into_entries(self.paths, &installed));
        }

        Ok(out)
    }

    /// Build a settings document from scratch
    pub fn assemble(&self, profile: &Profile) -> Result<Map<String, Value>> {
        let mut doc = Map::new();
        self.apply_fragments(profile, &mut doc)?;

        let hooks = self.generate_hooks(profile)?;
        if !hooks.is_empty() {
            doc.insert(HOOKS_KEY.to_string(), hooks_value(&hooks)?);
        }
        Ok(doc)
    }

    /// Rewrite `<profile>/settings.json`.
    ///
    /// Non-hook keys come only from fragments; anything else that was in the
    /// previous file is dropped. A previous `"hooks"` value survives only when
    /// no fragment sets one and no linked hook produces entries. An unreadable
    /// previous file is replaced.
    pub fn regenerate(&self, profile: &Profile) -> Result<PathBuf> {
        let path = profile.settings_path();
        let previous_hooks = match read_settings(&path) {
            Ok(doc) => doc.and_then(|mut doc| doc.remove(HOOKS_KEY)),
            Err(e) => {
                tracing::warn!(profile = %profile.name, "replacing unreadable settings: {}", e);
                None
            }
        };

        let mut doc = Map::new();
        self.apply_fragments(profile, &mut doc)?;

        if !doc.contains_key(HOOKS_KEY) {
            if let Some(hooks) = previous_hooks {
                doc.insert(HOOKS_KEY.to_string(), hooks);
            }
        }

        let hooks = self.generate_hooks(profile)?;
        if !hooks.is_empty() {
            doc.insert(HOOKS_KEY.to_string(), hooks_value(&hooks)?);
        }

        let content = serde_json::to_string_pretty(&Value::Object(doc)).map_err(|source| {
            Error::Json {
                path: path.clone(),
                source,
            }
        })?;
        write_atomic(&path, content.as_bytes())?;

        tracing::info!(profile = %profile.name, path = %path.display(), "regenerated settings");
        Ok(path)
    }
}

fn hooks_value(hooks: &HookMap) -> Result<Value> {
    serde_json::to_value(hooks).map_err(|source| Error::Json {
        path: PathBuf::from(HOOKS_KEY),
        source,
    })
}

/// Read an existing settings document; `None` if the file is absent
pub fn read_settings(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).path_context("read settings", path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Ok(None),
        Err(source) => Err(Error::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::test_utils::{add_fragment, add_hub_dir, setup_test_paths};
    use tempfile::TempDir;

    fn profile_with(paths: &Paths, manifest: Manifest) -> Profile {
        let path = paths.profile_dir(&manifest.name);
        fs::create_dir_all(&path).unwrap();
        Profile {
            name: manifest.name.clone(),
            path,
            manifest,
        }
    }

    #[test]
    fn test_later_fragment_wins() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        add_fragment(&paths, "model-old", "model", serde_json::json!("old"));
        add_fragment(&paths, "model-new", "model", serde_json::json!("new"));
        add_fragment(&paths, "theme", "theme", serde_json::json!({"dark": true}));
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::SettingFragments, "model-old");
        manifest.add_hub_item(HubItemType::SettingFragments, "theme");
        manifest.add_hub_item(HubItemType::SettingFragments, "model-new");
        let profile = profile_with(&paths, manifest);

        let doc = SettingsGenerator::new(&paths, &hub).assemble(&profile).unwrap();
        assert_eq!(doc["model"], "new");
        assert_eq!(doc["theme"]["dark"], true);
    }

    #[test]
    fn test_no_hooks_means_no_hooks_key() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        add_fragment(&paths, "model", "model", serde_json::json!("x"));
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::SettingFragments, "model");
        let profile = profile_with(&paths, manifest);

        let generator = SettingsGenerator::new(&paths, &hub);
        assert!(generator.generate_hooks(&profile).unwrap().is_empty());
        assert!(!generator.assemble(&profile).unwrap().contains_key(HOOKS_KEY));
    }

    #[test]
    fn test_hooks_merged_in_manifest_order() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);

        let canonical = add_hub_dir(&paths, HubItemType::Hooks, "fmt");
        fs::write(
            canonical.join("hooks.json"),
            r#"{"hooks": {"PostToolUse": [{"matcher": "Edit", "hooks": [{"type": "command", "command": "${CLAUDE_PLUGIN_ROOT}/fmt.sh"}]}]}}"#,
        )
        .unwrap();
        let legacy = add_hub_dir(&paths, HubItemType::Hooks, "guard");
        fs::write(
            legacy.join("hook.json"),
            r#"{"name": "guard", "type": "PostToolUse", "command": "guard.sh", "interpreter": "bash"}"#,
        )
        .unwrap();
        // No declaration file: skipped silently
        add_hub_dir(&paths, HubItemType::Hooks, "empty");
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::Hooks, "guard");
        manifest.add_hub_item(HubItemType::Hooks, "fmt");
        manifest.add_hub_item(HubItemType::Hooks, "empty");
        manifest.add_hub_item(HubItemType::Hooks, "not-in-hub");
        let profile = profile_with(&paths, manifest);

        let hooks = SettingsGenerator::new(&paths, &hub)
            .generate_hooks(&profile)
            .unwrap();

        let groups = &hooks["PostToolUse"];
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].hooks[0].command,
            "bash $HOME/.cchub/profiles/p/hooks/guard/guard.sh"
        );
        assert_eq!(groups[1].matcher.as_deref(), Some("Edit"));
        assert_eq!(
            groups[1].hooks[0].command,
            "$HOME/.cchub/profiles/p/hooks/fmt/fmt.sh"
        );
        assert_eq!(groups[1].hooks[0].timeout, Some(60));
    }

    #[test]
    fn test_regenerate_drops_stray_keys_and_keeps_prior_hooks() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        add_fragment(&paths, "model", "model", serde_json::json!("sonnet"));
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::SettingFragments, "model");
        let profile = profile_with(&paths, manifest);

        fs::write(
            profile.settings_path(),
            r#"{"stray": 1, "model": "opus", "hooks": {"Stop": []}}"#,
        )
        .unwrap();

        SettingsGenerator::new(&paths, &hub)
            .regenerate(&profile)
            .unwrap();

        let doc = read_settings(&profile.settings_path()).unwrap().unwrap();
        assert_eq!(doc["model"], "sonnet");
        assert!(!doc.contains_key("stray"));
        assert_eq!(doc[HOOKS_KEY], serde_json::json!({"Stop": []}));
    }

    #[test]
    fn test_regenerate_replaces_corrupt_settings() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        add_fragment(&paths, "model", "model", serde_json::json!("sonnet"));
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::SettingFragments, "model");
        let profile = profile_with(&paths, manifest);

        fs::write(profile.settings_path(), "{ truncated").unwrap();
        assert!(read_settings(&profile.settings_path()).is_err());

        SettingsGenerator::new(&paths, &hub)
            .regenerate(&profile)
            .unwrap();

        let doc = read_settings(&profile.settings_path()).unwrap().unwrap();
        assert_eq!(doc["model"], "sonnet");
        assert!(!doc.contains_key(HOOKS_KEY));
    }

    #[test]
    fn test_regenerate_overwrites_prior_hooks_with_generated() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let dir = add_hub_dir(&paths, HubItemType::Hooks, "guard");
        fs::write(dir.join("hook.json"), r#"{"type": "Stop", "command": "echo done", "inline": true}"#)
            .unwrap();
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::Hooks, "guard");
        let profile = profile_with(&paths, manifest);
        fs::write(profile.settings_path(), r#"{"hooks": {"Old": []}}"#).unwrap();

        SettingsGenerator::new(&paths, &hub)
            .regenerate(&profile)
            .unwrap();

        let doc = read_settings(&profile.settings_path()).unwrap().unwrap();
        let hooks = doc[HOOKS_KEY].as_object().unwrap();
        assert!(!hooks.contains_key("Old"));
        assert_eq!(hooks["Stop"][0]["hooks"][0]["command"], "echo done");
        assert_eq!(hooks["Stop"][0]["hooks"][0]["type"], "command");
        assert!(hooks["Stop"][0].get("matcher").is_none());
    }

    #[test]
    fn test_broken_fragment_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let dir = paths.hub_type_dir(HubItemType::SettingFragments);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.json"), "{ nope").unwrap();
        let hub = HubCatalog::scan(&paths).unwrap();

        let mut manifest = Manifest::new("p");
        manifest.add_hub_item(HubItemType::SettingFragments, "bad");
        let profile = profile_with(&paths, manifest);

        let err = SettingsGenerator::new(&paths, &hub)
            .assemble(&profile)
            .unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_fragment_dir_without_file() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let dir = add_hub_dir(&paths, HubItemType::SettingFragments, "theme");

        let err = SettingFragment::read(&dir).unwrap_err();
        assert!(matches!(err, Error::FragmentNotFound { ref name } if name == "theme"));

        fs::write(
            dir.join(FRAGMENT_DIR_FILE),
            r#"{"key": "theme", "value": "dark"}"#,
        )
        .unwrap();
        let fragment = SettingFragment::read(&dir).unwrap();
        assert_eq!(fragment.key, "theme");
        assert_eq!(fragment.value, "dark");
    }
}
