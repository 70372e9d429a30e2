//! Per-profile manifest (`profile.json`).
//!
//! Two on-disk shapes exist. The current one (version 2) nests hub links under
//! `hub` and data sharing under `data`. The legacy one (version 0/1) kept item
//! lists at the top level and had no data section. Loading a legacy file
//! never rewrites it; only [`Manifest::save`] moves a file to version 2.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, PathContext, Result};
use crate::fs_utils::write_atomic;
use crate::hub::HubItemType;

pub const CURRENT_VERSION: u32 = 2;

/// Version assigned to anything read through the legacy parser
pub const LEGACY_VERSION: u32 = 0;

/// Per-profile data categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataItemType {
    Tasks,
    Todos,
    PasteCache,
    History,
    FileHistory,
    SessionEnv,
    Projects,
    Plans,
}

impl DataItemType {
    pub const ALL: [DataItemType; 8] = [
        DataItemType::Tasks,
        DataItemType::Todos,
        DataItemType::PasteCache,
        DataItemType::History,
        DataItemType::FileHistory,
        DataItemType::SessionEnv,
        DataItemType::Projects,
        DataItemType::Plans,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            DataItemType::Tasks => "tasks",
            DataItemType::Todos => "todos",
            DataItemType::PasteCache => "paste-cache",
            DataItemType::History => "history",
            DataItemType::FileHistory => "file-history",
            DataItemType::SessionEnv => "session-env",
            DataItemType::Projects => "projects",
            DataItemType::Plans => "plans",
        }
    }

    pub fn default_mode(&self) -> ShareMode {
        match self {
            DataItemType::Tasks
            | DataItemType::Todos
            | DataItemType::PasteCache
            | DataItemType::Projects => ShareMode::Shared,
            DataItemType::History
            | DataItemType::FileHistory
            | DataItemType::SessionEnv
            | DataItemType::Plans => ShareMode::Isolated,
        }
    }
}

impl fmt::Display for DataItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for DataItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DataItemType::ALL
            .into_iter()
            .find(|t| t.dir_name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown data type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Symlink into the shared root
    Shared,
    /// Private directory inside the profile
    Isolated,
}

impl fmt::Display for ShareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareMode::Shared => f.write_str("shared"),
            ShareMode::Isolated => f.write_str("isolated"),
        }
    }
}

/// Linked hub item names per type; each list keeps insertion order
pub type HubLinks = BTreeMap<HubItemType, Vec<String>>;

/// Share mode per data type; unset types use [`DataItemType::default_mode`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataConfig(BTreeMap<DataItemType, ShareMode>);

impl DataConfig {
    pub fn get(&self, data_type: DataItemType) -> ShareMode {
        self.0
            .get(&data_type)
            .copied()
            .unwrap_or_else(|| data_type.default_mode())
    }

    pub fn set(&mut self, data_type: DataItemType, mode: ShareMode) {
        self.0.insert(data_type, mode);
    }

    /// Every data type with its effective mode
    pub fn resolved(&self) -> Vec<(DataItemType, ShareMode)> {
        DataItemType::ALL
            .into_iter()
            .map(|t| (t, self.get(t)))
            .collect()
    }

    fn with_defaults() -> Self {
        Self(
            DataItemType::ALL
                .into_iter()
                .map(|t| (t, t.default_mode()))
                .collect(),
        )
    }
}

/// Hook configured directly on a profile, from before hooks lived in the hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyHookConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub event: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub version: u32,
    #[serde(default)]
    pub hub: HubLinks,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<LegacyHookConfig>,
}

/// The flat layout written before version 2
#[derive(Debug, Deserialize)]
struct LegacyManifest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    hooks: Vec<LegacyHookConfig>,
}

impl Manifest {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            created: now,
            updated: now,
            version: CURRENT_VERSION,
            hub: HubLinks::new(),
            data: DataConfig::with_defaults(),
            hooks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Load a manifest, falling back to the legacy layout.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).path_context("read manifest", path)?;
        Self::parse(&content).map_err(|message| Error::InvalidManifest {
            path: path.to_path_buf(),
            message,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let current_err = match serde_json::from_str::<Manifest>(content) {
            Ok(manifest) if manifest.version == CURRENT_VERSION => return Ok(manifest),
            Ok(manifest) => format!("unsupported version {}", manifest.version),
            Err(e) => e.to_string(),
        };

        if !looks_legacy(content) {
            return Err(current_err);
        }

        match serde_json::from_str::<LegacyManifest>(content) {
            Ok(legacy) => {
                tracing::debug!(name = %legacy.name, "loaded legacy manifest");
                Ok(Self::from_legacy(legacy))
            }
            Err(legacy_err) => Err(format!(
                "not a current manifest ({}) nor a legacy one ({})",
                current_err, legacy_err
            )),
        }
    }

    fn from_legacy(legacy: LegacyManifest) -> Self {
        let now = Utc::now();
        let created = legacy.created_at.unwrap_or(now);

        let mut manifest = Self {
            name: legacy.name,
            description: legacy.description.unwrap_or_default(),
            created,
            updated: legacy.updated_at.unwrap_or(created),
            version: LEGACY_VERSION,
            hub: HubLinks::new(),
            data: DataConfig::with_defaults(),
            hooks: legacy.hooks,
        };

        let lists = [
            (HubItemType::Skills, legacy.skills),
            (HubItemType::Agents, legacy.agents),
            (HubItemType::Rules, legacy.rules),
            (HubItemType::Commands, legacy.commands),
        ];
        for (item_type, names) in lists {
            for name in names {
                manifest.add_hub_item(item_type, &name);
            }
        }

        manifest
    }

    /// Write the current format, stamping version and update time
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.version = CURRENT_VERSION;
        self.updated = Utc::now();

        let content = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, content.as_bytes())
    }

    pub fn needs_migration(&self) -> bool {
        self.version < CURRENT_VERSION
    }

    /// Add a hub item; already-linked names are left alone
    pub fn add_hub_item(&mut self, item_type: HubItemType, name: &str) {
        let names = self.hub.entry(item_type).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    /// Remove the first occurrence of `name`; false when it was not linked
    pub fn remove_hub_item(&mut self, item_type: HubItemType, name: &str) -> bool {
        let Some(names) = self.hub.get_mut(&item_type) else {
            return false;
        };
        let Some(pos) = names.iter().position(|n| n == name) else {
            return false;
        };

        names.remove(pos);
        if names.is_empty() {
            self.hub.remove(&item_type);
        }
        true
    }

    pub fn hub_items(&self, item_type: HubItemType) -> &[String] {
        self.hub.get(&item_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_hub_item(&self, item_type: HubItemType, name: &str) -> bool {
        self.hub_items(item_type).iter().any(|n| n == name)
    }

    pub fn data_share_mode(&self, data_type: DataItemType) -> ShareMode {
        self.data.get(data_type)
    }

    pub fn set_data_share_mode(&mut self, data_type: DataItemType, mode: ShareMode) {
        self.data.set(data_type, mode);
    }

    /// Every linked (type, name), types in canonical order
    pub fn all_linked_items(&self) -> Vec<(HubItemType, String)> {
        HubItemType::ALL
            .iter()
            .flat_map(|t| self.hub_items(*t).iter().map(move |n| (*t, n.clone())))
            .collect()
    }

    /// Whether anything here feeds settings.json
    pub fn has_settings_inputs(&self) -> bool {
        !self.hub_items(HubItemType::Hooks).is_empty()
            || !self.hub_items(HubItemType::SettingFragments).is_empty()
    }
}

/// Legacy files predate version 2 and have no `hub` or `data` section
fn looks_legacy(content: &str) -> bool {
    let Ok(serde_json::Value::Object(doc)) = serde_json::from_str(content) else {
        return false;
    };
    if doc.contains_key("hub") || doc.contains_key("data") {
        return false;
    }
    match doc.get("version") {
        None => true,
        Some(version) => version
            .as_u64()
            .is_some_and(|v| v < u64::from(CURRENT_VERSION)),
    }
}
