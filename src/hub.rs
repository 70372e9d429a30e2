//! Read-only view of the hub catalog.
//!
//! The hub is laid out as `hub/<type>/<name>`. A scan takes a snapshot; the
//! catalog is never mutated by the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PathContext, Result};
use crate::paths::Paths;

/// Item categories. Declaration order is the canonical iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HubItemType {
    Skills,
    Agents,
    Hooks,
    Rules,
    Commands,
    SettingFragments,
}

impl HubItemType {
    pub const ALL: [HubItemType; 6] = [
        HubItemType::Skills,
        HubItemType::Agents,
        HubItemType::Hooks,
        HubItemType::Rules,
        HubItemType::Commands,
        HubItemType::SettingFragments,
    ];

    /// Directory name under the hub and inside each profile
    pub fn dir_name(&self) -> &'static str {
        match self {
            HubItemType::Skills => "skills",
            HubItemType::Agents => "agents",
            HubItemType::Hooks => "hooks",
            HubItemType::Rules => "rules",
            HubItemType::Commands => "commands",
            HubItemType::SettingFragments => "setting-fragments",
        }
    }

    /// Fragments are merged into settings.json instead of being consumed as links
    pub fn is_linked_tree(&self) -> bool {
        !matches!(self, HubItemType::SettingFragments)
    }
}

impl fmt::Display for HubItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for HubItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skills" | "skill" => Ok(HubItemType::Skills),
            "agents" | "agent" => Ok(HubItemType::Agents),
            "hooks" | "hook" => Ok(HubItemType::Hooks),
            "rules" | "rule" => Ok(HubItemType::Rules),
            "commands" | "command" => Ok(HubItemType::Commands),
            "setting-fragments" | "setting-fragment" | "fragments" | "fragment" => {
                Ok(HubItemType::SettingFragments)
            }
            _ => Err(format!("Unknown hub item type: {}", s)),
        }
    }
}

/// One entry of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubItem {
    pub name: String,
    pub item_type: HubItemType,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Snapshot of the hub, keyed by type then name
#[derive(Debug, Clone, Default)]
pub struct HubCatalog {
    hub_dir: PathBuf,
    items: BTreeMap<HubItemType, BTreeMap<String, HubItem>>,
}

impl HubCatalog {
    /// Scan `hub/<type>/` for every item type
    pub fn scan(paths: &Paths) -> Result<Self> {
        let sources: Vec<_> = HubItemType::ALL
            .iter()
            .map(|t| (*t, paths.hub_type_dir(*t)))
            .collect();

        let mut catalog = Self::scan_sources(&sources)?;
        catalog.hub_dir = paths.hub_dir.clone();
        Ok(catalog)
    }

    /// Scan arbitrary source directories mapped to item types.
    ///
    /// Missing directories simply contribute no items.
    pub fn scan_sources(sources: &[(HubItemType, PathBuf)]) -> Result<Self> {
        let mut catalog = Self::default();

        for (item_type, dir) in sources {
            if !dir.is_dir() {
                continue;
            }

            let entries = fs::read_dir(dir).path_context("read directory", dir)?;
            for entry in entries {
                let entry = entry.path_context("read directory entry", dir)?;
                let file_name = entry.file_name().to_string_lossy().to_string();
                if file_name.starts_with('.') {
                    continue;
                }

                let path = entry.path();
                let is_dir = path.is_dir();
                let name = if *item_type == HubItemType::SettingFragments && !is_dir {
                    strip_extension(&file_name)
                } else {
                    file_name
                };

                catalog.items.entry(*item_type).or_default().insert(
                    name.clone(),
                    HubItem {
                        name,
                        item_type: *item_type,
                        path,
                        is_dir,
                    },
                );
            }
        }

        tracing::debug!(items = catalog.len(), "scanned hub catalog");
        Ok(catalog)
    }

    /// Exact (type, name) lookup
    pub fn get(&self, item_type: HubItemType, name: &str) -> Option<&HubItem> {
        self.items.get(&item_type).and_then(|m| m.get(name))
    }

    pub fn contains(&self, item_type: HubItemType, name: &str) -> bool {
        self.get(item_type, name).is_some()
    }

    /// Items of one type, sorted by name
    pub fn items(&self, item_type: HubItemType) -> Vec<&HubItem> {
        self.items
            .get(&item_type)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    /// Canonical location of an item: its scanned path, or `hub/<type>/<name>`
    pub fn item_path(&self, item_type: HubItemType, name: &str) -> PathBuf {
        match self.get(item_type, name) {
            Some(item) => item.path.clone(),
            None => self.hub_dir.join(item_type.dir_name()).join(name),
        }
    }

    pub fn len(&self) -> usize {
        self.items.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn strip_extension(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}
