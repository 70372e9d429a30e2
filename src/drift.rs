//! Drift detection and repair.
//!
//! Drift is any difference between what a profile's manifest declares and
//! the symlinks actually present in the profile tree. Setting fragments are
//! merged into settings.json and never checked here.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, PathContext, Result};
use crate::fs_utils::remove_tree;
use crate::hub::{HubCatalog, HubItemType};
use crate::profiles::{Profile, validate_item_name};
use crate::symlink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// Declared but nothing on disk
    Missing,
    /// On disk but not declared
    Extra,
    /// Declared symlink whose target is gone
    Broken,
    /// Declared entry that does not point at the hub item
    Mismatched,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriftKind::Missing => "missing",
            DriftKind::Extra => "extra",
            DriftKind::Broken => "broken",
            DriftKind::Mismatched => "mismatched",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftItem {
    pub kind: DriftKind,
    pub item_type: HubItemType,
    pub item_name: String,
    pub expected_target: Option<PathBuf>,
    pub actual_target: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    pub profile: String,
    pub items: Vec<DriftItem>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: DriftKind) -> usize {
        self.items.iter().filter(|i| i.kind == kind).count()
    }

    /// Turn remaining issues into an error
    pub fn ensure_clean(&self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }
        Err(Error::Drift {
            profile: self.profile.clone(),
            count: self.items.len(),
        })
    }
}

/// One repair step. `applied` is false for dry runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixAction {
    pub description: String,
    pub applied: bool,
}

/// A repair that stopped at its first hard error
#[derive(Debug, thiserror::Error)]
#[error("fix stopped after {} action(s): {source}", .applied.len())]
pub struct PartialFix {
    pub applied: Vec<FixAction>,
    #[source]
    pub source: Error,
}

pub struct DriftDetector<'a> {
    hub: &'a HubCatalog,
}

impl<'a> DriftDetector<'a> {
    pub fn new(hub: &'a HubCatalog) -> Self {
        Self { hub }
    }

    pub fn detect(&self, profile: &Profile) -> Result<DriftReport> {
        let mut report = DriftReport {
            profile: profile.name.clone(),
            items: Vec::new(),
        };

        for item_type in HubItemType::ALL.into_iter().filter(|t| t.is_linked_tree()) {
            let declared: BTreeSet<&str> = profile
                .manifest
                .hub_items(item_type)
                .iter()
                .map(String::as_str)
                .collect();

            for name in profile.manifest.hub_items(item_type) {
                if let Some(item) = self.check_declared(profile, item_type, name) {
                    report.items.push(item);
                }
            }

            for name in self.actual_entries(profile, item_type)? {
                if !declared.contains(name.as_str()) {
                    report.items.push(DriftItem {
                        kind: DriftKind::Extra,
                        item_type,
                        item_name: name,
                        expected_target: None,
                        actual_target: None,
                    });
                }
            }
        }

        tracing::debug!(profile = %profile.name, issues = report.items.len(), "drift detected");
        Ok(report)
    }

    fn check_declared(&self, profile: &Profile, item_type: HubItemType, name: &str) -> Option<DriftItem> {
        let issue = |kind, expected_target, actual_target| DriftItem {
            kind,
            item_type,
            item_name: name.to_string(),
            expected_target,
            actual_target,
        };

        // Never join a name that could leave the profile tree
        if validate_item_name(name).is_err() {
            tracing::warn!(profile = %profile.name, %item_type, name, "invalid item name in manifest");
            return Some(issue(DriftKind::Mismatched, None, None));
        }

        let path = profile.item_path(item_type, name);
        let expected = symlink::absolute(&self.hub.item_path(item_type, name));
        let info = symlink::info(&path);

        if !info.exists {
            return Some(issue(DriftKind::Missing, Some(expected), None));
        }
        if !info.is_symlink {
            return Some(issue(DriftKind::Mismatched, Some(expected), None));
        }
        if info.broken {
            return Some(issue(DriftKind::Broken, Some(expected), info.target));
        }
        if info.target.as_deref() != Some(expected.as_path()) {
            return Some(issue(DriftKind::Mismatched, Some(expected), info.target));
        }
        None
    }

    fn actual_entries(&self, profile: &Profile, item_type: HubItemType) -> Result<Vec<String>> {
        let dir = profile.type_dir(item_type);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).path_context("read directory", &dir)? {
            let entry = entry.path_context("read directory entry", &dir)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Repair every issue in report order.
    ///
    /// With `dry_run` the actions are described but nothing is touched.
    pub fn fix(
        &self,
        profile: &Profile,
        report: &DriftReport,
        dry_run: bool,
    ) -> std::result::Result<Vec<FixAction>, PartialFix> {
        let mut actions = Vec::new();

        for item in &report.items {
            if let Err(source) = self.fix_item(profile, item, dry_run, &mut actions) {
                return Err(PartialFix {
                    applied: actions,
                    source,
                });
            }
        }

        if !dry_run && !actions.is_empty() {
            tracing::info!(profile = %profile.name, actions = actions.len(), "repaired drift");
        }
        Ok(actions)
    }

    fn fix_item(
        &self,
        profile: &Profile,
        item: &DriftItem,
        dry_run: bool,
        actions: &mut Vec<FixAction>,
    ) -> Result<()> {
        validate_item_name(&item.item_name)?;
        let path = profile.item_path(item.item_type, &item.item_name);

        let description = match item.kind {
            DriftKind::Missing => {
                let target = self.require_item(item)?;
                if !dry_run {
                    symlink::ensure_dir(&profile.type_dir(item.item_type))?;
                    symlink::create(&path, &target)?;
                }
                format!("link {} -> {}", path.display(), target.display())
            }
            DriftKind::Extra => {
                if !dry_run {
                    remove_tree(&path)?;
                }
                format!("remove {}", path.display())
            }
            DriftKind::Broken | DriftKind::Mismatched => {
                let target = self.require_item(item)?;
                if !dry_run {
                    remove_tree(&path)?;
                    symlink::create(&path, &target)?;
                }
                format!("relink {} -> {}", path.display(), target.display())
            }
        };

        tracing::debug!(profile = %profile.name, dry_run, "{}", description);
        actions.push(FixAction {
            description,
            applied: !dry_run,
        });
        Ok(())
    }

    fn require_item(&self, item: &DriftItem) -> Result<PathBuf> {
        self.hub
            .get(item.item_type, &item.item_name)
            .map(|i| i.path.clone())
            .ok_or_else(|| Error::HubItemNotFound {
                item_type: item.item_type,
                name: item.item_name.clone(),
            })
    }
}
