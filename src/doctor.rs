//! Diagnostic tool for cchub.
//!
//! This module implements the `cchub doctor` command, which checks the system
//! for common issues:
//! - Existence of required directories.
//! - Validity of the `~/.claude` active link.
//! - Manifests that fail to load or still use the legacy layout.
//! - Drift between each profile's manifest and its symlink tree.
//!
//! It reports issues to the user with a pass/fail/warn status.

use crate::drift::DriftDetector;
use crate::hub::HubCatalog;
use crate::paths::Paths;
use crate::profiles::ProfileManager;
use crate::symlink;
use crate::ui::{Tone, Ui};

/// Run the doctor diagnostics. Returns false when any check failed.
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("cchub Doctor");
    ui.newline();

    let mut healthy = true;

    // 1. Directories
    healthy &= check_step(ui, "Directories", || {
        let mut ok = true;
        for (label, dir) in [
            ("Hub", &paths.hub_dir),
            ("Profiles", &paths.profiles_dir),
            ("Shared data", &paths.shared_dir),
        ] {
            if dir.is_dir() {
                ui.println(format!("  {} {} directory exists: {}", ui.icon_ok(), label, dir.display()));
            } else {
                ui.println(format!("  {} {} directory missing: {}", ui.icon_err(), label, dir.display()));
                ok = false;
            }
        }
        ok
    });

    // 2. Hub catalog
    let hub = match HubCatalog::scan(paths) {
        Ok(hub) => hub,
        Err(e) => {
            ui.err(format!("Failed to scan hub: {}", e));
            return false;
        }
    };
    check_step(ui, "Hub", || {
        if hub.is_empty() {
            ui.println(format!("  {} Hub is empty", ui.icon_warn()));
        } else {
            ui.println(format!("  {} {} items in hub", ui.icon_ok(), hub.len()));
        }
        true
    });

    // 3. Active link
    healthy &= check_step(ui, "Active Link", || {
        let info = symlink::info(&paths.active_link);
        if !info.exists {
            ui.println(format!("  {} {} does not exist (no active profile)", ui.icon_warn(), paths.active_link.display()));
            return true;
        }
        if !info.is_symlink {
            ui.println(format!(
                "  {} {} is a real directory, not managed by cchub",
                ui.icon_warn(),
                paths.active_link.display()
            ));
            return true;
        }

        let Some(target) = info.target else {
            ui.println(format!("  {} Symlink target unreadable", ui.icon_err()));
            return false;
        };
        if info.broken {
            ui.println(format!("  {} BROKEN symlink pointing to: {}", ui.icon_err(), target.display()));
            return false;
        }

        ui.println(format!("  {} Symlink points to: {}", ui.icon_ok(), target.display()));
        if paths.profile_name_of(&target).is_some() {
            ui.println(format!("  {} Target is a cchub profile", ui.icon_ok()));
        } else {
            ui.println(format!("  {} Target is EXTERNAL (not managed by cchub?)", ui.icon_warn()));
        }
        true
    });

    // 4. Profiles
    healthy &= check_step(ui, "Profiles", || {
        let manager = ProfileManager::new(paths, &hub);
        let detector = DriftDetector::new(&hub);

        let profiles = match manager.list() {
            Ok(p) => p,
            Err(e) => {
                ui.println(format!("  {} Failed to list profiles: {}", ui.icon_err(), e));
                return false;
            }
        };

        if profiles.is_empty() {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profiles:", profiles.len()));
        let mut all_valid = true;

        for name in profiles {
            let profile = match manager.get(&name) {
                Ok(profile) => profile,
                Err(e) => {
                    ui.println(format!("    {} {} ({})", ui.icon_err(), name, e));
                    all_valid = false;
                    continue;
                }
            };

            let report = match detector.detect(&profile) {
                Ok(report) => report,
                Err(e) => {
                    ui.println(format!("    {} {} (drift check failed: {})", ui.icon_err(), name, e));
                    all_valid = false;
                    continue;
                }
            };

            if !report.is_clean() {
                ui.println(format!(
                    "    {} {} ({} drift issue(s), run 'cchub fix {}')",
                    ui.icon_warn(),
                    name,
                    report.items.len(),
                    name
                ));
            } else if profile.manifest.needs_migration() {
                ui.println(format!(
                    "    {} {} (legacy manifest, run 'cchub migrate {}')",
                    ui.icon_warn(),
                    name,
                    name
                ));
            } else {
                ui.println(format!("    {} {}", ui.icon_ok(), name));
            }
        }
        all_valid
    });

    healthy
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.paint("  Issues detected!", Tone::Bad));
    }
    ui.newline();
    success
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::test_utils::setup_test_paths;
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_doctor_fresh_install() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let ui = Ui::new(ColorMode::Never, false);

        assert!(run_doctor(&paths, &ui));
    }

    #[test]
    fn test_doctor_flags_broken_active_link() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let ui = Ui::new(ColorMode::Never, false);

        symlink::create(&paths.active_link, &paths.profile_dir("gone")).unwrap();
        assert!(!run_doctor(&paths, &ui));
    }

    #[test]
    fn test_doctor_flags_corrupt_manifest() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        let ui = Ui::new(ColorMode::Never, false);

        let hub = HubCatalog::scan(&paths).unwrap();
        let manager = ProfileManager::new(&paths, &hub);
        manager.create("work", Manifest::new("work")).unwrap();
        assert!(run_doctor(&paths, &ui));

        fs::write(paths.profile_manifest("work"), "not json").unwrap();
        assert!(!run_doctor(&paths, &ui));
    }
}
