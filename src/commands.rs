//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`list`, `create`, `use`, etc.).
//! It serves as the coordination layer, interacting with:
//! - `crate::ui` for output.
//! - `crate::paths` for filesystem locations.
//! - `crate::hub` for the item catalog.
//! - `crate::profiles` for profile lifecycle.
//! - `crate::drift` and `crate::settings` for reconciliation.
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::doctor::run_doctor;
use crate::drift::{DriftDetector, DriftKind, DriftReport};
use crate::hub::{HubCatalog, HubItemType};
use crate::manifest::{DataItemType, Manifest, ShareMode};
use crate::paths::Paths;
use crate::profiles::{Profile, ProfileManager};
use crate::settings::SettingsGenerator;
use crate::symlink;
use crate::ui::{Tone, Ui};

/// Options for `cchub create`
#[derive(Debug, Default, Clone)]
pub struct CreateOptions {
    pub description: Option<String>,
    /// `type/name` pairs
    pub items: Vec<String>,
    pub share: Vec<DataItemType>,
    pub isolate: Vec<DataItemType>,
}

/// List all available profiles
pub fn list(paths: &Paths, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let profiles = manager.list()?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} create <name>", ui.bold("cchub")));
        return Ok(());
    }

    let current = manager.active_name().unwrap_or(None);

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Items"),
        ui.header_cell("Description"),
        ui.header_cell("Status"),
    ]);

    for name in &profiles {
        let is_active = current.as_deref() == Some(name.as_str());
        let icon = if is_active { ui.icon_ok() } else { " " };

        let (items, description, status_cell) = match manager.get(name) {
            Ok(profile) => {
                let status = if is_active {
                    ui.tone_cell("active", Tone::Good)
                } else if profile.manifest.needs_migration() {
                    ui.tone_cell("legacy", Tone::Notice)
                } else {
                    ui.cell("-")
                };
                (
                    profile.manifest.all_linked_items().len().to_string(),
                    profile.manifest.description,
                    status,
                )
            }
            Err(_) => (
                "?".to_string(),
                String::new(),
                ui.tone_cell("invalid", Tone::Bad),
            ),
        };

        table.add_row(vec![
            ui.cell(icon),
            ui.cell(name),
            ui.cell(items),
            ui.cell(description),
            status_cell,
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the active profile and the state of the `~/.claude` link
pub fn current(paths: &Paths, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();

    let active = manager.active_name()?;
    match &active {
        Some(name) => table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(name)]),
        None => table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]),
    };

    let info = symlink::info(&paths.active_link);
    table.add_row(vec![
        ui.cell(format!("{}:", paths.active_link.display())),
        ui.link_cell(&info),
    ]);

    if active.is_none() && info.target.is_some() && !info.broken {
        table.add_row(vec![
            ui.cell(""),
            ui.tone_cell("(symlink is not a profile directory)", Tone::Notice),
        ]);
    }

    ui.println(table.to_string());
    Ok(())
}

/// Show detailed information about a profile
pub fn inspect(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let profile = get_profile(&manager, name)?;
    let manifest = &profile.manifest;

    ui.section(format!("Profile: {}", name));
    ui.newline();

    let mut table = ui.simple_table();
    if !manifest.description.is_empty() {
        table.add_row(vec![ui.cell("Description:"), ui.cell(&manifest.description)]);
    }
    table.add_row(vec![
        ui.cell("Created:"),
        ui.cell(manifest.created.format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Updated:"),
        ui.cell(manifest.updated.format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);
    let version_cell = if manifest.needs_migration() {
        ui.tone_cell(
            format!("{} (legacy, run 'cchub migrate {}')", manifest.version, name),
            Tone::Notice,
        )
    } else {
        ui.cell(manifest.version.to_string())
    };
    table.add_row(vec![ui.cell("Version:"), version_cell]);
    table.add_row(vec![
        ui.cell("Settings:"),
        ui.cell(profile.settings_path().display().to_string()),
    ]);
    ui.println(table.to_string());
    ui.newline();

    ui.section("Linked Items");
    ui.newline();
    let linked = manifest.all_linked_items();
    if linked.is_empty() {
        ui.println(ui.dim("  (none)"));
    } else {
        let mut items_table = ui.simple_table();
        items_table.set_header(vec![
            ui.header_cell("Type"),
            ui.header_cell("Name"),
            ui.header_cell("Link"),
        ]);
        for (item_type, item_name) in &linked {
            let expected = hub.item_path(*item_type, item_name);
            let link = profile.item_path(*item_type, item_name);
            let status = if !hub.contains(*item_type, item_name) {
                ui.tone_cell("not in hub", Tone::Bad)
            } else if symlink::validate(&link, &expected) {
                ui.tone_cell("ok", Tone::Good)
            } else {
                ui.tone_cell("drifted", Tone::Notice)
            };
            items_table.add_row(vec![ui.cell(item_type.to_string()), ui.cell(item_name), status]);
        }
        ui.println(items_table.to_string());
    }
    ui.newline();

    ui.section("Data");
    ui.newline();
    let mut data_table = ui.simple_table();
    data_table.set_header(vec![
        ui.header_cell("Data"),
        ui.header_cell("Mode"),
        ui.header_cell("Size"),
    ]);
    for (data_type, mode) in manifest.data.resolved() {
        let slot = profile.path.join(data_type.dir_name());
        let size = match mode {
            ShareMode::Shared => calculate_size(&paths.shared_data(data_type))?,
            ShareMode::Isolated => calculate_size(&slot)?,
        };
        data_table.add_row(vec![
            ui.cell(data_type.to_string()),
            ui.share_mode_cell(mode),
            ui.cell(size),
        ]);
    }
    ui.println(data_table.to_string());

    Ok(())
}

/// List the hub catalog, optionally restricted to one item type
pub fn hub(paths: &Paths, item_type: Option<HubItemType>, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;

    if hub.is_empty() {
        ui.warn(format!("Hub is empty: {}", paths.hub_dir.display()));
        ui.println("Add items under hub/<type>/<name>, e.g. hub/skills/my-skill/");
        return Ok(());
    }

    let types: Vec<HubItemType> = match item_type {
        Some(t) => vec![t],
        None => HubItemType::ALL.to_vec(),
    };

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell("Type"),
        ui.header_cell("Name"),
        ui.header_cell("Kind"),
    ]);
    for t in types {
        for item in hub.items(t) {
            let kind = if item.is_dir { "dir" } else { "file" };
            table.add_row(vec![ui.cell(t.to_string()), ui.cell(&item.name), ui.cell(kind)]);
        }
    }

    ui.section(format!("Hub ({} items)", hub.len()));
    ui.println(table.to_string());
    Ok(())
}

/// Create a new profile
pub fn create(paths: &Paths, name: &str, options: CreateOptions, ui: &Ui) -> Result<()> {
    paths.ensure_dirs()?;
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);

    if manager.exists(name) {
        bail!(
            "Profile '{}' already exists.\nHint: Use 'cchub link {} <type>/<name>' to add items, or choose a different name.",
            name,
            name
        );
    }

    let mut manifest = Manifest::new(name);
    if let Some(description) = options.description {
        manifest = manifest.with_description(description);
    }

    for spec in &options.items {
        let (item_type, item_name) = parse_item_spec(spec)?;
        if !hub.contains(item_type, &item_name) {
            bail!(
                "Hub item '{}' not found.\nHint: Use 'cchub hub {}' to see available items.",
                spec,
                item_type
            );
        }
        manifest.add_hub_item(item_type, &item_name);
    }
    for data_type in options.share {
        manifest.set_data_share_mode(data_type, ShareMode::Shared);
    }
    for data_type in options.isolate {
        manifest.set_data_share_mode(data_type, ShareMode::Isolated);
    }

    let profile = manager.create(name, manifest)?;

    ui.ok(format!("Created profile '{}'", name));
    let linked = profile.manifest.all_linked_items();
    if !linked.is_empty() {
        ui.newline();
        ui.println("Linked items:");
        for (item_type, item_name) in linked {
            ui.println(format!("  {} {}/{}", ui.icon_ok(), item_type, item_name));
        }
    }
    ui.newline();
    ui.println("To activate it:");
    ui.println(format!("  cchub use {}", name));

    Ok(())
}

/// Delete a profile. The active profile is only removed with `force`.
pub fn delete(paths: &Paths, name: &str, force: bool, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);

    if !manager.exists(name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'cchub list' to see available profiles.",
            name
        );
    }

    let is_active = manager.active_name()?.as_deref() == Some(name);
    if is_active && !force {
        bail!(
            "Profile '{}' is active.\nHint: Switch to another profile first, or pass --force.",
            name
        );
    }

    manager.delete(name)?;
    if is_active {
        symlink::remove(&paths.active_link)?;
        ui.warn(format!("Removed {} (no active profile)", paths.active_link.display()));
    }

    ui.ok(format!("Deleted profile '{}'", name));
    Ok(())
}

/// Rename a profile
pub fn rename(paths: &Paths, old_name: &str, new_name: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);

    if !manager.exists(old_name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'cchub list' to see available profiles.",
            old_name
        );
    }
    if manager.exists(new_name) {
        bail!(
            "Profile '{}' already exists.\nHint: Choose a different name or remove the existing profile first.",
            new_name
        );
    }

    let was_active = manager.active_name()?.as_deref() == Some(old_name);
    manager.rename(old_name, new_name)?;

    if was_active {
        ui.ok(format!("Renamed profile '{}' to '{}' (active link updated)", old_name, new_name));
    } else {
        ui.ok(format!("Renamed profile '{}' to '{}'", old_name, new_name));
    }
    Ok(())
}

/// Link a hub item into a profile
pub fn link(paths: &Paths, profile_name: &str, spec: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let mut profile = get_profile(&manager, profile_name)?;
    let (item_type, item_name) = parse_item_spec(spec)?;

    manager
        .link_hub_item(&mut profile, item_type, &item_name)
        .with_context(|| format!("Failed to link '{}' into '{}'", spec, profile_name))?;

    ui.ok(format!("Linked {}/{} into '{}'", item_type, item_name, profile_name));
    Ok(())
}

/// Unlink a hub item from a profile
pub fn unlink(paths: &Paths, profile_name: &str, spec: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let mut profile = get_profile(&manager, profile_name)?;
    let (item_type, item_name) = parse_item_spec(spec)?;

    if manager.unlink_hub_item(&mut profile, item_type, &item_name)? {
        ui.ok(format!("Unlinked {}/{} from '{}'", item_type, item_name, profile_name));
    } else {
        ui.info(format!("{}/{} was not linked in '{}'", item_type, item_name, profile_name));
    }
    Ok(())
}

/// Switch to a profile
pub fn use_profile(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);

    let spinner = ui.spinner(format!("Switching to profile '{}'...", name));

    match manager.set_active(name) {
        Ok(()) => {
            ui.spinner_done(&spinner, true, format!("Active profile: {}", name));
            Ok(())
        }
        Err(e) => {
            ui.spinner_done(&spinner, false, format!("Failed to switch: {}", e));
            Err(e.into())
        }
    }
}

/// Report drift for a profile (the active one by default)
///
/// Fails when any drift is found, so scripts can test the exit status.
pub fn drift(paths: &Paths, name: Option<&str>, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let profile = resolve_profile(&manager, name)?;

    let report = DriftDetector::new(&hub).detect(&profile)?;
    print_report(&report, ui);

    report.ensure_clean()?;
    Ok(())
}

/// Repair drift for a profile (the active one by default)
pub fn fix(paths: &Paths, name: Option<&str>, dry_run: bool, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let profile = resolve_profile(&manager, name)?;
    let detector = DriftDetector::new(&hub);

    let report = detector.detect(&profile)?;
    if report.is_clean() {
        ui.ok(format!("Profile '{}' has no drift", profile.name));
        return Ok(());
    }

    let result = detector.fix(&profile, &report, dry_run);
    let (actions, failure) = match result {
        Ok(actions) => (actions, None),
        Err(partial) => (partial.applied, Some(partial.source)),
    };

    let prefix = if dry_run { "would" } else { "did" };
    for action in &actions {
        ui.println(format!("  {} {} {}", ui.icon_info(), ui.dim(prefix), action.description));
    }

    if let Some(e) = failure {
        return Err(anyhow::Error::new(e).context(format!(
            "Fix stopped after {} action(s).\nHint: Re-add the missing hub item or unlink it from the profile.",
            actions.len()
        )));
    }

    if dry_run {
        ui.info(format!("{} action(s) planned; nothing changed", actions.len()));
    } else {
        ui.ok(format!("Applied {} fix(es) to '{}'", actions.len(), profile.name));
    }
    Ok(())
}

/// Regenerate a profile's settings.json, or print it with `dry_run`
pub fn settings(paths: &Paths, name: Option<&str>, dry_run: bool, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let profile = resolve_profile(&manager, name)?;
    let generator = SettingsGenerator::new(paths, &hub);

    if dry_run {
        let doc = generator.assemble(&profile)?;
        let json = serde_json::to_string_pretty(&doc).context("Failed to serialize settings")?;
        ui.println(json);
        return Ok(());
    }

    let path = generator.regenerate(&profile)?;
    ui.ok(format!("Wrote {}", path.display()));
    Ok(())
}

/// Rewrite a legacy manifest in the current format
pub fn migrate(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let hub = HubCatalog::scan(paths)?;
    let manager = ProfileManager::new(paths, &hub);
    let mut profile = get_profile(&manager, name)?;

    if !profile.manifest.needs_migration() {
        ui.info(format!("Profile '{}' is already current", name));
        return Ok(());
    }

    profile.save_manifest()?;
    ui.ok(format!("Migrated profile '{}' to version {}", name, profile.manifest.version));
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if run_doctor(paths, ui) {
        Ok(())
    } else {
        bail!("Doctor found issues");
    }
}

fn print_report(report: &DriftReport, ui: &Ui) {
    if report.is_clean() {
        ui.ok(format!("Profile '{}' matches its manifest", report.profile));
        return;
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell("Issue"),
        ui.header_cell("Item"),
        ui.header_cell("Detail"),
    ]);
    for item in &report.items {
        let detail = match (&item.expected_target, &item.actual_target) {
            (Some(expected), Some(actual)) => {
                format!("{} (expected {})", actual.display(), expected.display())
            }
            (Some(expected), None) if item.kind == DriftKind::Mismatched => {
                format!("not a symlink (expected {})", expected.display())
            }
            (Some(expected), None) => format!("expected {}", expected.display()),
            (None, None) if item.kind == DriftKind::Mismatched => "invalid item name".to_string(),
            _ => String::new(),
        };
        table.add_row(vec![
            ui.drift_kind_cell(item.kind),
            ui.cell(format!("{}/{}", item.item_type, item.item_name)),
            ui.cell(detail),
        ]);
    }

    ui.section(format!("Drift in '{}'", report.profile));
    ui.println(table.to_string());
    ui.warn(format!(
        "{} issue(s): {} missing, {} extra, {} broken, {} mismatched",
        report.items.len(),
        report.count(DriftKind::Missing),
        report.count(DriftKind::Extra),
        report.count(DriftKind::Broken),
        report.count(DriftKind::Mismatched),
    ));
}

/// Parse `type/name`, e.g. `skills/lint`
fn parse_item_spec(spec: &str) -> Result<(HubItemType, String)> {
    let Some((type_str, name)) = spec.split_once('/') else {
        bail!(
            "Invalid item '{}'.\nHint: Use <type>/<name>, e.g. skills/my-skill",
            spec
        );
    };
    let item_type = type_str
        .parse::<HubItemType>()
        .map_err(|e| anyhow::anyhow!("{}\nHint: Valid types are skills, agents, hooks, rules, commands, setting-fragments", e))?;
    crate::profiles::validate_item_name(name)?;
    Ok((item_type, name.to_string()))
}

fn get_profile(manager: &ProfileManager, name: &str) -> Result<Profile> {
    if !manager.exists(name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'cchub list' to see available profiles.",
            name
        );
    }
    Ok(manager.get(name)?)
}

/// The named profile, or the active one when no name is given
fn resolve_profile(manager: &ProfileManager, name: Option<&str>) -> Result<Profile> {
    match name {
        Some(name) => get_profile(manager, name),
        None => match manager.active()? {
            Some(profile) => Ok(profile),
            None => bail!("No active profile.\nHint: Pass a profile name or run 'cchub use <name>'."),
        },
    }
}

/// Calculate human-readable size of a file or directory
fn calculate_size(path: &Path) -> Result<String> {
    use std::fs;

    let size = if path.is_file() {
        fs::metadata(path)
            .with_context(|| format!("Failed to read metadata for {}", path.display()))?
            .len()
    } else if path.is_dir() {
        crate::fs_utils::dir_size(path)
            .with_context(|| format!("Failed to calculate size for {}", path.display()))?
    } else {
        0
    };

    Ok(format_bytes(size))
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{add_fragment, add_hub_dir, setup_test_paths};
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    #[test]
    fn test_list_empty() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        // Should not error, just show "no profiles"
        assert!(list(&paths, &ui).is_ok());
    }

    #[test]
    fn test_create_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        add_hub_dir(&paths, HubItemType::Skills, "lint");

        let options = CreateOptions {
            description: Some("day job".to_string()),
            items: vec!["skills/lint".to_string()],
            isolate: vec![DataItemType::Tasks],
            ..Default::default()
        };
        create(&paths, "work", options, &ui).unwrap();

        let profile = paths.profile_dir("work");
        assert!(symlink::is_symlink(&profile.join("skills/lint")));
        assert!(!symlink::is_symlink(&profile.join("tasks")));
        assert!(list(&paths, &ui).is_ok());
        assert!(inspect(&paths, "work", &ui).is_ok());
    }

    #[test]
    fn test_create_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        create(&paths, "work", CreateOptions::default(), &ui).unwrap();
        assert!(create(&paths, "work", CreateOptions::default(), &ui).is_err());
    }

    #[test]
    fn test_create_unknown_item() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        let options = CreateOptions {
            items: vec!["skills/ghost".to_string()],
            ..Default::default()
        };
        let err = create(&paths, "work", options, &ui).unwrap_err();
        assert!(err.to_string().contains("skills/ghost"));
        assert!(!paths.profile_dir("work").exists());
    }

    #[test]
    fn test_parse_item_spec() {
        assert_eq!(
            parse_item_spec("skills/lint").unwrap(),
            (HubItemType::Skills, "lint".to_string())
        );
        assert_eq!(
            parse_item_spec("fragment/model").unwrap().0,
            HubItemType::SettingFragments
        );
        assert!(parse_item_spec("lint").is_err());
        assert!(parse_item_spec("widgets/x").is_err());
        assert!(parse_item_spec("skills/..").is_err());
    }

    #[test]
    fn test_use_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        assert!(use_profile(&paths, "nonexistent", &ui).is_err());
    }

    #[test]
    fn test_current_no_active() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        // Should not error
        assert!(current(&paths, &ui).is_ok());
    }

    #[test]
    fn test_delete_active_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        create(&paths, "work", CreateOptions::default(), &ui).unwrap();
        use_profile(&paths, "work", &ui).unwrap();

        assert!(delete(&paths, "work", false, &ui).is_err());
        assert!(paths.profile_dir("work").exists());

        delete(&paths, "work", true, &ui).unwrap();
        assert!(!paths.profile_dir("work").exists());
        assert!(!symlink::is_symlink(&paths.active_link));
    }

    #[test]
    fn test_delete_parent_dir_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        let skill = add_hub_dir(&paths, HubItemType::Skills, "lint");

        assert!(delete(&paths, "..", true, &ui).is_err());
        assert!(skill.is_dir());
        assert!(paths.base_dir.is_dir());
    }

    #[test]
    fn test_drift_and_fix_on_active_profile() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        add_hub_dir(&paths, HubItemType::Agents, "reviewer");

        let options = CreateOptions {
            items: vec!["agents/reviewer".to_string()],
            ..Default::default()
        };
        create(&paths, "work", options, &ui).unwrap();
        use_profile(&paths, "work", &ui).unwrap();
        assert!(drift(&paths, None, &ui).is_ok());

        let link = paths.profile_item("work", HubItemType::Agents, "reviewer");
        fs::remove_file(&link).unwrap();

        let err = drift(&paths, None, &ui).unwrap_err();
        let drift_err = err.downcast_ref::<crate::Error>().unwrap();
        assert_eq!(drift_err.exit_code(), 4);

        fix(&paths, None, true, &ui).unwrap();
        assert!(!link.exists());

        fix(&paths, Some("work"), false, &ui).unwrap();
        assert!(symlink::is_symlink(&link));
        assert!(drift(&paths, Some("work"), &ui).is_ok());
    }

    #[test]
    fn test_link_unlink_and_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();
        add_fragment(&paths, "model", "model", serde_json::json!("opus"));

        create(&paths, "work", CreateOptions::default(), &ui).unwrap();
        link(&paths, "work", "setting-fragments/model", &ui).unwrap();

        let settings_path = paths.profile_settings("work");
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&settings_path).unwrap()).unwrap();
        assert_eq!(doc["model"], "opus");

        assert!(settings(&paths, Some("work"), true, &ui).is_ok());

        unlink(&paths, "work", "setting-fragments/model", &ui).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&settings_path).unwrap()).unwrap();
        assert!(doc.get("model").is_none());
    }

    #[test]
    fn test_rename_active() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let ui = test_ui();

        create(&paths, "old", CreateOptions::default(), &ui).unwrap();
        use_profile(&paths, "old", &ui).unwrap();
        rename(&paths, "old", "new", &ui).unwrap();

        let hub = HubCatalog::scan(&paths).unwrap();
        let manager = ProfileManager::new(&paths, &hub);
        assert_eq!(manager.active_name().unwrap().as_deref(), Some("new"));
        assert!(rename(&paths, "old", "other", &ui).is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
