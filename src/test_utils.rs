//! Test utilities shared across test modules
//!
//! This module provides common helper functions for testing, avoiding duplication
//! across multiple test suites.

use std::fs;
use std::path::PathBuf;

use crate::hub::HubItemType;
use crate::paths::Paths;
use tempfile::TempDir;

/// Create a Paths struct for testing using a temporary directory
///
/// The temp directory stands in for the home directory, so the layout is
/// `<temp>/.cchub/...` plus the `<temp>/.claude` active link.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    let paths = Paths::from_home(temp_dir.path());
    paths.ensure_dirs().unwrap();
    paths
}

/// Add a directory item to the hub with a README inside
pub fn add_hub_dir(paths: &Paths, item_type: HubItemType, name: &str) -> PathBuf {
    let dir = paths.hub_item(item_type, name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("README.md"), format!("# {}\n", name)).unwrap();
    dir
}

/// Add a single-file item to the hub
pub fn add_hub_file(paths: &Paths, item_type: HubItemType, file_name: &str, content: &str) -> PathBuf {
    let dir = paths.hub_type_dir(item_type);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, content).unwrap();
    path
}

/// Add `setting-fragments/<name>.json` setting `key` to `value`
pub fn add_fragment(paths: &Paths, name: &str, key: &str, value: serde_json::Value) -> PathBuf {
    let content = serde_json::json!({
        "name": name,
        "key": key,
        "value": value,
    });
    add_hub_file(
        paths,
        HubItemType::SettingFragments,
        &format!("{}.json", name),
        &content.to_string(),
    )
}
