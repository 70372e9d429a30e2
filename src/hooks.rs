//! Hook item readers.
//!
//! A hook item is a directory in `hub/hooks/<name>/`. Two declaration formats
//! are understood:
//!
//! - `hooks.json`, the canonical plugin format:
//!   `{"hooks": {"PreToolUse": [{"matcher": "Bash", "hooks": [{"type": "command", "command": "..."}]}]}}`
//! - `hook.json`, the older single-hook descriptor:
//!   `{"name": "...", "type": "PreToolUse", "command": "guard.sh", "interpreter": "bash"}`
//!
//! Commands are rewritten so they keep working from the generated
//! settings.json regardless of the working directory Claude Code runs in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, PathContext, Result};
use crate::paths::Paths;

pub const CANONICAL_FILE: &str = "hooks.json";
pub const LEGACY_FILE: &str = "hook.json";
pub const DEFAULT_TIMEOUT: u64 = 60;

const PLUGIN_ROOT_BRACED: &str = "${CLAUDE_PLUGIN_ROOT}";
const PLUGIN_ROOT_BARE: &str = "$CLAUDE_PLUGIN_ROOT";

/// Event type -> ordered matcher groups
pub type HookMap = BTreeMap<String, Vec<HookMatcher>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCommand {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_kind() -> String {
    "command".to_string()
}

/// `hooks.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookDeclaration {
    #[serde(default)]
    pub hooks: HookMap,
}

/// `hook.json`
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyHookDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub matcher: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Command is a shell snippet, not a script path
    #[serde(default)]
    pub inline: bool,
}

/// Parsed declaration for one hook item, whichever format it came from
#[derive(Debug, Clone)]
pub enum HookSource {
    Canonical(HookDeclaration),
    Legacy(LegacyHookDescriptor),
}

/// Read the declaration in `hook_dir`, preferring `hooks.json`.
///
/// Returns `None` when neither file exists.
pub fn read_hook_source(hook_dir: &Path) -> Result<Option<HookSource>> {
    let canonical = hook_dir.join(CANONICAL_FILE);
    if canonical.is_file() {
        return read_json(&canonical).map(|d| Some(HookSource::Canonical(d)));
    }

    let legacy = hook_dir.join(LEGACY_FILE);
    if legacy.is_file() {
        return read_json(&legacy).map(|d| Some(HookSource::Legacy(d)));
    }

    Ok(None)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).path_context("read", path)?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl HookSource {
    /// Convert into settings entries for a hook installed at `installed_dir`
    pub fn into_entries(self, paths: &Paths, installed_dir: &Path) -> HookMap {
        let root = paths.portable(installed_dir);

        match self {
            HookSource::Canonical(decl) => {
                let mut out = HookMap::new();
                for (event, groups) in decl.hooks {
                    let groups = groups
                        .into_iter()
                        .map(|group| HookMatcher {
                            matcher: group.matcher,
                            hooks: group
                                .hooks
                                .into_iter()
                                .map(|cmd| HookCommand {
                                    kind: cmd.kind,
                                    command: replace_plugin_root(&cmd.command, &root),
                                    timeout: Some(cmd.timeout.unwrap_or(DEFAULT_TIMEOUT)),
                                })
                                .collect(),
                        })
                        .collect();
                    out.insert(event, groups);
                }
                out
            }
            HookSource::Legacy(desc) => {
                let Some(command) = desc.command.as_deref() else {
                    tracing::debug!(hook = %desc.name, "legacy hook has no command, skipping");
                    return HookMap::new();
                };

                let mut command = if desc.inline {
                    command.to_string()
                } else {
                    portable_command(command, &root)
                };
                if let Some(interpreter) = desc.interpreter.as_deref().filter(|i| !i.is_empty()) {
                    command = format!("{} {}", interpreter, command);
                }

                let mut out = HookMap::new();
                out.insert(
                    desc.event,
                    vec![HookMatcher {
                        matcher: desc.matcher,
                        hooks: vec![HookCommand {
                            kind: default_kind(),
                            command,
                            timeout: Some(desc.timeout.unwrap_or(DEFAULT_TIMEOUT)),
                        }],
                    }],
                );
                out
            }
        }
    }
}

/// Append every group of `other` to `into`, event by event
pub fn merge_into(into: &mut HookMap, other: HookMap) {
    for (event, groups) in other {
        into.entry(event).or_default().extend(groups);
    }
}

/// Substitute the plugin root variable. The bare form only matches a whole
/// variable name, so `$CLAUDE_PLUGIN_ROOT_DIR` is left alone.
fn replace_plugin_root(command: &str, root: &str) -> String {
    let command = command.replace(PLUGIN_ROOT_BRACED, root);

    let mut out = String::with_capacity(command.len());
    let mut rest = command.as_str();
    while let Some(pos) = rest.find(PLUGIN_ROOT_BARE) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + PLUGIN_ROOT_BARE.len()..];
        if after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            out.push_str(PLUGIN_ROOT_BARE);
        } else {
            out.push_str(root);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Rewrite a legacy command so a relative script path becomes `<root>/<script>`
fn portable_command(command: &str, root: &str) -> String {
    let command = replace_plugin_root(command, root);
    let trimmed = command.trim_start();

    let (program, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((program, rest)) => (program, Some(rest)),
        None => (trimmed, None),
    };

    let is_relative = !program.is_empty()
        && !program.starts_with('/')
        && !program.starts_with('$')
        && !program.starts_with('~')
        && !Path::new(program).is_absolute()
        && (program.contains('/') || program.contains('.'));

    if !is_relative {
        return command;
    }

    let program = program.trim_start_matches("./");
    match rest {
        Some(rest) => format!("{}/{} {}", root, program, rest),
        None => format!("{}/{}", root, program),
    }
}
