// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion-hook installer (component E): idempotent edit of a
//! user-scoped settings file to install a signal-on-stop hook, with a
//! restore closure that reverts the edit byte-for-byte (§4.5).
//!
//! Grounded on the teacher's (now-removed, see DESIGN.md)
//! `prepare_agent_settings`/`inject_hooks` read-modify-write-over-
//! `serde_json::Value` idiom, and on the write-to-temp-then-rename atomic
//! swap the teacher used for its WAL writers.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// The shell one-liner installed as the mush completion hook (§4.5
/// "Schema output" — creates `$MUSH_SIGNAL_DIR/complete` when that env var
/// is non-empty).
pub const HOOK_COMMAND: &str = r#"test -n "$MUSH_SIGNAL_DIR" && touch "$MUSH_SIGNAL_DIR/complete""#;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("legacy hook entry present, refusing to mutate {0}")]
    LegacyEntry(PathBuf),
    #[error("malformed settings file {0}: {1}")]
    Malformed(PathBuf, String),
    #[error("io error on {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// An installed hook and the means to undo it.
pub struct InstalledHook {
    path: PathBuf,
    /// Byte-for-byte original content, or `None` if the file didn't exist
    /// before this install.
    original: Option<Vec<u8>>,
}

impl InstalledHook {
    /// Restore the settings file to its pre-install state (§4.5
    /// "Restore", §8 round-trip law).
    pub fn restore(&self) -> Result<(), HookError> {
        match &self.original {
            Some(bytes) => std::fs::write(&self.path, bytes)
                .map_err(|e| HookError::Io(self.path.clone(), e)),
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(HookError::Io(self.path.clone(), e)),
            },
        }
    }
}

/// Default path for an assistant's user-scoped settings file
/// (`./.{dot_dir}/settings.local.json`, §4.5).
pub fn settings_path(workspace: &Path, dot_dir: &str) -> PathBuf {
    workspace
        .join(format!(".{dot_dir}"))
        .join("settings.local.json")
}

/// Install the mush completion hook into `path`, creating the file (and
/// its parent directory) if absent. Idempotent: installing twice against
/// an unchanged file leaves exactly one mush-installed entry. Rejects
/// (without mutating) if an existing `Stop` entry is in the legacy
/// `{matcher, command}` flat form, or carries a non-string `matcher`
/// (§4.5 "Legacy rejection"; the reject-without-mutation dialect is the
/// one chosen here — see DESIGN.md).
pub fn install_completion_hook(path: &Path) -> Result<InstalledHook, HookError> {
    let original = match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(HookError::Io(path.to_path_buf(), e)),
    };

    let mut root: Value = match &original {
        Some(bytes) => serde_json::from_slice(bytes)
            .map_err(|e| HookError::Malformed(path.to_path_buf(), e.to_string()))?,
        None => json!({}),
    };

    let Some(root_obj) = root.as_object_mut() else {
        return Err(HookError::Malformed(
            path.to_path_buf(),
            "settings file is not a JSON object".to_string(),
        ));
    };
    let hooks = root_obj.entry("hooks").or_insert_with(|| json!({}));
    let Some(hooks_obj) = hooks.as_object_mut() else {
        return Err(HookError::Malformed(
            path.to_path_buf(),
            "hooks is not an object".to_string(),
        ));
    };
    let stop = hooks_obj.entry("Stop").or_insert_with(|| json!([]));
    let stop_array = stop.as_array_mut().ok_or_else(|| {
        HookError::Malformed(path.to_path_buf(), "hooks.Stop is not an array".to_string())
    })?;

    let mut already_installed = false;
    for entry in stop_array.iter() {
        if is_legacy_entry(entry) {
            return Err(HookError::LegacyEntry(path.to_path_buf()));
        }
        if entry_contains_hook_command(entry, HOOK_COMMAND) {
            already_installed = true;
        }
    }

    if !already_installed {
        stop_array.push(json!({
            "matcher": "",
            "hooks": [{ "type": "command", "command": HOOK_COMMAND }],
        }));
    }

    let serialized = serde_json::to_vec_pretty(&root)
        .map_err(|e| HookError::Malformed(path.to_path_buf(), e.to_string()))?;
    write_atomically(path, &serialized)?;

    Ok(InstalledHook {
        path: path.to_path_buf(),
        original,
    })
}

/// Legacy dialect: a flat `{matcher, command}` entry (no nested `hooks`
/// array), or any entry whose `matcher` isn't a string.
fn is_legacy_entry(entry: &Value) -> bool {
    let Some(obj) = entry.as_object() else {
        return true;
    };
    if obj.contains_key("command") && !obj.contains_key("hooks") {
        return true;
    }
    if let Some(matcher) = obj.get("matcher") {
        if !matcher.is_string() {
            return true;
        }
    }
    false
}

fn entry_contains_hook_command(entry: &Value, command: &str) -> bool {
    entry
        .get("hooks")
        .and_then(Value::as_array)
        .map(|hooks| {
            hooks
                .iter()
                .any(|h| h.get("command").and_then(Value::as_str) == Some(command))
        })
        .unwrap_or(false)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), HookError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HookError::Io(parent.to_path_buf(), e))?;
        #[cfg(unix)]
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| HookError::Io(parent.to_path_buf(), e))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, bytes).map_err(|e| HookError::Io(tmp_path.clone(), e))?;
    #[cfg(unix)]
    std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| HookError::Io(tmp_path.clone(), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| HookError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
