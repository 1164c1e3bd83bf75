use super::*;
use tempfile::tempdir;

fn read_json(path: &Path) -> Value {
    let bytes = std::fs::read(path).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn installs_into_a_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".claude").join("settings.local.json");

    let installed = install_completion_hook(&path).unwrap();

    let value = read_json(&path);
    let stop = value["hooks"]["Stop"].as_array().unwrap();
    assert_eq!(stop.len(), 1);
    assert_eq!(stop[0]["hooks"][0]["command"], HOOK_COMMAND);

    installed.restore().unwrap();
    assert!(!path.exists());
}

#[test]
fn preserves_other_top_level_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");
    std::fs::write(&path, r#"{"otherKey": "value", "hooks": {"Stop": []}}"#).unwrap();

    install_completion_hook(&path).unwrap();

    let value = read_json(&path);
    assert_eq!(value["otherKey"], "value");
}

#[test]
fn is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");

    install_completion_hook(&path).unwrap();
    let first = std::fs::read(&path).unwrap();

    let installed_again = install_completion_hook(&path).unwrap();
    let value = read_json(&path);
    let stop = value["hooks"]["Stop"].as_array().unwrap();
    assert_eq!(stop.len(), 1);

    installed_again.restore().unwrap();
    let restored = std::fs::read(&path).unwrap();
    assert_eq!(restored, first);
}

#[test]
fn rejects_legacy_flat_entry_without_mutating() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");
    let original = r#"{"hooks": {"Stop": [{"matcher": "", "command": "legacy-command"}]}}"#;
    std::fs::write(&path, original).unwrap();

    let err = install_completion_hook(&path).unwrap_err();
    assert!(matches!(err, HookError::LegacyEntry(_)));

    let unchanged = std::fs::read_to_string(&path).unwrap();
    assert_eq!(unchanged, original);
}

#[test]
fn rejects_non_string_matcher_without_mutating() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");
    let original = r#"{"hooks": {"Stop": [{"matcher": 1, "hooks": []}]}}"#;
    std::fs::write(&path, original).unwrap();

    let err = install_completion_hook(&path).unwrap_err();
    assert!(matches!(err, HookError::LegacyEntry(_)));
}

#[test]
fn restore_recreates_original_byte_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");
    let original = r#"{"hooks": {"Stop": [{"matcher": "foo", "hooks": [{"type": "command", "command": "echo hi"}]}]}}"#;
    std::fs::write(&path, original).unwrap();

    let installed = install_completion_hook(&path).unwrap();
    installed.restore().unwrap();

    let restored = std::fs::read_to_string(&path).unwrap();
    assert_eq!(restored, original);
}

#[cfg(unix)]
#[test]
fn file_mode_is_0600() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.local.json");

    install_completion_hook(&path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
