//! Integration tests for liveset-config.
//!
//! These tests verify end-to-end functionality across modules.

use liveset_config::{ConfigError, Settings, load_or_default};
use liveset_core::{
    EntityPath, LiveAccess, MemoryHost, SetModel, TrackModel, ValidationError as IndexError,
    VerifyPolicy,
};
use tempfile::TempDir;

fn two_tracks() -> MemoryHost {
    let mut set = SetModel::default();
    set.tracks.push(TrackModel::audio("Vox"));
    set.tracks.push(TrackModel::midi("Keys"));
    MemoryHost::new(set)
}

/// Settings saved to disk load back unchanged.
#[test]
fn test_settings_file_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("nested").join("settings.toml");

    let mut settings = Settings::default();
    settings.cache.ttl_ms = 400;
    settings.cache.max_age_ms = 1600;
    settings.validation.verify = VerifyPolicy::FailClosed;
    settings.save(&path).expect("should save settings");

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("verify = \"fail-closed\""), "got:\n{text}");

    let loaded = Settings::load(&path).expect("should load settings");
    assert_eq!(loaded, settings);
    assert_eq!(load_or_default(Some(&path)).unwrap(), settings);
}

/// A file with a syntax error reports a parse failure, not a panic.
#[test]
fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.toml");
    std::fs::write(&path, "[cache\nttl_ms = ").unwrap();

    assert!(matches!(Settings::load(&path), Err(ConfigError::TomlParse(_))));
}

/// Loading a path that does not exist surfaces the I/O error with the path.
#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

/// The verify policy in the file reaches the access layer's validator.
#[test]
fn test_settings_drive_access_layer() {
    let toml = "[validation]\nverify = \"fail-closed\"\n[log]\ncapacity = 8";
    let settings = Settings::from_toml(toml).unwrap();
    let access = LiveAccess::new(two_tracks(), settings.access_config().unwrap());
    assert_eq!(access.validator().policy(), VerifyPolicy::FailClosed);

    access.host().fail_path(&EntityPath::live_set());
    let err = access
        .validator()
        .validate_track_index(access.host(), 0)
        .unwrap_err();
    assert!(matches!(err, IndexError::Unverified { .. }));

    for _ in 0..20 {
        access.tracks().get_track_state(0);
    }
    assert!(access.log().records().count() <= 8);
}

/// Invalid numbers are rejected before they reach the core.
#[test]
fn test_invalid_settings_rejected() {
    let settings = Settings::from_toml("[cache]\nttl_ms = 0\n[retry]\nmax_attempts = 0").unwrap();
    let err = settings.access_config().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("cache.ttl_ms"), "got: {msg}");
    assert!(msg.contains("retry.max_attempts"), "got: {msg}");
}
