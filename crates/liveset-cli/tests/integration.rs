//! Integration tests for liveset-cli.
//!
//! Each test runs the built `liveset` binary against a set written to a
//! temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SET_JSON: &str = r#"{
  "tempo": 124.0,
  "tracks": [
    {
      "name": "Drums",
      "has_midi_input": true,
      "clip_slots": [{ "name": "Beat", "length": 4.0, "loop_end": 4.0 }, null, null],
      "devices": [
        {
          "name": "Glue",
          "class_name": "GlueCompressor",
          "parameters": [{ "name": "Threshold", "value": 0.5, "min": 0.0, "max": 1.0 }]
        }
      ]
    },
    {
      "name": "Bass",
      "volume": { "value": 0.6, "min": 0.2, "max": 0.8 },
      "clip_slots": [null, null]
    }
  ]
}"#;

/// Helper to get the path to the `liveset` binary built by cargo.
fn liveset_bin(settings_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_liveset"));
    // Keep the user's real settings out of the tests.
    cmd.env("LIVESET_SETTINGS", settings_dir.join("none.toml"));
    cmd.env("XDG_CONFIG_HOME", settings_dir);
    cmd.env("HOME", settings_dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_set(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("set.json");
    std::fs::write(&path, SET_JSON).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// `liveset path`
// ---------------------------------------------------------------------------

#[test]
fn cli_path_builds_parameter_path() {
    let dir = TempDir::new().unwrap();
    let output = liveset_bin(dir.path())
        .args(["path", "--track", "2", "--device", "0", "--parameter", "5"])
        .output()
        .expect("failed to run liveset path");

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "live_set tracks 2 devices 0 parameters 5");
}

#[test]
fn cli_path_mixer_prefers_volume() {
    let dir = TempDir::new().unwrap();
    let output = liveset_bin(dir.path())
        .args(["path", "--track", "1", "--volume", "--panning", "--send", "2"])
        .output()
        .unwrap();

    assert_eq!(stdout(&output).trim(), "live_set tracks 1 mixer_device volume");
}

#[test]
fn cli_path_parse_lists_segments() {
    let dir = TempDir::new().unwrap();
    let output = liveset_bin(dir.path())
        .args(["path", "--parse", "live_set tracks 0 clip_slots 3 clip"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, ["live_set", "tracks 0", "clip_slots 3", "clip"]);
}

// ---------------------------------------------------------------------------
// `liveset inspect`
// ---------------------------------------------------------------------------

#[test]
fn cli_inspect_lists_tracks_devices_and_clips() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args(["inspect", set.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("Tracks: 2"));
    assert!(out.contains("Drums"));
    assert!(out.contains("Glue (GlueCompressor, on)"));
    assert!(out.contains("slot 0: Beat"));
}

#[test]
fn cli_inspect_json_is_parseable() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args(["inspect", set.to_str().unwrap(), "--json", "--stats"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["tracks"][1]["name"], "Bass");
    assert_eq!(value["tracks"][1]["volume"], 0.6);
    assert_eq!(value["tracks"][0]["clips"][0]["name"], "Beat");
    assert!(value["stats"]["total_operations"].as_u64().unwrap() > 0);
}

#[test]
fn cli_inspect_rejects_out_of_range_track() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args(["inspect", set.to_str().unwrap(), "--track", "9"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("track index 9"));
}

// ---------------------------------------------------------------------------
// `liveset mix` / `liveset notes`
// ---------------------------------------------------------------------------

#[test]
fn cli_mix_clamps_and_saves() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let out_path = dir.path().join("mixed.json");
    let output = liveset_bin(dir.path())
        .args(["mix", set.to_str().unwrap(), "--volume", "1=0.95", "--pan", "0=-0.5", "-o"])
        .arg(&out_path)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("volume track 1 -> 0.8000"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(saved["tracks"][1]["volume"]["value"], 0.8);
    assert_eq!(saved["tracks"][0]["panning"]["value"], -0.5);
}

#[test]
fn cli_mix_reports_skipped_targets() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args(["mix", set.to_str().unwrap(), "--volume", "5=0.5", "--dry-run"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stdout(&output).contains("volume track 5 skipped"));
}

#[test]
fn cli_notes_writes_into_clip() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args([
            "notes",
            set.to_str().unwrap(),
            "--track",
            "0",
            "--slot",
            "0",
            "-n",
            "36:0:0.5",
            "-n",
            "38:1:0.5:90",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Wrote 2 note(s)"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&set).unwrap()).unwrap();
    let notes = saved["tracks"][0]["clip_slots"][0]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1]["velocity"], 90);
}

#[test]
fn cli_notes_empty_slot_without_create_fails() {
    let dir = TempDir::new().unwrap();
    let set = write_set(&dir);
    let output = liveset_bin(dir.path())
        .args(["notes", set.to_str().unwrap(), "--track", "1", "--slot", "0", "-n", "60:0:1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `liveset config`
// ---------------------------------------------------------------------------

#[test]
fn cli_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("settings.toml");

    let init = liveset_bin(dir.path())
        .args(["config", "init"])
        .arg(&settings)
        .output()
        .unwrap();
    assert!(init.status.success());
    assert!(settings.is_file());

    let show = liveset_bin(dir.path())
        .args(["config", "show", "--settings"])
        .arg(&settings)
        .output()
        .unwrap();
    assert!(show.status.success());
    assert!(stdout(&show).contains("ttl_ms = 1000"));

    let again = liveset_bin(dir.path())
        .args(["config", "init"])
        .arg(&settings)
        .output()
        .unwrap();
    assert!(!again.status.success(), "init must not overwrite without --force");
}

#[test]
fn cli_config_validate_reports_bad_values() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("bad.toml");
    std::fs::write(&settings, "[cache]\nttl_ms = 0\n").unwrap();

    let output = liveset_bin(dir.path())
        .args(["config", "validate", "--settings"])
        .arg(&settings)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cache.ttl_ms"));
}
