//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};

use liveset_config::{Settings, find_set, load_or_default};
use liveset_core::{LiveAccess, MemoryHost, Note};

/// Parse an `index=value` string for clap's `value_parser`.
pub fn parse_target(s: &str) -> Result<(i64, f64), String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid target format: '{s}' (expected index=value)"))?;
    let index = index
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("Invalid index in '{s}': {e}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid value in '{s}': {e}"))?;
    Ok((index, value))
}

/// Parse a `pitch:start:duration[:velocity]` note for clap's `value_parser`.
///
/// Range checks are left to the access layer so that its error messages
/// reach the user unchanged.
pub fn parse_note(s: &str) -> Result<Note, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!(
            "Invalid note format: '{s}' (expected pitch:start:duration[:velocity])"
        ));
    }
    let pitch = parts[0]
        .parse::<u8>()
        .map_err(|e| format!("Invalid pitch in '{s}': {e}"))?;
    let start = parts[1]
        .parse::<f64>()
        .map_err(|e| format!("Invalid start in '{s}': {e}"))?;
    let duration = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("Invalid duration in '{s}': {e}"))?;
    let mut note = Note::new(pitch, start, duration);
    if let Some(velocity) = parts.get(3) {
        let velocity = velocity
            .parse::<u8>()
            .map_err(|e| format!("Invalid velocity in '{s}': {e}"))?;
        note = note.with_velocity(velocity);
    }
    Ok(note)
}

/// Resolve a set by name or path.
pub fn resolve_set(name: &str) -> anyhow::Result<PathBuf> {
    find_set(name).ok_or_else(|| {
        anyhow::anyhow!("Set '{name}' not found. Pass a file path or the name of a saved set.")
    })
}

/// Load settings and a saved set, and wire them into an access layer.
pub fn open_set(
    name: &str,
    settings: Option<&Path>,
) -> anyhow::Result<(LiveAccess<MemoryHost>, PathBuf)> {
    let path = resolve_set(name)?;
    let settings: Settings = load_or_default(settings)?;
    let host = MemoryHost::load(&path)?;
    tracing::debug!(set = %path.display(), "opened set");
    Ok((LiveAccess::new(host, settings.access_config()?), path))
}

/// Write the host's current set back out as pretty JSON.
pub fn save_set(access: &LiveAccess<MemoryHost>, path: &Path) -> anyhow::Result<()> {
    let json = access.host().with_set(serde_json::to_string_pretty)?;
    std::fs::write(path, json)?;
    println!("Saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targets() {
        assert_eq!(parse_target("2=0.5"), Ok((2, 0.5)));
        assert_eq!(parse_target("-1 = -0.25"), Ok((-1, -0.25)));
        assert!(parse_target("2").is_err());
        assert!(parse_target("x=1").is_err());
    }

    #[test]
    fn parses_notes() {
        let note = parse_note("60:0.5:1").unwrap();
        assert_eq!((note.pitch, note.start, note.duration, note.velocity), (60, 0.5, 1.0, 100));

        let note = parse_note("36:0:0.25:90").unwrap();
        assert_eq!(note.velocity, 90);

        assert!(parse_note("60:0").is_err());
        assert!(parse_note("300:0:1").is_err());
    }
}
