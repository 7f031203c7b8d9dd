//! Platform-specific paths for settings and saved live sets.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/liveset/` (Linux), `~/Library/Application Support/liveset/` (macOS), `%APPDATA%\liveset\` (Windows)
//! - **Settings file**: `<user config>/settings.toml`
//! - **Saved sets**: `<user config>/sets/`, JSON snapshots of an in-memory host
//!
//! # Example
//!
//! ```rust,no_run
//! use liveset_config::paths;
//!
//! let settings = paths::load_or_default(None).unwrap();
//! println!("ttl: {} ms", settings.cache.ttl_ms);
//!
//! if let Some(path) = paths::find_set("rehearsal") {
//!     println!("Found set at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::settings::Settings;

/// Application name used for directory paths.
const APP_NAME: &str = "liveset";

/// File name of the user settings.
const SETTINGS_FILE: &str = "settings.toml";

/// Subdirectory name for saved sets.
const SETS_SUBDIR: &str = "sets";

/// Environment variable that overrides the settings file location.
pub const SETTINGS_ENV: &str = "LIVESET_SETTINGS";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}

/// Returns the user-specific saved sets directory.
pub fn user_sets_dir() -> PathBuf {
    user_config_dir().join(SETS_SUBDIR)
}

/// Locate the settings file.
///
/// Order: the `LIVESET_SETTINGS` variable, then the default user path. Only
/// existing files are returned.
pub fn find_settings() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(SETTINGS_ENV).map(PathBuf::from)
        && path.is_file()
    {
        return Some(path);
    }

    let path = default_settings_path();
    path.is_file().then_some(path)
}

/// Load settings from `explicit`, or from [`find_settings`], or fall back to
/// defaults when no file exists.
///
/// An explicit path that does not exist is an error; a missing default file is
/// not.
pub fn load_or_default(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::SettingsNotFound(path.display().to_string()));
        }
        return Settings::load(path);
    }

    match find_settings() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Settings::load(path)
        }
        None => Ok(Settings::default()),
    }
}

/// Find a saved set by name.
///
/// The name can be a path to an existing file, or a set name (with or
/// without `.json`) looked up in [`user_sets_dir`].
pub fn find_set(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{name}.json")
    };

    let user_path = user_sets_dir().join(filename);
    user_path.is_file().then_some(user_path)
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}
