//! Platform-specific locations for measurement configuration files.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/earshot/` (Linux), `~/Library/Application Support/earshot/` (macOS), `%APPDATA%\earshot\` (Windows)
//! - **Default file**: `earshot.toml` inside the user config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use earshot_config::paths;
//!
//! if let Some(path) = paths::find_config("studio") {
//!     println!("Using {}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "earshot";

/// File name of the configuration picked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "earshot.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the default configuration file; it may not exist.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(DEFAULT_CONFIG_FILE)
}

/// Find a configuration file by name.
///
/// Searches in the following order:
/// 1. `name` as a path (absolute or relative to the current directory)
/// 2. `name` (with `.toml` added if missing) in the user config directory
pub fn find_config(name: &str) -> Option<PathBuf> {
    find_config_in(name, &user_config_dir())
}

fn find_config_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let user_path = dir.join(filename);
    user_path.is_file().then_some(user_path)
}

/// Ensure the user config directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}
