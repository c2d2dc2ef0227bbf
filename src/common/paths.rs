//! Configuration and run log locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/flinger/`
//! - macOS: `~/Library/Application Support/flinger/`
//! - Windows: `%APPDATA%\flinger\`

use std::path::PathBuf;

/// Project name used for platform directories
const APP_NAME: &str = "flinger";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Directory a run log lands in when neither the CLI nor the config file
/// names one: the current working directory
pub fn default_log_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
