//! Platform-specific configuration paths.

use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "BIRDEYE_CONFIG";

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/birdeye/`
/// - macOS: `~/Library/Application Support/birdeye/`
/// - Windows: `%APPDATA%\birdeye\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
///
/// `BIRDEYE_CONFIG`, when set and non-empty, takes precedence.
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}
