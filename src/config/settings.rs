//! Store location and format settings
//!
//! Storage location: ~/.sshconf/storage on macOS/Linux,
//! %APPDATA%\sshconf\storage on Windows. `SSHCONF_STORAGE` or `--storage`
//! point the CLI elsewhere.

use std::fs;
use std::path::PathBuf;

use crate::store::{Format, OpenMode, StoreOptions};

/// Environment variable overriding the store path
pub const STORAGE_ENV: &str = "SSHCONF_STORAGE";

/// Environment variable selecting the output format
pub const FORMAT_ENV: &str = "SSHCONF_FORMAT";

/// Permission bits of the store file
pub const STORAGE_MODE: u32 = 0o600;

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory holding the store: `%APPDATA%\sshconf` on Windows when known,
/// `~/.sshconf` otherwise.
pub fn config_dir() -> Result<PathBuf, SettingsError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("sshconf"));
        }
    }

    let home = dirs::home_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(home.join(".sshconf"))
}

/// Get the default store file path
pub fn default_storage_path() -> Result<PathBuf, SettingsError> {
    Ok(config_dir()?.join("storage"))
}

/// Where and how the CLI keeps its store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub storage: PathBuf,
    pub format: Format,
}

impl Settings {
    /// Use `storage` if given, the default location otherwise.
    pub fn resolve(storage: Option<PathBuf>, format: Format) -> Result<Self, SettingsError> {
        let storage = match storage {
            Some(path) => path,
            None => default_storage_path()?,
        };
        Ok(Self { storage, format })
    }

    /// Ensure the store's directory exists
    pub fn ensure_dir(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.storage.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn store_options(&self, read_only: bool) -> StoreOptions {
        let mode = if read_only {
            OpenMode::ReadOnly
        } else {
            OpenMode::Create
        };
        StoreOptions::new()
            .mode(mode)
            .format(self.format)
            .permissions(STORAGE_MODE)
    }
}
