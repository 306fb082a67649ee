//! Configuration Management Module
//!
//! Resolves where the profile store lives and imports hosts from an
//! existing OpenSSH client config.

pub mod settings;
pub mod ssh_config;

pub use settings::{
    config_dir, default_storage_path, Settings, SettingsError, FORMAT_ENV, STORAGE_ENV,
};
pub use ssh_config::{
    default_ssh_config_path, parse_ssh_config, parse_ssh_config_content, SshConfigError,
    SshConfigHost,
};
