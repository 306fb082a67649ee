//! CLI command handlers
//!
//! Every command runs against one [`PersistentDict`] opened through
//! [`PersistentDict::scoped`], so the store is closed exactly once whatever
//! the handler returns. Handlers return the text to print.

pub mod entries;
pub mod import;
pub mod info;

use std::fmt;

use clap::Subcommand;
use thiserror::Error;

use crate::config::{Settings, SettingsError, SshConfigError};
use crate::profile::ProfileError;
use crate::store::{PersistentDict, StoreError};

pub use entries::{GroupCommands, HostCommands, ListArgs, OptionArgs};
pub use import::ImportArgs;
pub use info::InfoArgs;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to read SSH config: {0}")]
    SshConfig(#[from] SshConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show info about host or group
    Info(InfoArgs),

    /// Manage hosts
    #[command(subcommand)]
    Host(HostCommands),

    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommands),

    /// List hosts or groups
    List(ListArgs),

    /// Import hosts from an OpenSSH client config
    Import(ImportArgs),
}

impl Command {
    /// Commands that never write the store
    pub fn is_read_only(&self) -> bool {
        matches!(self, Command::Info(_) | Command::List(_))
    }
}

/// Run `command` against the store described by `settings`.
pub fn run(settings: &Settings, command: Command) -> Result<String, CommandError> {
    let read_only = command.is_read_only();
    if !read_only {
        settings.ensure_dir()?;
    }

    PersistentDict::scoped(
        &settings.storage,
        settings.store_options(read_only),
        |dict| match command {
            Command::Info(args) => info::run(dict, &args),
            Command::Host(cmd) => entries::handle_host(dict, cmd),
            Command::Group(cmd) => entries::handle_group(dict, cmd),
            Command::List(args) => entries::list(dict, &args),
            Command::Import(args) => import::run(dict, &args),
        },
    )
}

/// Two-column key/value listing, one pair per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    rows: Vec<(String, String)>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.rows.push((key.into(), value.into()));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(key, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for FieldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in &self.rows {
            let line = format!("{key:<width$}  {value}");
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
