//! `host`, `group` and `list` commands

use clap::{ArgAction, Args, Subcommand};
use tracing::info;

use super::CommandError;
use crate::profile::{EntryKind, Group, Host, ProfileError, ProfileRepository, SshOptions};
use crate::store::PersistentDict;

/// Connection option flags shared by `host add` and `group add`
#[derive(Debug, Clone, Default, Args)]
pub struct OptionArgs {
    /// SSH port
    #[arg(long)]
    pub port: Option<u16>,

    /// Login user
    #[arg(long)]
    pub user: Option<String>,

    /// Private key path
    #[arg(long, value_name = "PATH")]
    pub identity_file: Option<String>,

    /// Jump hosts, e.g. admin@bastion:2222
    #[arg(long, value_name = "HOSTS")]
    pub proxy_jump: Option<String>,

    /// Keep-alive interval in seconds
    #[arg(long, value_name = "SECONDS")]
    pub server_alive_interval: Option<u32>,

    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub strict_host_key_checking: Option<bool>,

    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub forward_agent: Option<bool>,
}

impl From<OptionArgs> for SshOptions {
    fn from(args: OptionArgs) -> Self {
        SshOptions {
            port: args.port,
            user: args.user,
            identity_file: args.identity_file,
            proxy_jump: args.proxy_jump,
            server_alive_interval: args.server_alive_interval,
            strict_host_key_checking: args.strict_host_key_checking,
            forward_agent: args.forward_agent,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum HostCommands {
    /// Add a host
    Add {
        label: String,
        address: String,

        /// Group (id or name) the host inherits options from
        #[arg(long, value_name = "ID or NAME")]
        group: Option<String>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Remove a host
    Rm {
        #[arg(value_name = "ID or NAME")]
        id_or_name: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum GroupCommands {
    /// Add a group
    Add {
        label: String,

        /// Parent group (id or name)
        #[arg(long, value_name = "ID or NAME")]
        parent: Option<String>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Remove a group no host or group refers to
    Rm {
        #[arg(value_name = "ID or NAME")]
        id_or_name: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// List groups instead of hosts
    #[arg(short = 'G', long = "groups")]
    pub groups: bool,
}

pub fn handle_host(dict: &mut PersistentDict, cmd: HostCommands) -> Result<String, CommandError> {
    let mut repo = ProfileRepository::load(dict)?;
    match cmd {
        HostCommands::Add {
            label,
            address,
            group,
            options,
        } => {
            let group = group.as_deref().map(|g| repo.group_id(g)).transpose()?;
            let id = repo.next_id(EntryKind::Host);
            repo.save_host(Host {
                id,
                label: label.clone(),
                address,
                group,
                options: options.into(),
            })?;
            info!("Added host {} ({})", id, label);
            Ok(format!("Added host {id} ({label})\n"))
        }
        HostCommands::Rm { id_or_name } => {
            let id = repo.get_relation(EntryKind::Host, &id_or_name)?.id();
            let removed = repo.remove_host(id).ok_or(ProfileError::NotFound {
                kind: EntryKind::Host,
                query: id_or_name,
            })?;
            info!("Removed host {} ({})", removed.id, removed.label);
            Ok(format!("Removed host {} ({})\n", removed.id, removed.label))
        }
    }
}

pub fn handle_group(dict: &mut PersistentDict, cmd: GroupCommands) -> Result<String, CommandError> {
    let mut repo = ProfileRepository::load(dict)?;
    match cmd {
        GroupCommands::Add {
            label,
            parent,
            options,
        } => {
            let parent_group = parent.as_deref().map(|g| repo.group_id(g)).transpose()?;
            let id = repo.next_id(EntryKind::Group);
            repo.save_group(Group {
                id,
                label: label.clone(),
                parent_group,
                options: options.into(),
            })?;
            info!("Added group {} ({})", id, label);
            Ok(format!("Added group {id} ({label})\n"))
        }
        GroupCommands::Rm { id_or_name } => {
            let id = repo.group_id(&id_or_name)?;
            let removed = repo.remove_group(id)?.ok_or(ProfileError::NotFound {
                kind: EntryKind::Group,
                query: id_or_name,
            })?;
            info!("Removed group {} ({})", removed.id, removed.label);
            Ok(format!("Removed group {} ({})\n", removed.id, removed.label))
        }
    }
}

/// One line per entry: id, label, then address (hosts) or parent (groups).
pub fn list(dict: &mut PersistentDict, args: &ListArgs) -> Result<String, CommandError> {
    let repo = ProfileRepository::load(dict)?;
    let groups = repo.groups();
    let group_label = |id: Option<u64>| {
        id.and_then(|id| groups.iter().find(|g| g.id == id))
            .map(|g| g.label.clone())
            .unwrap_or_default()
    };

    let rows: Vec<(u64, String, String)> = if args.groups {
        groups
            .iter()
            .map(|g| (g.id, g.label.clone(), group_label(g.parent_group)))
            .collect()
    } else {
        repo.hosts()
            .iter()
            .map(|h| {
                let detail = match group_label(h.group) {
                    group if group.is_empty() => h.address.clone(),
                    group => format!("{} [{}]", h.address, group),
                };
                (h.id, h.label.clone(), detail)
            })
            .collect()
    };

    let width = rows.iter().map(|(_, label, _)| label.len()).max().unwrap_or(0);
    let mut output = String::new();
    for (id, label, detail) in rows {
        let line = format!("{id:>4}  {label:<width$}  {detail}");
        output.push_str(line.trim_end());
        output.push('\n');
    }
    Ok(output)
}
