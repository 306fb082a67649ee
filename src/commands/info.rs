//! `info` command: show the effective options of a host or group

use clap::Args;

use super::{CommandError, FieldTable};
use crate::profile::{merged_options, Entry, EntryKind, ProfileRepository, SshOptions};
use crate::store::PersistentDict;

#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    /// Show info about group
    #[arg(short = 'G', long = "group", conflicts_with = "host")]
    pub group: bool,

    /// Show info about host
    #[arg(short = 'H', long = "host")]
    pub host: bool,

    /// Do not merge configs
    #[arg(short = 'M', long)]
    pub no_merge: bool,

    /// Show info in ssh_config format
    #[arg(long)]
    pub ssh: bool,

    #[arg(value_name = "ID or NAME")]
    pub id_or_name: String,
}

impl InfoArgs {
    pub fn kind(&self) -> EntryKind {
        if self.group {
            EntryKind::Group
        } else {
            EntryKind::Host
        }
    }
}

pub fn run(dict: &mut PersistentDict, args: &InfoArgs) -> Result<String, CommandError> {
    let repo = ProfileRepository::load(dict)?;
    let entry = repo.get_relation(args.kind(), &args.id_or_name)?;

    let options = if args.no_merge {
        entry.options().clone()
    } else {
        merged_options(&entry, repo.groups())?
    };

    if args.ssh {
        Ok(render_ssh_block(&entry, &options))
    } else {
        Ok(prepare_fields(&options, &entry).to_string())
    }
}

/// Option fields in display order, plus a trailing `address` field.
pub fn prepare_fields(options: &SshOptions, entry: &Entry) -> FieldTable {
    let mut table = FieldTable::new();
    for name in SshOptions::allowed_fields() {
        table.push(*name, options.field(name).unwrap_or_default());
    }
    table.push("address", entry.address());
    table
}

/// The entry as an ssh_config `Host` block
pub fn render_ssh_block(entry: &Entry, options: &SshOptions) -> String {
    let mut block = format!("Host {}\n", entry.label());
    if !entry.address().is_empty() {
        block.push_str(&format!("    HostName {}\n", entry.address()));
    }
    for (directive, value) in options.directives() {
        block.push_str(&format!("    {directive} {value}\n"));
    }
    block
}
