//! `import` command: copy hosts from an OpenSSH client config

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Args;
use tracing::{debug, info};

use super::CommandError;
use crate::config::parse_ssh_config;
use crate::profile::{EntryKind, Host, ProfileRepository};
use crate::store::PersistentDict;

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// SSH config file (default: ~/.ssh/config)
    pub path: Option<PathBuf>,

    /// Put imported hosts into this group (id or name)
    #[arg(long, value_name = "ID or NAME")]
    pub group: Option<String>,
}

/// Add every parsed host whose alias is not already a host label.
pub fn run(dict: &mut PersistentDict, args: &ImportArgs) -> Result<String, CommandError> {
    let parsed = parse_ssh_config(args.path.as_deref())?;
    let mut repo = ProfileRepository::load(dict)?;
    let group = args
        .group
        .as_deref()
        .map(|g| repo.group_id(g))
        .transpose()?;

    let mut known: HashSet<String> = repo.hosts().iter().map(|h| h.label.clone()).collect();
    let mut imported = 0;
    let mut skipped = 0;

    for parsed_host in parsed {
        if !known.insert(parsed_host.alias.clone()) {
            debug!("Skipping {}: already present", parsed_host.alias);
            skipped += 1;
            continue;
        }

        let id = repo.next_id(EntryKind::Host);
        let address = parsed_host.effective_hostname().to_string();
        repo.save_host(Host {
            id,
            label: parsed_host.alias,
            address,
            group,
            options: parsed_host.options,
        })?;
        imported += 1;
    }

    info!("Imported {} hosts, skipped {}", imported, skipped);
    Ok(format!(
        "Imported {imported} hosts, skipped {skipped} already present\n"
    ))
}
