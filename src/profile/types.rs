//! Host and group profiles

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection options shared by hosts and groups.
///
/// Every field is optional: an unset field is inherited from the enclosing
/// group chain when options are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// Raw ProxyJump value, e.g. `admin@bastion:2222,hpc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_jump: Option<String>,

    /// Keep-alive interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_alive_interval: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_host_key_checking: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_agent: Option<bool>,
}

impl SshOptions {
    /// Field names in display order
    pub const FIELDS: [&'static str; 7] = [
        "port",
        "user",
        "identity_file",
        "proxy_jump",
        "server_alive_interval",
        "strict_host_key_checking",
        "forward_agent",
    ];

    pub fn allowed_fields() -> &'static [&'static str] {
        &Self::FIELDS
    }

    /// Render one field as text; unset fields are empty.
    ///
    /// Returns `None` for a name that is not an option field.
    pub fn field(&self, name: &str) -> Option<String> {
        fn text<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        let rendered = match name {
            "port" => text(&self.port),
            "user" => text(&self.user),
            "identity_file" => text(&self.identity_file),
            "proxy_jump" => text(&self.proxy_jump),
            "server_alive_interval" => text(&self.server_alive_interval),
            "strict_host_key_checking" => text(&self.strict_host_key_checking),
            "forward_agent" => text(&self.forward_agent),
            _ => return None,
        };
        Some(rendered)
    }

    /// Fill every unset field from `fallback`.
    pub fn merge(&self, fallback: &SshOptions) -> SshOptions {
        SshOptions {
            port: self.port.or(fallback.port),
            user: self.user.clone().or_else(|| fallback.user.clone()),
            identity_file: self
                .identity_file
                .clone()
                .or_else(|| fallback.identity_file.clone()),
            proxy_jump: self.proxy_jump.clone().or_else(|| fallback.proxy_jump.clone()),
            server_alive_interval: self.server_alive_interval.or(fallback.server_alive_interval),
            strict_host_key_checking: self
                .strict_host_key_checking
                .or(fallback.strict_host_key_checking),
            forward_agent: self.forward_agent.or(fallback.forward_agent),
        }
    }

    /// ssh_config directives for every set field
    pub fn directives(&self) -> Vec<(&'static str, String)> {
        fn yes_no(flag: bool) -> String {
            let word = if flag { "yes" } else { "no" };
            word.to_string()
        }

        let mut lines = Vec::new();
        if let Some(port) = self.port {
            lines.push(("Port", port.to_string()));
        }
        if let Some(ref user) = self.user {
            lines.push(("User", user.clone()));
        }
        if let Some(ref identity_file) = self.identity_file {
            lines.push(("IdentityFile", identity_file.clone()));
        }
        if let Some(ref proxy_jump) = self.proxy_jump {
            lines.push(("ProxyJump", proxy_jump.clone()));
        }
        if let Some(interval) = self.server_alive_interval {
            lines.push(("ServerAliveInterval", interval.to_string()));
        }
        if let Some(strict) = self.strict_host_key_checking {
            lines.push(("StrictHostKeyChecking", yes_no(strict)));
        }
        if let Some(forward) = self.forward_agent {
            lines.push(("ForwardAgent", yes_no(forward)));
        }
        lines
    }
}

/// A group of hosts; groups nest through `parent_group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group: Option<u64>,
    #[serde(default)]
    pub options: SshOptions,
}

/// A saved host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: u64,
    pub label: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u64>,
    #[serde(default)]
    pub options: SshOptions,
}

/// Which collection an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryKind {
    #[default]
    Host,
    Group,
}

impl EntryKind {
    /// Store key of the collection
    pub fn key(self) -> &'static str {
        match self {
            EntryKind::Host => "host",
            EntryKind::Group => "group",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A host or a group, as returned by lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Host(Host),
    Group(Group),
}

impl Entry {
    pub fn id(&self) -> u64 {
        match self {
            Entry::Host(host) => host.id,
            Entry::Group(group) => group.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Entry::Host(host) => &host.label,
            Entry::Group(group) => &group.label,
        }
    }

    pub fn options(&self) -> &SshOptions {
        match self {
            Entry::Host(host) => &host.options,
            Entry::Group(group) => &group.options,
        }
    }

    /// The group this entry inherits from
    pub fn parent(&self) -> Option<u64> {
        match self {
            Entry::Host(host) => host.group,
            Entry::Group(group) => group.parent_group,
        }
    }

    /// Host address; groups have none.
    pub fn address(&self) -> &str {
        match self {
            Entry::Host(host) => &host.address,
            Entry::Group(_) => "",
        }
    }
}
