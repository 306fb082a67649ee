//! OpenSSH client config import
//!
//! Reads the `Host` blocks of an ssh_config file and maps the directives
//! sshconf understands onto [`SshOptions`]. Pattern-only blocks (`Host *`,
//! `Host dev-*`) are skipped since they describe no concrete machine.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::profile::SshOptions;

/// One concrete `Host` block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfigHost {
    /// First non-pattern name on the `Host` line
    pub alias: String,
    /// `HostName`, when the block sets one
    pub hostname: Option<String>,
    pub options: SshOptions,
}

impl SshConfigHost {
    fn named(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            ..Default::default()
        }
    }

    /// Address to connect to: `HostName`, else the alias itself.
    pub fn effective_hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.alias)
    }

    fn apply(&mut self, keyword: &str, argument: &str) {
        let options = &mut self.options;
        match keyword {
            "hostname" => self.hostname = Some(argument.to_string()),
            "user" => options.user = Some(argument.to_string()),
            "port" => options.port = argument.parse().ok(),
            "identityfile" => options.identity_file = Some(expand_home(argument)),
            "proxyjump" if argument.eq_ignore_ascii_case("none") => options.proxy_jump = None,
            "proxyjump" => options.proxy_jump = Some(argument.to_string()),
            "serveraliveinterval" => options.server_alive_interval = argument.parse().ok(),
            "stricthostkeychecking" => options.strict_host_key_checking = yes_no(argument),
            "forwardagent" => options.forward_agent = yes_no(argument),
            other => debug!("Ignoring ssh_config directive {:?} for {}", other, self.alias),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SshConfigError {
    #[error("Cannot locate the home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `~/.ssh/config`
pub fn default_ssh_config_path() -> Result<PathBuf, SshConfigError> {
    let home = dirs::home_dir().ok_or(SshConfigError::NoHomeDir)?;
    Ok(home.join(".ssh").join("config"))
}

/// Read and parse `path` (default `~/.ssh/config`). A missing file has no
/// hosts.
pub fn parse_ssh_config(path: Option<&Path>) -> Result<Vec<SshConfigHost>, SshConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_ssh_config_path()?,
    };

    match fs::read_to_string(&path) {
        Ok(text) => Ok(parse_ssh_config_content(&text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No ssh_config at {:?}", path);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse ssh_config text. Directives before the first `Host` line and inside
/// pattern-only blocks are dropped.
pub fn parse_ssh_config_content(content: &str) -> Vec<SshConfigHost> {
    let mut hosts: Vec<SshConfigHost> = Vec::new();
    // None while inside a pattern-only block
    let mut current: Option<SshConfigHost> = None;

    for (keyword, argument) in content.lines().filter_map(directive) {
        if keyword == "host" {
            hosts.extend(current.take());
            current = argument
                .split_whitespace()
                .find(|name| !is_pattern(name))
                .map(SshConfigHost::named);
        } else if let Some(host) = current.as_mut() {
            host.apply(&keyword, argument);
        }
    }
    hosts.extend(current);
    hosts
}

/// Split a line into a lowercased keyword and its argument.
///
/// Accepts `Keyword Argument`, `Keyword=Argument` and `Keyword = Argument`.
/// Blank lines, comments and keywords without an argument yield `None`.
fn directive(line: &str) -> Option<(String, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let (keyword, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let argument = rest.strip_prefix('=').unwrap_or(rest).trim();
    if argument.is_empty() {
        return None;
    }
    Some((keyword.to_ascii_lowercase(), argument))
}

fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?', '!'])
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

fn yes_no(argument: &str) -> Option<bool> {
    match argument.to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_forms() {
        assert_eq!(directive("  Port 22"), Some(("port".to_string(), "22")));
        assert_eq!(directive("HostName=a.example"), Some(("hostname".to_string(), "a.example")));
        assert_eq!(directive("User = deploy "), Some(("user".to_string(), "deploy")));
        assert_eq!(
            directive("IdentityFile /keys/a=b"),
            Some(("identityfile".to_string(), "/keys/a=b"))
        );
        assert_eq!(directive("# Port 22"), None);
        assert_eq!(directive("Compression"), None);
        assert_eq!(directive(""), None);
    }

    #[test]
    fn test_blocks_and_patterns() {
        let content = "\
User everyone

Host *
    ServerAliveInterval 15

Host staging-? !prod-*
    User qa

Host app
    HostName app.internal
    User deploy
    Port 2022

Host cache
    Port 6379x
";
        let hosts = parse_ssh_config_content(content);
        assert_eq!(hosts.len(), 2);

        assert_eq!(hosts[0].alias, "app");
        assert_eq!(hosts[0].effective_hostname(), "app.internal");
        assert_eq!(hosts[0].options.user.as_deref(), Some("deploy"));
        assert_eq!(hosts[0].options.port, Some(2022));
        assert_eq!(hosts[0].options.server_alive_interval, None);

        assert_eq!(hosts[1].alias, "cache");
        assert_eq!(hosts[1].effective_hostname(), "cache");
        assert_eq!(hosts[1].options.port, None);
        assert_eq!(hosts[1].options.user, None);
    }

    #[test]
    fn test_multiple_names_take_first_concrete() {
        let hosts = parse_ssh_config_content("Host *.corp bastion jump\n  User ops\n");
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].alias, "bastion");
        assert_eq!(hosts[0].effective_hostname(), "bastion");
    }

    #[test]
    fn test_flags_and_jump_hosts() {
        let content = "\
Host hpc
    HostName=login.cluster.example
    ProxyJump admin@jump.example.com:2222,gateway
    StrictHostKeyChecking no
    ForwardAgent yes
    ServerAliveInterval 30

Host direct
    ProxyJump none
    ForwardAgent maybe
";
        let hosts = parse_ssh_config_content(content);
        let hpc = &hosts[0].options;
        assert_eq!(hosts[0].hostname.as_deref(), Some("login.cluster.example"));
        assert_eq!(hpc.proxy_jump.as_deref(), Some("admin@jump.example.com:2222,gateway"));
        assert_eq!(hpc.strict_host_key_checking, Some(false));
        assert_eq!(hpc.forward_agent, Some(true));
        assert_eq!(hpc.server_alive_interval, Some(30));

        assert_eq!(hosts[1].options.proxy_jump, None);
        assert_eq!(hosts[1].options.forward_agent, None);
    }

    #[test]
    fn test_identity_file_expands_home() {
        let hosts = parse_ssh_config_content("Host a\n  IdentityFile ~/.ssh/id_ed25519\n");
        let identity = hosts[0].options.identity_file.as_deref().unwrap();
        match dirs::home_dir() {
            Some(home) => assert!(identity.starts_with(&*home.to_string_lossy())),
            None => assert_eq!(identity, "~/.ssh/id_ed25519"),
        }
        assert!(identity.ends_with("id_ed25519"));
    }

    #[test]
    fn test_missing_file_has_no_hosts() {
        let temp = tempfile::tempdir().unwrap();
        let hosts = parse_ssh_config(Some(&temp.path().join("config"))).unwrap();
        assert!(hosts.is_empty());
    }
}
