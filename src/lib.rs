//! sshconf - SSH host and group profile manager
//!
//! Profiles are kept in a [`store::PersistentDict`]: an ordered in-memory
//! mapping that detects the format of its file when opened and commits
//! atomically in the configured format (JSON, MessagePack or CSV).

pub mod commands;
pub mod config;
pub mod profile;
pub mod store;
