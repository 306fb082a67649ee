//! Host and group profiles
//!
//! Domain model layered on the generic store: typed records, option
//! inheritance through nested groups, and lookups by id or label.

pub mod error;
pub mod merge;
pub mod repository;
pub mod types;

pub use error::ProfileError;
pub use merge::merged_options;
pub use repository::ProfileRepository;
pub use types::{Entry, EntryKind, Group, Host, SshOptions};
