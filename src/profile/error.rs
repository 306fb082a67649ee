//! Error types for profile lookups and updates

use thiserror::Error;

use super::types::EntryKind;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No {kind} matches {query:?}")]
    NotFound { kind: EntryKind, query: String },

    #[error("{count} {kind}s are labelled {query:?}, use the id instead")]
    Ambiguous {
        kind: EntryKind,
        query: String,
        count: usize,
    },

    #[error("A {kind} labelled {label:?} already exists")]
    Duplicate { kind: EntryKind, label: String },

    #[error("Group {0} does not exist")]
    MissingGroup(u64),

    #[error("Group {0} is its own ancestor")]
    GroupCycle(u64),

    #[error("Group {label:?} is still used by {users} entries")]
    GroupInUse { label: String, users: usize },

    #[error("Malformed {kind} record: {source}")]
    Record {
        kind: EntryKind,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
