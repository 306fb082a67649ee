//! Profile collections stored in a [`PersistentDict`]
//!
//! Hosts and groups live under the `"host"` and `"group"` keys, each a map
//! from decimal id to record. The tabular store format flattens these maps to
//! their JSON-like text, so a `Text` collection is parsed back from that
//! rendering and put back into the store as a map.
//!
//! Both collections are read once when the repository is loaded; updates
//! touch only the record they change.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProfileError;
use super::types::{Entry, EntryKind, Group, Host};
use crate::store::{PersistentDict, Value};

/// Typed view over the profile collections of a store.
pub struct ProfileRepository<'a> {
    dict: &'a mut PersistentDict,
    /// Sorted by id
    hosts: Vec<Host>,
    /// Sorted by id
    groups: Vec<Group>,
}

impl<'a> ProfileRepository<'a> {
    /// Read the host and group collections of `dict`.
    pub fn load(dict: &'a mut PersistentDict) -> Result<Self, ProfileError> {
        let mut hosts: Vec<Host> = load_collection(dict, EntryKind::Host)?;
        let mut groups: Vec<Group> = load_collection(dict, EntryKind::Group)?;
        hosts.sort_by_key(|h| h.id);
        groups.sort_by_key(|g| g.id);
        Ok(Self {
            dict,
            hosts,
            groups,
        })
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Smallest id above every existing id of `kind`.
    pub fn next_id(&self, kind: EntryKind) -> u64 {
        let max = match kind {
            EntryKind::Host => self.hosts.last().map(|h| h.id),
            EntryKind::Group => self.groups.last().map(|g| g.id),
        };
        max.map_or(1, |id| id + 1)
    }

    /// Insert or replace a host by id. Labels must stay unique.
    pub fn save_host(&mut self, host: Host) -> Result<(), ProfileError> {
        if let Some(group) = host.group {
            self.require_group(group)?;
        }
        if self
            .hosts
            .iter()
            .any(|h| h.id != host.id && h.label == host.label)
        {
            return Err(ProfileError::Duplicate {
                kind: EntryKind::Host,
                label: host.label,
            });
        }

        put_record(self.dict, EntryKind::Host, host.id, &host)?;
        match self.hosts.binary_search_by_key(&host.id, |h| h.id) {
            Ok(index) => self.hosts[index] = host,
            Err(index) => self.hosts.insert(index, host),
        }
        Ok(())
    }

    /// Insert or replace a group by id. Labels must stay unique.
    pub fn save_group(&mut self, group: Group) -> Result<(), ProfileError> {
        if let Some(parent) = group.parent_group {
            if parent == group.id {
                return Err(ProfileError::GroupCycle(parent));
            }
            self.require_group(parent)?;
        }
        if self
            .groups
            .iter()
            .any(|g| g.id != group.id && g.label == group.label)
        {
            return Err(ProfileError::Duplicate {
                kind: EntryKind::Group,
                label: group.label,
            });
        }

        put_record(self.dict, EntryKind::Group, group.id, &group)?;
        match self.groups.binary_search_by_key(&group.id, |g| g.id) {
            Ok(index) => self.groups[index] = group,
            Err(index) => self.groups.insert(index, group),
        }
        Ok(())
    }

    pub fn remove_host(&mut self, id: u64) -> Option<Host> {
        let index = self.hosts.binary_search_by_key(&id, |h| h.id).ok()?;
        remove_record(self.dict, EntryKind::Host, id);
        Some(self.hosts.remove(index))
    }

    /// Remove a group nothing refers to any more.
    pub fn remove_group(&mut self, id: u64) -> Result<Option<Group>, ProfileError> {
        let Ok(index) = self.groups.binary_search_by_key(&id, |g| g.id) else {
            return Ok(None);
        };

        let users = self.hosts.iter().filter(|h| h.group == Some(id)).count()
            + self
                .groups
                .iter()
                .filter(|g| g.parent_group == Some(id))
                .count();
        if users > 0 {
            return Err(ProfileError::GroupInUse {
                label: self.groups[index].label.clone(),
                users,
            });
        }

        remove_record(self.dict, EntryKind::Group, id);
        Ok(Some(self.groups.remove(index)))
    }

    /// Resolve an entry by numeric id, falling back to a unique label.
    pub fn get_relation(&self, kind: EntryKind, id_or_name: &str) -> Result<Entry, ProfileError> {
        let entries: Vec<Entry> = match kind {
            EntryKind::Host => self.hosts.iter().cloned().map(Entry::Host).collect(),
            EntryKind::Group => self.groups.iter().cloned().map(Entry::Group).collect(),
        };

        if let Ok(id) = id_or_name.parse::<u64>() {
            if let Some(entry) = entries.iter().find(|e| e.id() == id) {
                return Ok(entry.clone());
            }
        }

        let mut matches: Vec<Entry> = entries
            .into_iter()
            .filter(|e| e.label() == id_or_name)
            .collect();
        match matches.len() {
            0 => Err(ProfileError::NotFound {
                kind,
                query: id_or_name.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(ProfileError::Ambiguous {
                kind,
                query: id_or_name.to_string(),
                count,
            }),
        }
    }

    /// Id of the group named by `id_or_name`.
    pub fn group_id(&self, id_or_name: &str) -> Result<u64, ProfileError> {
        self.get_relation(EntryKind::Group, id_or_name)
            .map(|entry| entry.id())
    }

    fn require_group(&self, id: u64) -> Result<(), ProfileError> {
        match self.groups.binary_search_by_key(&id, |g| g.id) {
            Ok(_) => Ok(()),
            Err(_) => Err(ProfileError::MissingGroup(id)),
        }
    }
}

fn load_collection<T: DeserializeOwned>(
    dict: &mut PersistentDict,
    kind: EntryKind,
) -> Result<Vec<T>, ProfileError> {
    let Some(collection) = dict.get(kind.key()) else {
        return Ok(Vec::new());
    };

    let record_error = |source| ProfileError::Record { kind, source };
    let from_text = matches!(collection, Value::Text(_));
    let json = match collection {
        Value::Text(text) => {
            debug!("Parsing {} collection from its text form", kind);
            serde_json::from_str::<serde_json::Value>(text).map_err(record_error)?
        }
        other => serde_json::to_value(other).map_err(record_error)?,
    };
    let table = IndexMap::<String, T>::deserialize(&json).map_err(record_error)?;

    if from_text {
        let restored: Value = serde_json::from_value(json).map_err(record_error)?;
        dict.insert(kind.key(), restored);
    }
    Ok(table.into_values().collect())
}

fn put_record<T: Serialize>(
    dict: &mut PersistentDict,
    kind: EntryKind,
    id: u64,
    item: &T,
) -> Result<(), ProfileError> {
    let record_error = |source| ProfileError::Record { kind, source };
    let json = serde_json::to_value(item).map_err(record_error)?;
    let record: Value = serde_json::from_value(json).map_err(record_error)?;

    match dict.get_mut(kind.key()) {
        Some(Value::Map(table)) => {
            table.insert(id.to_string(), record);
        }
        _ => {
            dict.insert(
                kind.key(),
                Value::Map(IndexMap::from([(id.to_string(), record)])),
            );
        }
    }
    Ok(())
}

fn remove_record(dict: &mut PersistentDict, kind: EntryKind, id: u64) {
    if let Some(Value::Map(table)) = dict.get_mut(kind.key()) {
        table.shift_remove(&id.to_string());
    }
}
