//! Option inheritance through the group chain

use super::error::ProfileError;
use super::types::{Entry, Group, SshOptions};

/// Merge `entry`'s own options with every group above it.
///
/// The closest definition wins: host, then its group, then that group's
/// parent, and so on up the chain.
pub fn merged_options(entry: &Entry, groups: &[Group]) -> Result<SshOptions, ProfileError> {
    let mut merged = entry.options().clone();
    let mut visited = Vec::new();
    if let Entry::Group(group) = entry {
        visited.push(group.id);
    }

    let mut next = entry.parent();
    while let Some(id) = next {
        if visited.contains(&id) {
            return Err(ProfileError::GroupCycle(id));
        }
        visited.push(id);

        let group = groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(ProfileError::MissingGroup(id))?;
        merged = merged.merge(&group.options);
        next = group.parent_group;
    }

    Ok(merged)
}
