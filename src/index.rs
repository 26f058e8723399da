//! Lookup indices derived from the master role list.
//!
//! Both indices are sharded concurrent maps, so point lookups never wait on the
//! repository's writer section. They are only mutated by a writer holding that
//! section, after the role list swap and the durable commit.

use crate::role::RoleRecord;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};

/// Role name to current role record.
#[derive(Debug, Default)]
pub struct NameIndex {
    roles: DashMap<String, RoleRecord>,
}

impl NameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a role by name.
    pub fn get(&self, name: &str) -> Option<RoleRecord> {
        self.roles.get(name).map(|entry| entry.value().clone())
    }

    /// Check if a role name is indexed.
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Insert or overwrite the record for its name.
    pub fn insert(&self, role: RoleRecord) {
        self.roles.insert(role.name().to_string(), role);
    }

    /// Remove a role by name, returning the removed record.
    pub fn remove(&self, name: &str) -> Option<RoleRecord> {
        self.roles.remove(name).map(|(_, role)| role)
    }

    /// Number of indexed roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.roles.clear();
    }

    /// Copy the current contents.
    pub fn snapshot(&self) -> HashMap<String, RoleRecord> {
        self.roles
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Username to the ordered set of role names the user holds.
#[derive(Debug, Default)]
pub struct MembershipIndex {
    memberships: DashMap<String, BTreeSet<String>>,
}

impl MembershipIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the role names held by a user. Unknown users hold no roles.
    pub fn roles_of(&self, username: &str) -> BTreeSet<String> {
        self.memberships
            .get(username)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Record every member of `role` as holding it.
    pub fn add_role(&self, role: &RoleRecord) {
        for username in role.users() {
            self.memberships
                .entry(username.clone())
                .or_default()
                .insert(role.name().to_string());
        }
    }

    /// Drop `role.name()` from every member listed in `role`.
    ///
    /// Only the users named by the given record are touched.
    pub fn remove_role(&self, role: &RoleRecord) {
        for username in role.users() {
            // Drop the per-user set once it empties; absent reads as empty.
            self.memberships.remove_if_mut(username, |_, names| {
                names.remove(role.name());
                names.is_empty()
            });
        }
    }

    /// Usernames that currently hold at least one role.
    pub fn users(&self) -> BTreeSet<String> {
        self.memberships
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.memberships.clear();
    }

    /// Copy the current contents.
    pub fn snapshot(&self) -> HashMap<String, BTreeSet<String>> {
        self.memberships
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Compute the membership map a role list implies.
pub(crate) fn expected_memberships<'a>(
    roles: impl IntoIterator<Item = &'a RoleRecord>,
) -> HashMap<String, BTreeSet<String>> {
    let mut memberships: HashMap<String, BTreeSet<String>> = HashMap::new();
    for role in roles {
        for username in role.users() {
            memberships
                .entry(username.clone())
                .or_default()
                .insert(role.name().to_string());
        }
    }
    memberships
}
