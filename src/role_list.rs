//! The authoritative, copy-on-write list of roles.

use crate::role::RoleRecord;
use arc_swap::ArcSwap;
use std::{collections::HashSet, sync::Arc};

/// Ordered master list of roles, replaced as a whole on every change.
///
/// Readers load an `Arc` to an immutable vector and keep a complete snapshot
/// for as long as they hold it. Writers build a new vector and
/// [`publish`](RoleList::publish) it; the repository serializes writers.
#[derive(Debug)]
pub struct RoleList {
    roles: ArcSwap<Vec<RoleRecord>>,
}

impl Default for RoleList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RoleList {
    /// Create a list with the given roles.
    pub fn new(roles: Vec<RoleRecord>) -> Self {
        Self {
            roles: ArcSwap::from_pointee(roles),
        }
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<Vec<RoleRecord>> {
        self.roles.load_full()
    }

    /// Atomically replace the list, returning the previous snapshot.
    pub fn publish(&self, roles: Vec<RoleRecord>) -> Arc<Vec<RoleRecord>> {
        self.roles.swap(Arc::new(roles))
    }

    /// Put a previously taken snapshot back in place.
    pub fn restore(&self, snapshot: Arc<Vec<RoleRecord>>) {
        self.roles.store(snapshot);
    }

    /// Number of roles in the current snapshot.
    pub fn len(&self) -> usize {
        self.roles.load().len()
    }

    /// Whether the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.roles.load().is_empty()
    }

    /// Names of all roles in the current snapshot.
    pub fn names(&self) -> HashSet<String> {
        self.roles
            .load()
            .iter()
            .map(|role| role.name().to_string())
            .collect()
    }

    /// Find a role by name with a linear scan of the current snapshot.
    pub fn find_by_name(&self, name: &str) -> Option<RoleRecord> {
        self.roles
            .load()
            .iter()
            .find(|role| role.name() == name)
            .cloned()
    }

    /// Whether the current snapshot contains a record equal to `role`.
    pub fn contains_exact(&self, role: &RoleRecord) -> bool {
        self.roles.load().iter().any(|other| other == role)
    }
}

/// Copy of `roles` with `role` appended.
pub(crate) fn with_appended(roles: &[RoleRecord], role: RoleRecord) -> Vec<RoleRecord> {
    let mut next = Vec::with_capacity(roles.len() + 1);
    next.extend_from_slice(roles);
    next.push(role);
    next
}

/// Copy of `roles` with the record equal to `existing` swapped for `updated`.
///
/// Returns `None` when no record equals `existing`.
pub(crate) fn with_replaced(
    roles: &[RoleRecord],
    existing: &RoleRecord,
    updated: &RoleRecord,
) -> Option<Vec<RoleRecord>> {
    let mut found = false;
    let next = roles
        .iter()
        .map(|other| {
            if other == existing {
                found = true;
                updated.clone()
            } else {
                other.clone()
            }
        })
        .collect();
    found.then_some(next)
}

/// Copy of `roles` without any record named `name`.
///
/// Returns `None` when no record has that name.
pub(crate) fn without_name(roles: &[RoleRecord], name: &str) -> Option<Vec<RoleRecord>> {
    let next: Vec<RoleRecord> = roles
        .iter()
        .filter(|other| other.name() != name)
        .cloned()
        .collect();
    (next.len() != roles.len()).then_some(next)
}
