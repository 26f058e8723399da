//! Consistency checks between the role list and its indices.
//!
//! After a failed commit the role list may have advanced while the indices
//! still describe the previous state. [`ConsistencyReport`] describes any such
//! divergence so an operator can decide whether to reindex.

use crate::{
    index::{MembershipIndex, NameIndex, expected_memberships},
    role::RoleRecord,
};
use std::collections::{BTreeSet, HashMap};

/// Health status derived from a consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum HealthStatus {
    /// Role list and indices agree.
    Healthy,
    /// The indices diverge from the role list.
    Degraded,
}

/// Differences between the role list and the two indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsistencyReport {
    /// Number of roles in the role list.
    pub total_roles: usize,
    /// Roles in the list that the name index lacks.
    pub missing_from_name_index: BTreeSet<String>,
    /// Roles the name index holds but the list does not.
    pub orphaned_in_name_index: BTreeSet<String>,
    /// Roles whose indexed record differs from the listed one.
    pub stale_in_name_index: BTreeSet<String>,
    /// Usernames whose indexed role set differs from the list.
    pub membership_mismatches: BTreeSet<String>,
}

impl ConsistencyReport {
    /// Compare a role list with both indices.
    pub fn check(
        roles: &[RoleRecord],
        by_name: &NameIndex,
        by_username: &MembershipIndex,
    ) -> Self {
        let mut report = ConsistencyReport {
            total_roles: roles.len(),
            ..Default::default()
        };

        let mut indexed = by_name.snapshot();
        for role in roles {
            match indexed.remove(role.name()) {
                None => {
                    report.missing_from_name_index.insert(role.name().to_string());
                }
                Some(record) if record != *role => {
                    report.stale_in_name_index.insert(role.name().to_string());
                }
                Some(_) => {}
            }
        }
        report.orphaned_in_name_index = indexed.into_keys().collect();

        let expected = expected_memberships(roles);
        let actual = by_username.snapshot();
        report.membership_mismatches = mismatched_users(&expected, &actual);

        report
    }

    /// Whether no divergence was found.
    pub fn is_consistent(&self) -> bool {
        self.missing_from_name_index.is_empty()
            && self.orphaned_in_name_index.is_empty()
            && self.stale_in_name_index.is_empty()
            && self.membership_mismatches.is_empty()
    }

    /// Overall health status.
    pub fn status(&self) -> HealthStatus {
        if self.is_consistent() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}

fn mismatched_users(
    expected: &HashMap<String, BTreeSet<String>>,
    actual: &HashMap<String, BTreeSet<String>>,
) -> BTreeSet<String> {
    expected
        .keys()
        .chain(actual.keys())
        .filter(|user| expected.get(*user) != actual.get(*user))
        .cloned()
        .collect()
}
