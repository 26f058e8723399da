//! Role records and the builder used to derive modified copies.

use std::collections::BTreeSet;

/// A role: a unique name plus the usernames that hold it.
///
/// Records are values. The repository never mutates one in place; every change
/// produces a new record, usually through [`RoleRecord::augment`]. Two records
/// are equal only if both the name and the full user set match, which is what
/// optimistic updates compare against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleRecord {
    /// Unique name of the role.
    name: String,
    /// Usernames holding this role.
    #[cfg_attr(feature = "persistence", serde(default))]
    users: BTreeSet<String>,
}

impl RoleRecord {
    /// Create a role with the given name and members.
    pub fn new<I, U>(name: impl Into<String>, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        Self {
            name: name.into(),
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a role without members.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: BTreeSet::new(),
        }
    }

    /// Start building a new role.
    pub fn builder(name: impl Into<String>) -> RoleRecordBuilder {
        RoleRecordBuilder {
            name: name.into(),
            users: BTreeSet::new(),
        }
    }

    /// Start building a modified copy of this role.
    pub fn augment(&self) -> RoleRecordBuilder {
        RoleRecordBuilder {
            name: self.name.clone(),
            users: self.users.clone(),
        }
    }

    /// Get the role's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the usernames holding this role.
    pub fn users(&self) -> &BTreeSet<String> {
        &self.users
    }

    /// Check if a user holds this role.
    pub fn has_user(&self, username: &str) -> bool {
        self.users.contains(username)
    }
}

/// Builder for role records.
#[derive(Debug, Clone)]
pub struct RoleRecordBuilder {
    name: String,
    users: BTreeSet<String>,
}

impl RoleRecordBuilder {
    /// Set the role name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a member.
    pub fn with_user(mut self, username: impl Into<String>) -> Self {
        self.users.insert(username.into());
        self
    }

    /// Add several members.
    pub fn with_users<I, U>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.users.extend(usernames.into_iter().map(Into::into));
        self
    }

    /// Remove a member.
    pub fn without_user(mut self, username: &str) -> Self {
        self.users.remove(username);
        self
    }

    /// Build the role.
    pub fn build(self) -> RoleRecord {
        RoleRecord {
            name: self.name,
            users: self.users,
        }
    }
}
