//! The role repository.
//!
//! [`RoleRepository`] keeps three structures coherent:
//!
//! - **Role list**: the authoritative, copy-on-write list of role records
//! - **Name index**: role name to record, for `get_role_by_name`
//! - **Membership index**: username to held role names, for
//!   `get_role_names_by_username`
//!
//! # Writers
//!
//! Every mutation runs inside one writer section per repository. Within it the
//! order is fixed: publish the new role list, commit it to the
//! [`PersistenceSink`], then bring the name index and the membership index up
//! to date. A failed commit therefore leaves the indices untouched.
//!
//! # Readers
//!
//! Name and membership lookups never enter the writer section. They may observe
//! the pre-mutation indices while a writer is between its list swap and its
//! index maintenance.
//!
//! # Optimistic concurrency
//!
//! [`update`](RoleRepository::update) takes the record the caller last saw and
//! only succeeds if an identical record (same name and same users) is still in
//! the list. Otherwise it fails with [`Error::ConcurrentModification`] and the
//! caller should re-read and retry.

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::{
    config::RepositoryConfig,
    error::{Error, ErrorKind, Result},
    health::ConsistencyReport,
    index::{MembershipIndex, NameIndex},
    metrics::RepositoryMetrics,
    role::RoleRecord,
    role_list::{RoleList, with_appended, with_replaced, without_name},
    storage::{MemorySink, PersistenceSink},
    validation::{NameValidator, PatternValidator},
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// In-memory indexed role repository backed by a persistence sink.
pub struct RoleRepository<P = MemorySink, V = PatternValidator>
where
    P: PersistenceSink,
    V: NameValidator,
{
    sink: P,
    validator: V,
    config: RepositoryConfig,
    roles: RoleList,
    by_name: NameIndex,
    by_username: MembershipIndex,
    // Writer section; also taken by the counting queries for a stable view
    write_lock: Mutex<()>,
    metrics: RepositoryMetrics,
}

impl<P> RoleRepository<P, PatternValidator>
where
    P: PersistenceSink,
{
    /// Create an empty repository with the default configuration.
    pub fn new(sink: P) -> Self {
        Self::with_validator(sink, PatternValidator::default(), RepositoryConfig::default())
    }

    /// Create an empty repository with a custom configuration.
    pub fn with_config(sink: P, config: RepositoryConfig) -> Result<Self> {
        let validator = config.validator()?;
        Ok(Self::with_validator(sink, validator, config))
    }
}

impl<P, V> RoleRepository<P, V>
where
    P: PersistenceSink,
    V: NameValidator,
{
    /// Create an empty repository with a custom name validator.
    ///
    /// The validator takes the place of `config.role_name_pattern`.
    pub fn with_validator(sink: P, validator: V, config: RepositoryConfig) -> Self {
        Self {
            sink,
            validator,
            config,
            roles: RoleList::default(),
            by_name: NameIndex::new(),
            by_username: MembershipIndex::new(),
            write_lock: Mutex::new(()),
            metrics: RepositoryMetrics::new(),
        }
    }

    /// Replace the whole role set with roles read from durable storage.
    ///
    /// Both indices are rebuilt. Nothing is committed, since the roles came
    /// from the sink's storage in the first place.
    pub fn load_roles(&self, roles: Vec<RoleRecord>) -> Result<()> {
        let mut seen = HashSet::with_capacity(roles.len());
        for role in &roles {
            if !self.validator.is_valid(role.name()) {
                return Err(Error::InvalidRoleName(role.name().to_string()));
            }
            if !seen.insert(role.name()) {
                return Err(Error::RoleAlreadyExists(role.name().to_string()));
            }
        }

        let _guard = self.write_lock.lock();
        let count = roles.len();
        self.roles.publish(roles);
        self.rebuild_indices();

        info!("Loaded {count} roles");
        Ok(())
    }

    /// Add a new role.
    pub fn create(&self, role: RoleRecord) -> Result<()> {
        if !self.is_valid_role_name(role.name()) {
            self.metrics.record_validation_failure();
            debug!("Rejected invalid role name '{}'", role.name());
            return Err(Error::InvalidRoleName(role.name().to_string()));
        }

        let _guard = self.write_lock.lock();

        // The list is authoritative; the name index may lag behind it
        let current = self.roles.snapshot();
        if current.iter().any(|other| other.name() == role.name()) {
            self.metrics.record_validation_failure();
            debug!("Rejected duplicate role '{}'", role.name());
            return Err(Error::RoleAlreadyExists(role.name().to_string()));
        }

        self.publish_and_commit(with_appended(&current, role.clone()))?;

        self.by_name.insert(role.clone());
        self.by_username.add_role(&role);

        self.metrics.record_create();
        info!(
            "Role '{}' created with {} users",
            role.name(),
            role.users().len()
        );
        Ok(())
    }

    /// Replace `existing` with `updated`.
    ///
    /// `existing` must be value-equal to the record currently stored under that
    /// name, otherwise the update fails with [`Error::ConcurrentModification`].
    pub fn update(&self, existing: &RoleRecord, updated: &RoleRecord) -> Result<()> {
        if existing.name() != updated.name() {
            self.metrics.record_validation_failure();
            return Err(Error::RoleNameMismatch {
                existing: existing.name().to_string(),
                updated: updated.name().to_string(),
            });
        }

        let _guard = self.write_lock.lock();
        self.update_locked(existing, updated)
    }

    /// Remove the role named like `role`. Returns whether it existed.
    ///
    /// Membership entries for the users listed in `role` are pruned even when no
    /// role of that name was found. When one was found, the users of the stored
    /// record and of the record the name index held are pruned too; the two
    /// differ after a failed update commit.
    pub fn delete(&self, role: &RoleRecord) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let current = self.roles.snapshot();
        let removed = current.iter().find(|other| other.name() == role.name()).cloned();

        let indexed = match without_name(&current, role.name()) {
            Some(next) => {
                self.publish_and_commit(next)?;
                self.by_name.remove(role.name())
            }
            None => None,
        };

        self.by_username.remove_role(role);
        for other in [&removed, &indexed].into_iter().flatten() {
            if other != role {
                self.by_username.remove_role(other);
            }
        }

        match removed {
            Some(_) => {
                self.metrics.record_delete();
                info!("Role '{}' deleted", role.name());
                Ok(true)
            }
            None => {
                debug!("Delete of unknown role '{}'", role.name());
                Ok(false)
            }
        }
    }

    /// Remove a user from every role they hold.
    ///
    /// Each role is updated independently. The first failing update stops the
    /// sequence and is returned; roles updated before it stay updated.
    ///
    /// A membership entry naming a role that exists neither in the role list
    /// nor in the name index is dropped. A role still in the list but missing
    /// from the name index fails with [`Error::ConcurrentModification`].
    pub fn remove_user_from_all_roles(&self, username: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        // Owned copy: each update rewrites this user's membership entry
        let role_names = self.by_username.roles_of(username);
        debug!(
            "Removing user '{username}' from {} roles",
            role_names.len()
        );

        for role_name in role_names {
            let Some(role) = self.by_name.get(&role_name) else {
                if self.roles.find_by_name(&role_name).is_none() {
                    warn!("Dropping membership of '{username}' in deleted role '{role_name}'");
                    self.by_username
                        .remove_role(&RoleRecord::new(role_name.as_str(), [username]));
                    continue;
                }
                self.metrics.record_conflict();
                warn!("Role '{role_name}' held by '{username}' is missing from the name index");
                return Err(Error::ConcurrentModification(role_name));
            };
            let updated = role.augment().without_user(username).build();
            self.update_locked(&role, &updated)?;
        }

        Ok(())
    }

    /// Remove every role and commit the empty set.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();

        self.publish_and_commit(Vec::new())?;
        self.by_name.clear();
        self.by_username.clear();

        info!("All roles cleared");
        Ok(())
    }

    /// Look up a role by name.
    pub fn get_role_by_name(&self, name: &str) -> Option<RoleRecord> {
        self.metrics.record_lookup();
        self.by_name.get(name)
    }

    /// Get the names of all roles a user holds, in sorted order.
    pub fn get_role_names_by_username(&self, username: &str) -> BTreeSet<String> {
        self.metrics.record_lookup();
        self.by_username.roles_of(username)
    }

    /// Number of roles in the role list.
    pub fn number_of_roles(&self) -> usize {
        let _guard = self.write_lock.lock();
        self.roles.len()
    }

    /// Names of all roles in the role list.
    pub fn get_all_role_names(&self) -> BTreeSet<String> {
        let _guard = self.write_lock.lock();
        self.roles.names().into_iter().collect()
    }

    /// Whether `name` is acceptable as a role name.
    pub fn is_valid_role_name(&self, name: &str) -> bool {
        self.validator.is_valid(name)
    }

    /// Lock-free snapshot of the role list.
    pub fn roles(&self) -> Arc<Vec<RoleRecord>> {
        self.roles.snapshot()
    }

    /// Compare the role list with both indices.
    pub fn check_consistency(&self) -> ConsistencyReport {
        let _guard = self.write_lock.lock();
        ConsistencyReport::check(&self.roles.snapshot(), &self.by_name, &self.by_username)
    }

    /// Rebuild both indices from the role list.
    pub fn reindex(&self) {
        let _guard = self.write_lock.lock();
        self.rebuild_indices();
        info!("Indices rebuilt from {} roles", self.roles.len());
    }

    /// Operation counters.
    pub fn metrics(&self) -> &RepositoryMetrics {
        &self.metrics
    }

    /// The active configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// The persistence sink.
    pub fn sink(&self) -> &P {
        &self.sink
    }

    // Internal implementation; callers hold the writer section

    fn update_locked(&self, existing: &RoleRecord, updated: &RoleRecord) -> Result<()> {
        let current = self.roles.snapshot();
        let Some(next) = with_replaced(&current, existing, updated) else {
            self.metrics.record_conflict();
            warn!("Stale update of role '{}' rejected", existing.name());
            return Err(Error::ConcurrentModification(existing.name().to_string()));
        };

        self.publish_and_commit(next)?;

        self.by_name.insert(updated.clone());

        // Users kept across the update never read as missing the role
        let departed = RoleRecord::new(
            existing.name(),
            existing.users().difference(updated.users()),
        );
        self.by_username.remove_role(&departed);
        self.by_username.add_role(updated);

        self.metrics.record_update();
        info!(
            "Role '{}' updated: {} -> {} users",
            updated.name(),
            existing.users().len(),
            updated.users().len()
        );
        Ok(())
    }

    fn publish_and_commit(&self, next: Vec<RoleRecord>) -> Result<()> {
        let previous = self.roles.publish(next);
        let published = self.roles.snapshot();

        if let Err(error) = self.sink.commit(&published) {
            self.metrics.record_persistence_failure();
            let error = match error.kind() {
                ErrorKind::Persistence => error,
                _ => Error::Persistence(error.to_string()),
            };

            if self.config.rollback_on_commit_failure {
                self.roles.restore(previous);
                warn!("Commit failed, role list rolled back: {error}");
            } else {
                warn!("Commit failed, role list is ahead of its indices: {error}");
            }
            return Err(error);
        }

        Ok(())
    }

    fn rebuild_indices(&self) {
        let roles = self.roles.snapshot();
        self.by_name.clear();
        self.by_username.clear();
        for role in roles.iter() {
            self.by_name.insert(role.clone());
            self.by_username.add_role(role);
        }
    }
}

impl<P> Default for RoleRepository<P, PatternValidator>
where
    P: PersistenceSink + Default,
{
    fn default() -> Self {
        Self::new(P::default())
    }
}
