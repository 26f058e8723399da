//! Async support for the role repository (requires 'async' feature).

use crate::{
    error::{Error, Result},
    repository::RoleRepository,
    role::RoleRecord,
    storage::PersistenceSink,
    validation::NameValidator,
};
use std::{collections::BTreeSet, sync::Arc};

/// Async wrapper around the role repository.
///
/// Mutations block on the writer section and on the synchronous sink commit,
/// so they run on tokio's blocking pool. Lookups are lock-free and run inline.
pub struct AsyncRoleRepository<P, V>
where
    P: PersistenceSink + 'static,
    V: NameValidator + 'static,
{
    inner: Arc<RoleRepository<P, V>>,
}

impl<P, V> Clone for AsyncRoleRepository<P, V>
where
    P: PersistenceSink + 'static,
    V: NameValidator + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, V> AsyncRoleRepository<P, V>
where
    P: PersistenceSink + 'static,
    V: NameValidator + 'static,
{
    /// Wrap a repository.
    pub fn new(repository: RoleRepository<P, V>) -> Self {
        Self {
            inner: Arc::new(repository),
        }
    }

    /// Wrap a shared repository.
    pub fn from_shared(repository: Arc<RoleRepository<P, V>>) -> Self {
        Self { inner: repository }
    }

    /// Get the shared synchronous repository.
    pub fn inner(&self) -> &Arc<RoleRepository<P, V>> {
        &self.inner
    }

    /// Add a new role.
    pub async fn create(&self, role: RoleRecord) -> Result<()> {
        self.blocking(move |repo| repo.create(role)).await
    }

    /// Replace `existing` with `updated`.
    pub async fn update(&self, existing: RoleRecord, updated: RoleRecord) -> Result<()> {
        self.blocking(move |repo| repo.update(&existing, &updated))
            .await
    }

    /// Remove a role. Returns whether it existed.
    pub async fn delete(&self, role: RoleRecord) -> Result<bool> {
        self.blocking(move |repo| repo.delete(&role)).await
    }

    /// Remove a user from every role they hold.
    pub async fn remove_user_from_all_roles(&self, username: impl Into<String>) -> Result<()> {
        let username = username.into();
        self.blocking(move |repo| repo.remove_user_from_all_roles(&username))
            .await
    }

    /// Number of roles.
    pub async fn number_of_roles(&self) -> Result<usize> {
        self.blocking(|repo| Ok(repo.number_of_roles())).await
    }

    /// Names of all roles.
    pub async fn get_all_role_names(&self) -> Result<BTreeSet<String>> {
        self.blocking(|repo| Ok(repo.get_all_role_names())).await
    }

    /// Look up a role by name.
    pub fn get_role_by_name(&self, name: &str) -> Option<RoleRecord> {
        self.inner.get_role_by_name(name)
    }

    /// Get the names of all roles a user holds.
    pub fn get_role_names_by_username(&self, username: &str) -> BTreeSet<String> {
        self.inner.get_role_names_by_username(username)
    }

    /// Whether `name` is acceptable as a role name.
    pub fn is_valid_role_name(&self, name: &str) -> bool {
        self.inner.is_valid_role_name(name)
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RoleRepository<P, V>) -> Result<T> + Send + 'static,
    {
        let repo = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || operation(&repo))
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;

    #[tokio::test]
    async fn test_async_lifecycle() {
        let repo = AsyncRoleRepository::new(RoleRepository::new(MemorySink::new()));

        let admin = RoleRecord::new("admin", ["alice"]);
        repo.create(admin.clone()).await.unwrap();
        assert_eq!(repo.get_role_by_name("admin"), Some(admin.clone()));

        let updated = admin.augment().with_user("bob").build();
        repo.update(admin, updated.clone()).await.unwrap();
        assert!(repo.get_role_names_by_username("bob").contains("admin"));

        repo.remove_user_from_all_roles("alice").await.unwrap();
        assert!(repo.get_role_names_by_username("alice").is_empty());

        let current = repo.get_role_by_name("admin").unwrap();
        assert!(repo.delete(current).await.unwrap());
        assert_eq!(repo.number_of_roles().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_async_creates() {
        let repo = AsyncRoleRepository::new(RoleRepository::new(MemorySink::new()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create(RoleRecord::empty(format!("role_{i}"))).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.number_of_roles().await.unwrap(), 16);
        assert_eq!(repo.get_all_role_names().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_panicking_task_is_not_a_persistence_error() {
        let repo = AsyncRoleRepository::new(RoleRepository::new(MemorySink::new()));

        let err = repo
            .blocking(|_| -> Result<()> { panic!("operation aborted") })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TaskFailed(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
        assert!(!err.is_retryable());

        // The sink was never reached
        assert_eq!(repo.inner().sink().commit_count(), 0);
        repo.create(RoleRecord::empty("admin")).await.unwrap();
        assert_eq!(repo.inner().sink().commit_count(), 1);
    }
}
