//! Runtime configuration for the role repository.

use crate::{
    error::Result,
    validation::{DEFAULT_ROLE_NAME_PATTERN, PatternValidator},
};

/// Configuration for a [`RoleRepository`](crate::repository::RoleRepository).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "persistence", serde(default))]
pub struct RepositoryConfig {
    /// Regular expression role names must match.
    pub role_name_pattern: String,
    /// Restore the previous role list when a commit fails.
    ///
    /// When false, a failed commit leaves the new role list published while the
    /// indices still describe the old one, until a corrective mutation or
    /// [`reindex`](crate::repository::RoleRepository::reindex).
    pub rollback_on_commit_failure: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            role_name_pattern: DEFAULT_ROLE_NAME_PATTERN.to_string(),
            rollback_on_commit_failure: false,
        }
    }
}

impl RepositoryConfig {
    /// Start building a configuration.
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::new()
    }

    /// Build the name validator described by this configuration.
    pub fn validator(&self) -> Result<PatternValidator> {
        PatternValidator::new(&self.role_name_pattern)
    }
}

/// Builder for [`RepositoryConfig`].
#[derive(Debug, Default)]
pub struct RepositoryConfigBuilder {
    config: RepositoryConfig,
}

impl RepositoryConfigBuilder {
    /// Create a builder seeded with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role name pattern.
    pub fn role_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.role_name_pattern = pattern.into();
        self
    }

    /// Set whether failed commits roll the role list back.
    pub fn rollback_on_commit_failure(mut self, rollback: bool) -> Self {
        self.config.rollback_on_commit_failure = rollback;
        self
    }

    /// Build the configuration, checking that the pattern compiles.
    pub fn build(self) -> Result<RepositoryConfig> {
        self.config.validator()?;
        Ok(self.config)
    }
}
