//! # Role Repository
//!
//! An authoritative, queryable set of authorization roles. Each role is a name
//! plus the usernames that hold it. The repository answers the two hot-path
//! questions of an access-control check in near-constant time:
//!
//! - which role has this name ([`RoleRepository::get_role_by_name`])
//! - which roles does this user hold ([`RoleRepository::get_role_names_by_username`])
//!
//! Mutations are serialized through a single writer section and committed to a
//! [`PersistenceSink`]. Updates use optimistic concurrency: the caller passes
//! the record it last saw and the update fails if that record is gone.
//!
//! ## Features
//!
//! - Copy-on-write master role list with atomic publish
//! - Lock-free name and membership lookups
//! - Value-equality optimistic concurrency on update
//! - Pluggable persistence sinks and role name policies
//! - Consistency checks and reindexing after failed commits
//! - Optional JSON file sink (`persistence`) and tokio wrapper (`async`)
//!
//! ## Quick Start
//!
//! ```rust
//! use role_repository::{MemorySink, RoleRecord, RoleRepository};
//!
//! let repo = RoleRepository::new(MemorySink::new());
//!
//! let admin = RoleRecord::new("admin", ["alice"]);
//! repo.create(admin.clone())?;
//!
//! let with_bob = admin.augment().with_user("bob").build();
//! repo.update(&admin, &with_bob)?;
//!
//! assert!(repo.get_role_names_by_username("bob").contains("admin"));
//!
//! // A second writer holding the old record is rejected
//! let err = repo.update(&admin, &RoleRecord::empty("admin")).unwrap_err();
//! assert!(err.is_retryable());
//! # Ok::<(), role_repository::Error>(())
//! ```
//!
//! ## Audit Logging
//!
//! The repository logs through the `log` facade: mutations at info level,
//! conflicts and failed commits at warn level. With the `audit` feature enabled
//! a default logger can be installed:
//!
//! ```rust
//! # #[cfg(feature = "audit")]
//! role_repository::init_audit_logger();
//!
//! // RUST_LOG=info,role_repository=debug
//! ```

#[cfg(feature = "audit")]
pub fn init_audit_logger() {
    env_logger::init();
}

pub mod config;
pub mod error;
pub mod health;
pub mod index;
pub mod metrics;
pub mod repository;
pub mod role;
pub mod role_list;
pub mod storage;
pub mod validation;

#[cfg(feature = "async")]
pub mod async_support;

// Re-export main types for convenience
pub use crate::{
    config::{RepositoryConfig, RepositoryConfigBuilder},
    error::{Error, ErrorKind, Result},
    health::{ConsistencyReport, HealthStatus},
    index::{MembershipIndex, NameIndex},
    metrics::{MetricsSnapshot, RepositoryMetrics, StripedCounter},
    repository::RoleRepository,
    role::{RoleRecord, RoleRecordBuilder},
    role_list::RoleList,
    storage::{CompositeSink, MemorySink, NullSink, PersistenceSink},
    validation::{DEFAULT_ROLE_NAME_PATTERN, NameValidator, PatternValidator},
};

#[cfg(feature = "persistence")]
pub use crate::storage::FileSink;

#[cfg(feature = "async")]
pub use crate::async_support::AsyncRoleRepository;
