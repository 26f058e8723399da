//! Persistence sinks the repository commits its role set to.

use crate::{
    error::{Error, Result},
    role::RoleRecord,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Durable destination for the full role set.
///
/// The repository calls [`commit`](PersistenceSink::commit) once per successful
/// mutation, from inside its writer section, with the complete post-mutation
/// list. Implementations must finish synchronously.
pub trait PersistenceSink: Send + Sync {
    /// Durably store the given role set.
    fn commit(&self, roles: &[RoleRecord]) -> Result<()>;
}

impl<P: PersistenceSink + ?Sized> PersistenceSink for Arc<P> {
    fn commit(&self, roles: &[RoleRecord]) -> Result<()> {
        (**self).commit(roles)
    }
}

impl<P: PersistenceSink + ?Sized> PersistenceSink for Box<P> {
    fn commit(&self, roles: &[RoleRecord]) -> Result<()> {
        (**self).commit(roles)
    }
}

/// Sink that discards every commit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn commit(&self, _roles: &[RoleRecord]) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySinkState {
    committed: Vec<RoleRecord>,
    commit_count: u64,
    failures_pending: usize,
}

/// In-memory sink keeping the last committed role set.
///
/// Clones share state, so a test can keep a handle while the repository owns
/// another one.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    /// Create a new memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last committed role set.
    pub fn committed(&self) -> Vec<RoleRecord> {
        self.state.lock().committed.clone()
    }

    /// Get the number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.state.lock().commit_count
    }

    /// Make the next `count` commits fail.
    pub fn fail_next_commits(&self, count: usize) {
        self.state.lock().failures_pending = count;
    }
}

impl PersistenceSink for MemorySink {
    fn commit(&self, roles: &[RoleRecord]) -> Result<()> {
        let mut state = self.state.lock();
        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            return Err(Error::Persistence(
                "memory sink configured to fail".to_string(),
            ));
        }
        state.committed = roles.to_vec();
        state.commit_count += 1;
        Ok(())
    }
}

/// File-based sink that stores the role set as JSON (requires persistence feature).
#[cfg(feature = "persistence")]
pub mod file_sink {
    use super::*;
    use std::{
        fs::{self, File},
        io::{BufReader, BufWriter, Write},
        path::{Path, PathBuf},
    };

    /// Sink writing the full role set to a JSON file.
    ///
    /// Each commit writes a sibling temporary file and renames it over the
    /// target, so a crash mid-write leaves the previous file intact.
    #[derive(Debug, Clone)]
    pub struct FileSink {
        path: PathBuf,
    }

    impl FileSink {
        /// Create a file sink, creating the parent directory if needed.
        pub fn new(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref().to_path_buf();

            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }

            Ok(Self { path })
        }

        /// Get the target file path.
        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Read the last committed role set. A missing file yields no roles.
        pub fn load(&self) -> Result<Vec<RoleRecord>> {
            if !self.path.exists() {
                return Ok(Vec::new());
            }

            let reader = BufReader::new(File::open(&self.path)?);
            Ok(serde_json::from_reader(reader)?)
        }

        fn temp_path(&self) -> PathBuf {
            let mut name = self
                .path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            name.push(".tmp");
            self.path.with_file_name(name)
        }
    }

    impl PersistenceSink for FileSink {
        fn commit(&self, roles: &[RoleRecord]) -> Result<()> {
            let temp = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&temp)?);
                serde_json::to_writer_pretty(&mut writer, roles)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&temp, &self.path)?;
            Ok(())
        }
    }
}

#[cfg(feature = "persistence")]
pub use file_sink::FileSink;

/// Sink that commits to a primary sink and then to an optional secondary one.
pub struct CompositeSink {
    primary: Box<dyn PersistenceSink>,
    secondary: Option<Box<dyn PersistenceSink>>,
}

impl CompositeSink {
    /// Create a composite sink with a primary sink.
    pub fn new(primary: Box<dyn PersistenceSink>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// Add a secondary sink.
    pub fn with_secondary(mut self, secondary: Box<dyn PersistenceSink>) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

impl PersistenceSink for CompositeSink {
    fn commit(&self, roles: &[RoleRecord]) -> Result<()> {
        self.primary.commit(roles)?;

        if let Some(secondary) = &self.secondary {
            secondary.commit(roles)?;
        }

        Ok(())
    }
}
