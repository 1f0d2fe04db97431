//! # Snapshot Storage
//!
//! The persistence capability used by the reporting loop, plus its two
//! backends:
//! - `MemoryStore`: volatile, used by tests and benchmarks
//! - `RedbStore`: disk-backed ACID storage shared with the host's data

mod redb_store;

pub use redb_store::{ProfileStats, RedbStore};

use crate::{DiskUsage, Snapshot, TelemarkError};
use std::sync::{Mutex, MutexGuard, PoisonError};

// =============================================================================
// SNAPSHOTSTORE TRAIT
// =============================================================================

/// Durable home of the analytics baseline.
///
/// Implementors must be `Send + Sync`: the store is shared between the host
/// and the reporting loop.
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted snapshot. Returns the zero snapshot when nothing
    /// has been stored yet.
    fn read_snapshot(&self) -> Result<Snapshot, TelemarkError>;

    /// Replace the persisted snapshot.
    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), TelemarkError>;

    /// Stable identifier of this installation.
    fn install_id(&self) -> Result<String, TelemarkError>;

    /// Persisted-data size in bytes, by storage category.
    fn disk_usage(&self) -> Result<DiskUsage, TelemarkError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    disk_usage: DiskUsage,
    writes: usize,
}

/// In-memory snapshot store.
///
/// Nothing survives the process. Write count is tracked so callers can
/// observe how often the reporting loop persisted.
#[derive(Debug)]
pub struct MemoryStore {
    install_id: String,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store with a fresh install id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            install_id: uuid::Uuid::new_v4().to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Seed the store with a previously persisted snapshot.
    #[must_use]
    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.lock().snapshot = Some(snapshot);
        self
    }

    /// Report a fixed disk usage breakdown.
    #[must_use]
    pub fn with_disk_usage(self, disk_usage: DiskUsage) -> Self {
        self.lock().disk_usage = disk_usage;
        self
    }

    /// Use a fixed install id.
    #[must_use]
    pub fn with_install_id(mut self, install_id: impl Into<String>) -> Self {
        self.install_id = install_id.into();
        self
    }

    /// Number of successful `write_snapshot` calls.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// The last snapshot written, if any.
    #[must_use]
    pub fn last_written(&self) -> Option<Snapshot> {
        let state = self.lock();
        if state.writes == 0 {
            None
        } else {
            state.snapshot.clone()
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemoryStore {
    fn read_snapshot(&self) -> Result<Snapshot, TelemarkError> {
        Ok(self.lock().snapshot.clone().unwrap_or_default())
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), TelemarkError> {
        let mut state = self.lock();
        state.snapshot = Some(snapshot.clone());
        state.writes += 1;
        Ok(())
    }

    fn install_id(&self) -> Result<String, TelemarkError> {
        Ok(self.install_id.clone())
    }

    fn disk_usage(&self) -> Result<DiskUsage, TelemarkError> {
        Ok(self.lock().disk_usage.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================
