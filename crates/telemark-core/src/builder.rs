//! # Snapshot Builder
//!
//! Reads live signals and produces a fresh [`Snapshot`]:
//! - install identity and disk usage from the [`SnapshotStore`]
//! - activity counters and app count from the [`StatsProvider`]
//! - process memory and platform identifiers from [`crate::system`]
//! - a new run id (UUIDv4) and the wall-clock time
//!
//! Building never fails. Any unavailable signal degrades to zero or empty.

use crate::primitives::{
    CATEGORY_APPS, CATEGORY_METADATA, CATEGORY_PROFILES, STAT_COMPARISON, STAT_DIFF, STAT_INDEX,
    STAT_INGEST, STAT_RENDER, ingest_key,
};
use crate::store::SnapshotStore;
use crate::system::{self, MemoryStats};
use crate::{Snapshot, StatsProvider};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Assembles snapshots from a store and a stats provider.
#[derive(Clone)]
pub struct SnapshotBuilder {
    store: Arc<dyn SnapshotStore>,
    stats: Arc<dyn StatsProvider>,
    version: String,
}

impl std::fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl SnapshotBuilder {
    /// Create a builder. `version` is the host's build version.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        stats: Arc<dyn StatsProvider>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            stats,
            version: version.into(),
        }
    }

    /// The store this builder reads identity and disk usage from.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Build a snapshot for the given upload index.
    #[must_use]
    pub fn build(&self, upload_index: u64) -> Snapshot {
        let memory = MemoryStats::current();
        let disk = self.store.disk_usage().unwrap_or_default();
        let stats = self.stats.stats();

        let disk_size = |category: &str| disk.get(category).copied().unwrap_or(0);
        let count = |key: &str| stats.get(key).copied().unwrap_or(0);
        let spy = |source: &str| count(&ingest_key(source));

        Snapshot {
            install_id: self.store.install_id().unwrap_or_default(),
            run_id: uuid::Uuid::new_v4().to_string(),
            version: self.version.clone(),
            timestamp: chrono::Utc::now(),
            upload_index: i64::try_from(upload_index).unwrap_or(i64::MAX),
            os: system::os().to_string(),
            arch: system::arch().to_string(),
            family: system::family().to_string(),
            mem_resident: memory.resident,
            mem_peak_resident: memory.peak_resident,
            mem_virtual: memory.virtual_size,
            mem_threads: memory.threads,
            storage_profiles: disk_size(CATEGORY_PROFILES),
            storage_apps: disk_size(CATEGORY_APPS),
            storage_metadata: disk_size(CATEGORY_METADATA),
            controller_index: count(STAT_INDEX),
            controller_comparison: count(STAT_COMPARISON),
            controller_diff: count(STAT_DIFF),
            controller_ingest: count(STAT_INGEST),
            controller_render: count(STAT_RENDER),
            spy_rbspy: spy("rbspy"),
            spy_pyspy: spy("pyspy"),
            spy_gospy: spy("gospy"),
            spy_ebpfspy: spy("ebpfspy"),
            spy_phpspy: spy("phpspy"),
            spy_dotnetspy: spy("dotnetspy"),
            spy_javaspy: spy("javaspy"),
            apps_count: self.stats.apps_count(),
        }
    }
}

/// Provider backed by a fixed map. Handy for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedStats {
    pub counters: BTreeMap<String, i64>,
    pub apps: i64,
}

impl StatsProvider for FixedStats {
    fn stats(&self) -> BTreeMap<String, i64> {
        self.counters.clone()
    }

    fn apps_count(&self) -> i64 {
        self.apps
    }
}
