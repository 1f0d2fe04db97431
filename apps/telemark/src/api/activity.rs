//! # Activity Stats
//!
//! Request counters feeding the snapshot builder.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use telemark_core::primitives::{INGEST_SOURCES, STAT_INGEST, ingest_key};
use telemark_core::{RedbStore, StatsProvider};

/// Per-route request counts plus the app count of the backing store.
#[derive(Debug)]
pub struct ActivityStats {
    counters: Mutex<BTreeMap<String, i64>>,
    store: Arc<RedbStore>,
}

impl ActivityStats {
    #[must_use]
    pub fn new(store: Arc<RedbStore>) -> Self {
        Self {
            counters: Mutex::new(BTreeMap::new()),
            store,
        }
    }

    /// Count one request to `route`.
    pub fn record(&self, route: &str) {
        self.bump(route);
    }

    /// Count one ingest, attributed to `from` when it is a known profiler.
    ///
    /// Unknown sources only count toward the plain ingest total.
    pub fn record_ingest(&self, from: Option<&str>) {
        self.bump(STAT_INGEST);
        if let Some(source) = from.filter(|s| INGEST_SOURCES.contains(s)) {
            self.bump(&ingest_key(source));
        }
    }

    fn bump(&self, key: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let count = counters.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }
}

impl StatsProvider for ActivityStats {
    fn stats(&self) -> BTreeMap<String, i64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apps_count(&self) -> i64 {
        match self.store.apps_count() {
            Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
            Err(e) => {
                tracing::debug!(error = %e, "apps count unavailable");
                0
            }
        }
    }
}
