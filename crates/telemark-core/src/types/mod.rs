//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Telemark core:
//! - Error types (`TelemarkError`)
//! - The statistics capability consumed by the snapshot builder (`StatsProvider`)
//! - Disk usage breakdown (`DiskUsage`)
//!
//! ## Determinism Guarantees
//!
//! All maps exposed here are `BTreeMap`s so that iteration order (and therefore
//! any serialized output) is stable across runs.

use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// DISK USAGE
// =============================================================================

/// Persisted-data size in bytes, keyed by storage category.
pub type DiskUsage = BTreeMap<String, i64>;

// =============================================================================
// STATS PROVIDER
// =============================================================================

/// Read-only view of the host application's activity counters.
///
/// The builder calls both methods once per snapshot. Implementations must be
/// cheap and must not block for long: the reporting loop is single-threaded.
///
/// Implementors must be `Send + Sync` so the reporting loop can run on its own
/// task.
pub trait StatsProvider: Send + Sync {
    /// Named integer counters, keyed by activity name (`"ingest"`,
    /// `"ingest:rbspy"`, `"render"`, ...). Unknown keys are ignored by the
    /// builder and missing keys read as zero.
    fn stats(&self) -> BTreeMap<String, i64>;

    /// Total number of applications known to the host.
    fn apps_count(&self) -> i64;
}

/// A provider with no activity. Useful for tools that only inspect storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStats;

impl StatsProvider for NoStats {
    fn stats(&self) -> BTreeMap<String, i64> {
        BTreeMap::new()
    }

    fn apps_count(&self) -> i64 {
        0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Telemark core.
///
/// - No silent failures: storage operations return `Result<T, TelemarkError>`
/// - Callers in the reporting loop log these and degrade; nothing here is fatal
#[derive(Debug, Error)]
pub enum TelemarkError {
    /// A value could not be encoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored bytes could not be decoded.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or database error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stats_is_empty() {
        let provider = NoStats;
        assert!(provider.stats().is_empty());
        assert_eq!(provider.apps_count(), 0);
    }

    #[test]
    fn error_messages_carry_context() {
        let err = TelemarkError::IoError("disk full".to_string());
        assert_eq!(err.to_string(), "I/O error: disk full");
    }
}
