//! # Primitives
//!
//! Hardcoded constants shared by the builder, the stores and the codec.
//! These are compiled into the binary and are immutable at runtime.

/// Magic bytes for the persisted snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"TLMK";

/// Current snapshot format version.
///
/// Increment this when the `Snapshot` layout changes. Stored snapshots with a
/// different version are rejected and the reporting loop starts from zero.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum size of an encoded snapshot (64 KB).
///
/// A snapshot is a flat record of a few dozen fields; anything larger is
/// corrupted data and is rejected before decoding.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024;

// =============================================================================
// STORAGE CATEGORIES
// =============================================================================

/// Stored profile payloads.
pub const CATEGORY_PROFILES: &str = "profiles";

/// Application registry.
pub const CATEGORY_APPS: &str = "apps";

/// Install identity and the persisted analytics snapshot.
pub const CATEGORY_METADATA: &str = "metadata";

/// Every storage category, in reporting order.
pub const STORAGE_CATEGORIES: [&str; 3] = [CATEGORY_PROFILES, CATEGORY_APPS, CATEGORY_METADATA];

// =============================================================================
// ACTIVITY KEYS
// =============================================================================

/// Application index listing.
pub const STAT_INDEX: &str = "index";

/// Two-application comparison.
pub const STAT_COMPARISON: &str = "comparison";

/// Two-application diff.
pub const STAT_DIFF: &str = "diff";

/// Profile ingestion (all sources).
pub const STAT_INGEST: &str = "ingest";

/// Single-application render.
pub const STAT_RENDER: &str = "render";

/// Profile sources with a dedicated counter. Ingests from anything else only
/// count towards [`STAT_INGEST`].
pub const INGEST_SOURCES: [&str; 7] = [
    "rbspy",
    "pyspy",
    "gospy",
    "ebpfspy",
    "phpspy",
    "dotnetspy",
    "javaspy",
];

/// Stats key for ingests coming from `source`.
#[must_use]
pub fn ingest_key(source: &str) -> String {
    format!("{STAT_INGEST}:{source}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"TLMK");
    }

    #[test]
    fn ingest_key_format() {
        assert_eq!(ingest_key("pyspy"), "ingest:pyspy");
    }
}
