//! # telemark-core
//!
//! The usage-snapshot engine for Telemark - THE LOGIC.
//!
//! This crate owns everything about a usage snapshot that does not involve
//! time or the network:
//! - `schema`: the `Snapshot` record and its static counter/gauge table
//! - `merge`: reconciliation of a fresh snapshot against the durable baseline
//! - `builder`: assembly of a snapshot from live signals
//! - `store`: the persistence capability and its in-memory and redb backends
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never initiates work; the reporting loop in the app drives every call
//! - Never logs: failures are returned as `TelemarkError` and the caller
//!   decides how to degrade

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod formats;
pub mod merge;
pub mod primitives;
pub mod schema;
pub mod store;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use builder::{FixedStats, SnapshotBuilder};
pub use formats::{SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
pub use merge::{merge, merge_with};
pub use schema::{
    FieldAccess, FieldKind, FieldSpec, SCHEMA, Snapshot, counter_fields, counters_in, field_spec,
};
pub use store::{MemoryStore, ProfileStats, RedbStore, SnapshotStore};
pub use system::MemoryStats;
pub use types::{DiskUsage, NoStats, StatsProvider, TelemarkError};
