//! # Formats Module
//!
//! On-disk encodings used by the persistent store.

pub mod persistence;

pub use persistence::{SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
