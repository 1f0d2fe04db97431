//! # Snapshot Schema
//!
//! The usage snapshot and its static field table.
//!
//! Every field of [`Snapshot`] is listed exactly once in [`SCHEMA`], together
//! with its merge kind:
//!
//! | Kind      | Merge behaviour                              |
//! |-----------|----------------------------------------------|
//! | `Counter` | `baseline + current` (saturating)            |
//! | `Gauge`   | `current`, baseline value discarded          |
//!
//! Adding a field means adding it to the struct and one line to the table.
//! The merge algorithm in [`crate::merge`] never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A point-in-time usage record.
///
/// Field names are the wire names (snake_case JSON keys).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub install_id: String,
    pub run_id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub upload_index: i64,
    pub os: String,
    pub arch: String,
    pub family: String,
    pub mem_resident: i64,
    pub mem_peak_resident: i64,
    pub mem_virtual: i64,
    pub mem_threads: i64,
    pub storage_profiles: i64,
    pub storage_apps: i64,
    pub storage_metadata: i64,
    pub controller_index: i64,
    pub controller_comparison: i64,
    pub controller_diff: i64,
    pub controller_ingest: i64,
    pub controller_render: i64,
    pub spy_rbspy: i64,
    pub spy_pyspy: i64,
    pub spy_gospy: i64,
    pub spy_ebpfspy: i64,
    pub spy_phpspy: i64,
    pub spy_dotnetspy: i64,
    pub spy_javaspy: i64,
    pub apps_count: i64,
}

impl Snapshot {
    /// The all-zero snapshot used as the baseline on a first run.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }
}

// =============================================================================
// FIELD TABLE
// =============================================================================

/// How a field is reconciled against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Additive across process restarts.
    Counter,
    /// Identity or point-in-time value; the newest value wins.
    Gauge,
}

/// Typed access to one field of a [`Snapshot`].
#[derive(Clone, Copy)]
pub enum FieldAccess {
    /// Integer field: shared read and mutable slot.
    Int(fn(&Snapshot) -> &i64, fn(&mut Snapshot) -> &mut i64),
    /// String field.
    Text(fn(&mut Snapshot) -> &mut String),
    /// Timestamp field.
    Timestamp(fn(&mut Snapshot) -> &mut DateTime<Utc>),
}

/// One row of the schema table.
#[derive(Clone, Copy)]
pub struct FieldSpec {
    /// Wire name of the field.
    pub name: &'static str,
    /// Merge classification.
    pub kind: FieldKind,
    /// Accessor into the struct.
    pub access: FieldAccess,
}

impl FieldSpec {
    /// Whether this field is summed during a merge.
    #[must_use]
    pub fn is_counter(&self) -> bool {
        self.kind == FieldKind::Counter
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let access = match self.access {
            FieldAccess::Int(..) => "int",
            FieldAccess::Text(_) => "text",
            FieldAccess::Timestamp(_) => "timestamp",
        };
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("access", &access)
            .finish()
    }
}

/// Build a [`FieldSpec`] row for a named `Snapshot` field.
macro_rules! field {
    (int $name:ident, $kind:ident) => {
        FieldSpec {
            name: stringify!($name),
            kind: FieldKind::$kind,
            access: FieldAccess::Int(
                {
                    fn read(s: &Snapshot) -> &i64 {
                        &s.$name
                    }
                    read
                },
                {
                    fn slot(s: &mut Snapshot) -> &mut i64 {
                        &mut s.$name
                    }
                    slot
                },
            ),
        }
    };
    (text $name:ident) => {
        FieldSpec {
            name: stringify!($name),
            kind: FieldKind::Gauge,
            access: FieldAccess::Text({
                fn slot(s: &mut Snapshot) -> &mut String {
                    &mut s.$name
                }
                slot
            }),
        }
    };
    (timestamp $name:ident) => {
        FieldSpec {
            name: stringify!($name),
            kind: FieldKind::Gauge,
            access: FieldAccess::Timestamp({
                fn slot(s: &mut Snapshot) -> &mut DateTime<Utc> {
                    &mut s.$name
                }
                slot
            }),
        }
    };
}

#[cfg(test)]
pub(crate) use field;

/// The snapshot schema, in declaration order.
pub static SCHEMA: &[FieldSpec] = &[
    field!(text install_id),
    field!(text run_id),
    field!(text version),
    field!(timestamp timestamp),
    field!(int upload_index, Gauge),
    field!(text os),
    field!(text arch),
    field!(text family),
    field!(int mem_resident, Gauge),
    field!(int mem_peak_resident, Gauge),
    field!(int mem_virtual, Gauge),
    field!(int mem_threads, Gauge),
    field!(int storage_profiles, Counter),
    field!(int storage_apps, Counter),
    field!(int storage_metadata, Counter),
    field!(int controller_index, Gauge),
    field!(int controller_comparison, Gauge),
    field!(int controller_diff, Gauge),
    field!(int controller_ingest, Gauge),
    field!(int controller_render, Gauge),
    field!(int spy_rbspy, Gauge),
    field!(int spy_pyspy, Gauge),
    field!(int spy_gospy, Gauge),
    field!(int spy_ebpfspy, Gauge),
    field!(int spy_phpspy, Gauge),
    field!(int spy_dotnetspy, Gauge),
    field!(int spy_javaspy, Gauge),
    field!(int apps_count, Gauge),
];

/// Look up a schema row by wire name.
#[must_use]
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    SCHEMA.iter().find(|spec| spec.name == name)
}

/// Iterate over the counter rows of the schema.
pub fn counter_fields() -> impl Iterator<Item = &'static FieldSpec> {
    counters_in(SCHEMA)
}

/// Iterate over the counter rows of any field table.
pub fn counters_in(schema: &[FieldSpec]) -> impl Iterator<Item = &FieldSpec> {
    schema.iter().filter(|spec| spec.is_counter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn field_names_are_unique() {
        let names: BTreeSet<_> = SCHEMA.iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), SCHEMA.len());
    }

    #[test]
    fn storage_sizes_are_the_only_counters() {
        let counters: Vec<_> = counter_fields().map(|spec| spec.name).collect();
        assert_eq!(
            counters,
            vec!["storage_profiles", "storage_apps", "storage_metadata"]
        );
    }

    #[test]
    fn counters_in_filters_custom_tables() {
        let table = [field!(text version), field!(int upload_index, Counter)];
        let names: Vec<_> = counters_in(&table).map(|spec| spec.name).collect();
        assert_eq!(names, vec!["upload_index"]);
    }

    #[test]
    fn accessor_reaches_named_field() {
        let mut snapshot = Snapshot::zero();
        snapshot.apps_count = 7;

        let spec = field_spec("apps_count").expect("apps_count row");
        match spec.access {
            FieldAccess::Int(read, slot) => {
                assert_eq!(*read(&snapshot), 7);
                *slot(&mut snapshot) = 9;
            }
            _ => unreachable!("apps_count is an integer field"),
        }
        assert_eq!(snapshot.apps_count, 9);
    }

    #[test]
    fn unknown_field_lookup_is_none() {
        assert!(field_spec("badger_main").is_none());
    }
}
