//! # Counter Merger
//!
//! Reconciles a freshly built snapshot against the durable baseline.
//!
//! The merge walks the schema table generically:
//! - `Counter` + integer accessor: `baseline + current`, saturating at `i64::MAX`
//! - `Counter` + any other accessor: reset to the type's zero value
//! - `Gauge`: copied from `current`
//!
//! Merging is pure and total. It is always computed against the baseline
//! loaded at process start, never against a previous merge result, so
//! repeated cycles do not compound.

use crate::schema::{FieldAccess, FieldSpec, SCHEMA, Snapshot, counters_in};

/// Merge `current` into `baseline` using the snapshot schema.
#[must_use]
pub fn merge(baseline: &Snapshot, current: &Snapshot) -> Snapshot {
    merge_with(SCHEMA, baseline, current)
}

/// Merge using an explicit field table.
///
/// Fields not listed in `schema` keep the value from `current`.
#[must_use]
pub fn merge_with(schema: &[FieldSpec], baseline: &Snapshot, current: &Snapshot) -> Snapshot {
    let mut merged = current.clone();

    for spec in counters_in(schema) {
        match spec.access {
            FieldAccess::Int(read, slot) => {
                *slot(&mut merged) = read(baseline).saturating_add(*read(current));
            }
            // Not summable: leave the zero value in place.
            FieldAccess::Text(slot) => *slot(&mut merged) = String::new(),
            FieldAccess::Timestamp(slot) => *slot(&mut merged) = Default::default(),
        }
    }

    merged
}
