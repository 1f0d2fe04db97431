//! # redb-backed Storage
//!
//! A disk-backed store using the redb embedded database.
//!
//! One database file holds both the host's data and the analytics state:
//! - `profiles`: ingested profile payloads, keyed by `(app, sequence)`
//! - `apps`: application registry, name -> first-seen unix time
//! - `metadata`: install id and the persisted analytics snapshot
//!
//! redb provides crash safety (copy-on-write B-trees) and MVCC, so the host's
//! request handlers and the reporting loop can share one handle.

use super::SnapshotStore;
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::primitives::STORAGE_CATEGORIES;
use crate::{DiskUsage, Snapshot, TelemarkError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for profiles: (app name, sequence) -> raw payload bytes
const PROFILES: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("profiles");

/// Table for the app registry: app name -> first-seen unix seconds
const APPS: TableDefinition<&str, i64> = TableDefinition::new("apps");

/// Table for metadata: key string -> bytes
const METADATA: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Metadata key holding the install id (UTF-8).
const INSTALL_ID_KEY: &str = "install_id";

/// Metadata key holding the encoded analytics snapshot.
const ANALYTICS_KEY: &str = "analytics";

/// Maximum length of an application name.
pub const MAX_APP_NAME_LENGTH: usize = 256;

/// Convert any redb error into a `TelemarkError`.
fn io_err(e: impl std::fmt::Display) -> TelemarkError {
    TelemarkError::IoError(e.to_string())
}

/// Stored profile totals for one application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    /// Number of stored profiles.
    pub profiles: u64,
    /// Total payload bytes.
    pub bytes: u64,
}

/// A disk-backed store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Install id, created on first open and never changed afterwards.
    install_id: String,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("install_id", &self.install_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    ///
    /// A new install id is generated the first time a database is created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TelemarkError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        let install_id = {
            let write_txn = db.begin_write().map_err(io_err)?;
            let install_id = {
                let _ = write_txn.open_table(PROFILES).map_err(io_err)?;
                let _ = write_txn.open_table(APPS).map_err(io_err)?;
                let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;

                let existing = meta
                    .get(INSTALL_ID_KEY)
                    .map_err(io_err)?
                    .map(|v| String::from_utf8_lossy(v.value()).into_owned());

                match existing {
                    Some(id) if !id.is_empty() => id,
                    _ => {
                        let id = uuid::Uuid::new_v4().to_string();
                        meta.insert(INSTALL_ID_KEY, id.as_bytes()).map_err(io_err)?;
                        id
                    }
                }
            };
            write_txn.commit().map_err(io_err)?;
            install_id
        };

        Ok(Self { db, install_id })
    }

    // =========================================================================
    // HOST DATA
    // =========================================================================

    /// Register an application. Returns `true` if it was not known before.
    pub fn register_app(&self, name: &str) -> Result<bool, TelemarkError> {
        validate_app_name(name)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let inserted = {
            let mut apps = write_txn.open_table(APPS).map_err(io_err)?;
            let known = apps.get(name).map_err(io_err)?.is_some();
            if !known {
                apps.insert(name, chrono::Utc::now().timestamp())
                    .map_err(io_err)?;
            }
            !known
        };
        write_txn.commit().map_err(io_err)?;
        Ok(inserted)
    }

    /// Store a profile payload for `app`, registering the app if needed.
    ///
    /// Returns the sequence number assigned to the payload.
    pub fn append_profile(&self, app: &str, payload: &[u8]) -> Result<u64, TelemarkError> {
        validate_app_name(app)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let seq = {
            let mut profiles = write_txn.open_table(PROFILES).map_err(io_err)?;
            let next = profiles
                .range((app, 0u64)..=(app, u64::MAX))
                .map_err(io_err)?
                .next_back()
                .transpose()
                .map_err(io_err)?
                .map(|(key, _)| key.value().1.saturating_add(1))
                .unwrap_or(0);
            profiles.insert((app, next), payload).map_err(io_err)?;

            let mut apps = write_txn.open_table(APPS).map_err(io_err)?;
            if apps.get(app).map_err(io_err)?.is_none() {
                apps.insert(app, chrono::Utc::now().timestamp())
                    .map_err(io_err)?;
            }
            next
        };
        write_txn.commit().map_err(io_err)?;
        Ok(seq)
    }

    /// All registered application names, sorted.
    pub fn apps(&self) -> Result<Vec<String>, TelemarkError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let apps = read_txn.open_table(APPS).map_err(io_err)?;
        let mut names = Vec::new();
        for entry in apps.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            names.push(key.value().to_string());
        }
        Ok(names)
    }

    /// Number of registered applications.
    pub fn apps_count(&self) -> Result<u64, TelemarkError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let apps = read_txn.open_table(APPS).map_err(io_err)?;
        apps.len().map_err(io_err)
    }

    /// Profile totals for one application. Unknown apps report zeros.
    pub fn profile_stats(&self, app: &str) -> Result<ProfileStats, TelemarkError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let profiles = read_txn.open_table(PROFILES).map_err(io_err)?;
        let mut stats = ProfileStats::default();
        for entry in profiles
            .range((app, 0u64)..=(app, u64::MAX))
            .map_err(io_err)?
        {
            let (_, value) = entry.map_err(io_err)?;
            stats.profiles += 1;
            stats.bytes = stats.bytes.saturating_add(value.value().len() as u64);
        }
        Ok(stats)
    }
}

/// Reject empty or oversized app names.
fn validate_app_name(name: &str) -> Result<(), TelemarkError> {
    if name.is_empty() || name.len() > MAX_APP_NAME_LENGTH {
        return Err(TelemarkError::InvalidInput(format!(
            "app name must be 1..={} bytes",
            MAX_APP_NAME_LENGTH
        )));
    }
    Ok(())
}

impl SnapshotStore for RedbStore {
    fn read_snapshot(&self) -> Result<Snapshot, TelemarkError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let meta = read_txn.open_table(METADATA).map_err(io_err)?;
        match meta.get(ANALYTICS_KEY).map_err(io_err)? {
            Some(value) => snapshot_from_bytes(value.value()),
            None => Ok(Snapshot::zero()),
        }
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), TelemarkError> {
        let bytes = snapshot_to_bytes(snapshot)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(ANALYTICS_KEY, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn install_id(&self) -> Result<String, TelemarkError> {
        Ok(self.install_id.clone())
    }

    /// Stored bytes of each table, as reported by redb.
    fn disk_usage(&self) -> Result<DiskUsage, TelemarkError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let sizes = [
            stored_bytes(&read_txn.open_table(PROFILES).map_err(io_err)?)?,
            stored_bytes(&read_txn.open_table(APPS).map_err(io_err)?)?,
            stored_bytes(&read_txn.open_table(METADATA).map_err(io_err)?)?,
        ];
        Ok(STORAGE_CATEGORIES
            .iter()
            .zip(sizes)
            .map(|(category, size)| (category.to_string(), size))
            .collect())
    }
}

/// Bytes redb holds for one table's keys and values.
fn stored_bytes(table: &impl ReadableTableMetadata) -> Result<i64, TelemarkError> {
    let stats = table.stats().map_err(io_err)?;
    Ok(i64::try_from(stats.stored_bytes()).unwrap_or(i64::MAX))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::primitives::{CATEGORY_APPS, CATEGORY_METADATA, CATEGORY_PROFILES};
    use tempfile::tempdir;

    #[test]
    fn fresh_store_reads_zero_snapshot() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        assert_eq!(store.read_snapshot().expect("read"), Snapshot::zero());
    }

    #[test]
    fn install_id_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let first = {
            let store = RedbStore::open(&db_path).expect("open db");
            store.install_id().expect("id")
        };
        let store = RedbStore::open(&db_path).expect("reopen db");

        assert!(!first.is_empty());
        assert_eq!(store.install_id().expect("id"), first);
    }

    #[test]
    fn snapshot_persists_across_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let snapshot = Snapshot {
            storage_profiles: 10,
            apps_count: 4,
            ..Snapshot::zero()
        };

        {
            let store = RedbStore::open(&db_path).expect("open db");
            store.write_snapshot(&snapshot).expect("write");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        assert_eq!(store.read_snapshot().expect("read"), snapshot);
    }

    #[test]
    fn profiles_are_sequenced_per_app() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        assert_eq!(store.append_profile("api", b"aaaa").expect("append"), 0);
        assert_eq!(store.append_profile("api", b"bb").expect("append"), 1);
        assert_eq!(store.append_profile("worker", b"c").expect("append"), 0);

        let stats = store.profile_stats("api").expect("stats");
        assert_eq!(stats, ProfileStats { profiles: 2, bytes: 6 });
        assert_eq!(store.profile_stats("missing").expect("stats"), ProfileStats::default());
        assert_eq!(store.apps().expect("apps"), vec!["api", "worker"]);
        assert_eq!(store.apps_count().expect("count"), 2);
    }

    #[test]
    fn register_app_is_idempotent() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        assert!(store.register_app("api").expect("register"));
        assert!(!store.register_app("api").expect("register"));
        assert!(store.register_app("").is_err());
        assert_eq!(store.apps_count().expect("count"), 1);
    }

    #[test]
    fn disk_usage_covers_every_category() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.append_profile("api", &[0u8; 100]).expect("append");

        let usage = store.disk_usage().expect("usage");
        let keys: Vec<&str> = usage.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![CATEGORY_APPS, CATEGORY_METADATA, CATEGORY_PROFILES]);
        assert!(usage[CATEGORY_PROFILES] >= 100);
        assert!(usage[CATEGORY_APPS] > 0);
        // Install id is always present.
        assert!(usage[CATEGORY_METADATA] > 0);
    }

    #[test]
    fn disk_usage_tracks_stored_bytes() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.append_profile("api", &[7u8; 4096]).expect("append");
        let before = store.disk_usage().expect("usage")[CATEGORY_PROFILES];

        store.append_profile("api", &[7u8; 4096]).expect("append");
        let after = store.disk_usage().expect("usage")[CATEGORY_PROFILES];

        assert!(after >= before + 4096);
        let stored = {
            let read_txn = store.db.begin_read().expect("txn");
            let table = read_txn.open_table(PROFILES).expect("table");
            table.stats().expect("stats").stored_bytes()
        };
        assert_eq!(after, stored as i64);
    }

    #[test]
    fn corrupted_snapshot_is_an_error() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        {
            let write_txn = store.db.begin_write().expect("txn");
            {
                let mut meta = write_txn.open_table(METADATA).expect("table");
                meta.insert(ANALYTICS_KEY, b"garbage".as_slice()).expect("insert");
            }
            write_txn.commit().expect("commit");
        }
        assert!(store.read_snapshot().is_err());
    }
}
