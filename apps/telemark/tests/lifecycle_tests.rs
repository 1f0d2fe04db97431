//! Lifecycle tests for the analytics service.
//!
//! All tests run on a paused clock, so sleeps advance virtual time
//! deterministically. Default cadence: grace 1s, persist every 5s,
//! upload every 10s.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telemark::analytics::{AnalyticsService, LifecycleState, Report};
use telemark::config::AnalyticsConfig;
use telemark_core::{
    DiskUsage, MemoryStore, NoStats, Snapshot, SnapshotStore, TelemarkError,
};
use tokio::time::{Instant, sleep};

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Snapshot>>>);

impl Recorder {
    fn reports(&self) -> Vec<Snapshot> {
        self.0.lock().unwrap().clone()
    }
}

impl Report for Recorder {
    async fn report(&self, snapshot: &Snapshot) {
        self.0.lock().unwrap().push(snapshot.clone());
    }
}

/// Reporter that takes `delay` to deliver, logging when each upload
/// begins and ends.
#[derive(Clone)]
struct SlowReporter {
    delay: Duration,
    events: Arc<Mutex<Vec<(&'static str, Instant)>>>,
}

impl Report for SlowReporter {
    async fn report(&self, _snapshot: &Snapshot) {
        self.events.lock().unwrap().push(("begin", Instant::now()));
        sleep(self.delay).await;
        self.events.lock().unwrap().push(("end", Instant::now()));
    }
}

/// Store whose baseline cannot be read.
#[derive(Default)]
struct UnreadableStore {
    writes: AtomicUsize,
}

impl SnapshotStore for UnreadableStore {
    fn read_snapshot(&self) -> Result<Snapshot, TelemarkError> {
        Err(TelemarkError::DeserializationError("corrupt".to_string()))
    }

    fn write_snapshot(&self, _snapshot: &Snapshot) -> Result<(), TelemarkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn install_id(&self) -> Result<String, TelemarkError> {
        Ok("unreadable".to_string())
    }

    fn disk_usage(&self) -> Result<DiskUsage, TelemarkError> {
        Ok(DiskUsage::from([("profiles".to_string(), 5)]))
    }
}

fn service_over(store: Arc<dyn SnapshotStore>) -> (AnalyticsService<Recorder>, Recorder) {
    let recorder = Recorder::default();
    let service = AnalyticsService::new(
        AnalyticsConfig::default(),
        store,
        Arc::new(NoStats),
        recorder.clone(),
    );
    (service, recorder)
}

// =============================================================================
// GRACE PERIOD
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_upload_waits_for_grace() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, recorder) = service_over(store);

    service.start();
    sleep(Duration::from_millis(999)).await;
    assert!(recorder.reports().is_empty());
    assert_eq!(service.state(), LifecycleState::AwaitingGrace);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(recorder.reports().len(), 1);
    assert_eq!(service.state(), LifecycleState::Running);

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_grace_persists_once() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, recorder) = service_over(store.clone());

    service.start();
    sleep(Duration::from_millis(500)).await;
    service.stop().await;

    assert!(recorder.reports().is_empty());
    assert_eq!(store.writes(), 1);
    assert_eq!(service.state(), LifecycleState::Stopped);
}

// =============================================================================
// CADENCE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_upload_and_persist_cadence() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, recorder) = service_over(store.clone());

    service.start();
    // Uploads at 1s and 11s, persists at 6s and 11s.
    sleep(Duration::from_millis(12_500)).await;
    assert_eq!(recorder.reports().len(), 2);
    assert_eq!(store.writes(), 2);

    // Uploads at 21s, persists at 16s and 21s.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(recorder.reports().len(), 3);
    assert_eq!(store.writes(), 4);

    service.stop().await;
    assert_eq!(store.writes(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_upload_index_counts_completed_uploads() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, recorder) = service_over(store);

    service.start();
    sleep(Duration::from_millis(31_500)).await;
    service.stop().await;

    let indices: Vec<i64> = recorder.reports().iter().map(|s| s.upload_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

// =============================================================================
// MERGING
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_counters_never_compound() {
    let store = Arc::new(
        MemoryStore::new()
            .with_snapshot(Snapshot {
                storage_profiles: 100,
                ..Snapshot::zero()
            })
            .with_disk_usage(DiskUsage::from([("profiles".to_string(), 10)])),
    );
    let (mut service, recorder) = service_over(store.clone());

    service.start();
    sleep(Duration::from_millis(31_500)).await;
    service.stop().await;

    let reports = recorder.reports();
    assert!(reports.len() >= 3);
    assert!(reports.iter().all(|s| s.storage_profiles == 110));
    assert_eq!(store.last_written().unwrap().storage_profiles, 110);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_baseline_starts_from_zero() {
    let store = Arc::new(UnreadableStore::default());
    let (mut service, recorder) = service_over(store.clone());

    service.start();
    sleep(Duration::from_millis(1_500)).await;
    service.stop().await;

    let reports = recorder.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].storage_profiles, 5);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

// =============================================================================
// SHUTDOWN
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_while_running_persists_once() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, _recorder) = service_over(store.clone());

    service.start();
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(store.writes(), 0);

    service.stop().await;
    assert_eq!(store.writes(), 1);
    assert_eq!(service.state(), LifecycleState::Stopped);

    // A second stop does nothing.
    service.stop().await;
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_inflight_upload() {
    let store = Arc::new(MemoryStore::new());
    let reporter = SlowReporter {
        delay: Duration::from_secs(3),
        events: Arc::default(),
    };
    let mut service = AnalyticsService::new(
        AnalyticsConfig::default(),
        store.clone(),
        Arc::new(NoStats),
        reporter.clone(),
    );
    let started = Instant::now();

    service.start();
    // First upload begins at 1s and is still running at 1.5s.
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(reporter.events.lock().unwrap().len(), 1);

    service.stop().await;
    let stopped = Instant::now();

    let events = reporter.events.lock().unwrap().clone();
    let phases: Vec<_> = events.iter().map(|(phase, _)| *phase).collect();
    assert_eq!(phases, vec!["begin", "end"]);
    assert_eq!(events[0].1 - started, Duration::from_secs(1));
    assert_eq!(events[1].1 - started, Duration::from_secs(4));
    assert!(stopped >= events[1].1);
    assert_eq!(store.writes(), 1);
    assert_eq!(service.state(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_states_are_observable() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, _recorder) = service_over(store);
    let mut states = service.subscribe();
    assert_eq!(*states.borrow(), LifecycleState::Idle);

    service.start();
    assert_eq!(*states.borrow_and_update(), LifecycleState::AwaitingGrace);

    states
        .wait_for(|s| *s == LifecycleState::Running)
        .await
        .unwrap();

    service.stop().await;
    assert_eq!(*states.borrow(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_still_persists() {
    let store = Arc::new(MemoryStore::new());
    let (mut service, _recorder) = service_over(store.clone());
    let mut states = service.subscribe();

    service.start();
    sleep(Duration::from_millis(1_500)).await;
    drop(service);

    states
        .wait_for(|s| *s == LifecycleState::Stopped)
        .await
        .unwrap();
    assert_eq!(store.writes(), 1);
}
