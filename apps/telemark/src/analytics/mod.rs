//! # Usage Analytics
//!
//! Background service that periodically reconciles a usage snapshot against
//! the durable baseline, persists it, and uploads it to the collector.
//!
//! By default the server sends anonymized usage data. Only high-level counts
//! are collected (number of apps, ingests per profiler, storage sizes).
//! Disable it with `--analytics-opt-out` or `TELEMARK_ANALYTICS_OPT_OUT=true`;
//! the service is then never constructed.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start()--> AwaitingGrace --grace--> Running --stop()--> Stopping --> Stopped
//!                         |                                        ^
//!                         +----------------stop()------------------+
//! ```
//!
//! The whole loop runs on one tokio task and handles one event at a time:
//! - grace timer (one-shot): first upload, then the recurring timers start
//! - upload timer: build, merge, report
//! - snapshot timer: build, merge, persist
//! - stop signal: one final build, merge, persist, then exit
//!
//! The baseline is read once when the task starts and never replaced. Each
//! cycle merges a fresh build against it, so counters never compound.

mod reporter;

pub use reporter::{HttpReporter, Report};

use crate::config::AnalyticsConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use telemark_core::{Snapshot, SnapshotBuilder, SnapshotStore, StatsProvider, merge};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

// =============================================================================
// LIFECYCLE STATE
// =============================================================================

/// Observable state of the analytics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, not started.
    Idle,
    /// Baseline loaded, waiting for the grace period.
    AwaitingGrace,
    /// Timers running.
    Running,
    /// Final persist in progress.
    Stopping,
    /// Loop finished.
    Stopped,
}

// =============================================================================
// PREVIEW
// =============================================================================

/// Read-only view of what the next upload would contain.
///
/// Cheap to clone; handed to the HTTP API.
#[derive(Debug, Clone)]
pub struct AnalyticsPreview {
    builder: SnapshotBuilder,
    baseline: Arc<OnceLock<Snapshot>>,
    uploads: Arc<AtomicU64>,
}

impl AnalyticsPreview {
    /// Build and merge a snapshot without persisting or uploading it.
    ///
    /// Returns `None` until the service has loaded its baseline.
    #[must_use]
    pub fn preview(&self) -> Option<Snapshot> {
        let baseline = self.baseline.get()?;
        let current = self.builder.build(self.uploads.load(Ordering::Relaxed));
        Some(merge(baseline, &current))
    }

    /// Number of upload cycles completed so far.
    #[must_use]
    pub fn uploads(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }
}

// =============================================================================
// SERVICE HANDLE
// =============================================================================

/// Handle owning the analytics loop.
///
/// Construct once per process, `start()` it, and `stop().await` it during
/// shutdown. Dropping the handle without stopping also ends the loop after
/// its final persist, but nothing waits for it.
pub struct AnalyticsService<R: Report = HttpReporter> {
    config: AnalyticsConfig,
    builder: SnapshotBuilder,
    reporter: Option<R>,
    baseline: Arc<OnceLock<Snapshot>>,
    uploads: Arc<AtomicU64>,
    state_tx: Option<watch::Sender<LifecycleState>>,
    state_rx: watch::Receiver<LifecycleState>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<R: Report> std::fmt::Debug for AnalyticsService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AnalyticsService<HttpReporter> {
    /// Service reporting to the configured collector over HTTP.
    pub fn with_http(
        config: AnalyticsConfig,
        store: Arc<dyn SnapshotStore>,
        stats: Arc<dyn StatsProvider>,
    ) -> Result<Self, telemark_core::TelemarkError> {
        config.validate()?;
        let reporter = HttpReporter::new(config.url.clone(), config.timeout)?;
        Ok(Self::new(config, store, stats, reporter))
    }
}

impl<R: Report> AnalyticsService<R> {
    /// Create an idle service.
    pub fn new(
        config: AnalyticsConfig,
        store: Arc<dyn SnapshotStore>,
        stats: Arc<dyn StatsProvider>,
        reporter: R,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(LifecycleState::Idle);
        Self {
            config,
            builder: SnapshotBuilder::new(store, stats, env!("CARGO_PKG_VERSION")),
            reporter: Some(reporter),
            baseline: Arc::new(OnceLock::new()),
            uploads: Arc::new(AtomicU64::new(0)),
            state_tx: Some(state_tx),
            state_rx,
            stop_tx: None,
            task: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state_rx.borrow()
    }

    /// Subscribe to lifecycle transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    /// A preview handle sharing this service's baseline and upload count.
    #[must_use]
    pub fn preview(&self) -> AnalyticsPreview {
        AnalyticsPreview {
            builder: self.builder.clone(),
            baseline: Arc::clone(&self.baseline),
            uploads: Arc::clone(&self.uploads),
        }
    }

    /// Spawn the analytics loop on the current tokio runtime.
    ///
    /// Calling `start()` more than once has no effect.
    pub fn start(&mut self) {
        let (Some(reporter), Some(state_tx)) = (self.reporter.take(), self.state_tx.take()) else {
            tracing::warn!("analytics service already started");
            return;
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        state_tx.send_replace(LifecycleState::AwaitingGrace);

        let worker = Worker {
            config: self.config.clone(),
            builder: self.builder.clone(),
            reporter,
            baseline: Arc::clone(&self.baseline),
            uploads: Arc::clone(&self.uploads),
            state: state_tx,
        };

        tracing::info!(
            url = %self.config.url,
            upload_every = ?self.config.upload_frequency,
            snapshot_every = ?self.config.snapshot_frequency,
            "analytics service started"
        );

        self.stop_tx = Some(stop_tx);
        self.task = Some(tokio::spawn(worker.run(stop_rx)));
    }

    /// Stop the loop and wait for its final persist.
    ///
    /// Stopping an idle or already stopped service returns immediately.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = task.await {
            tracing::error!(error = %e, "analytics task ended abnormally");
        }
    }
}

// =============================================================================
// WORKER (loop state, owned by the task)
// =============================================================================

struct Worker<R: Report> {
    config: AnalyticsConfig,
    builder: SnapshotBuilder,
    reporter: R,
    baseline: Arc<OnceLock<Snapshot>>,
    uploads: Arc<AtomicU64>,
    state: watch::Sender<LifecycleState>,
}

impl<R: Report> Worker<R> {
    async fn run(self, mut stop: oneshot::Receiver<()>) {
        let baseline = self.load_baseline();
        let baseline = self.baseline.get_or_init(|| baseline).clone();

        let grace = tokio::time::sleep(self.config.grace_period);
        tokio::select! {
            _ = &mut stop => {
                tracing::debug!("analytics stopped during grace period");
                self.shutdown(&baseline);
                return;
            }
            () = grace => {}
        }

        self.state.send_replace(LifecycleState::Running);
        self.upload_cycle(&baseline).await;

        let now = Instant::now();
        let mut upload = interval_at(
            now + self.config.upload_frequency,
            self.config.upload_frequency,
        );
        upload.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut snapshot = interval_at(
            now + self.config.snapshot_frequency,
            self.config.snapshot_frequency,
        );
        snapshot.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = upload.tick() => self.upload_cycle(&baseline).await,
                _ = snapshot.tick() => self.persist_cycle(&baseline),
            }
        }

        self.shutdown(&baseline);
    }

    /// Read the persisted baseline; failures start from zero.
    fn load_baseline(&self) -> Snapshot {
        match self.builder.store().read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load analytics baseline, starting from zero");
                Snapshot::zero()
            }
        }
    }

    fn merged(&self, baseline: &Snapshot) -> Snapshot {
        let current = self.builder.build(self.uploads.load(Ordering::Relaxed));
        merge(baseline, &current)
    }

    async fn upload_cycle(&self, baseline: &Snapshot) {
        let merged = self.merged(baseline);
        self.reporter.report(&merged).await;
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    fn persist_cycle(&self, baseline: &Snapshot) {
        let merged = self.merged(baseline);
        match self.builder.store().write_snapshot(&merged) {
            Ok(()) => tracing::debug!("analytics snapshot persisted"),
            Err(e) => tracing::warn!(error = %e, "failed to persist analytics snapshot"),
        }
    }

    fn shutdown(&self, baseline: &Snapshot) {
        self.state.send_replace(LifecycleState::Stopping);
        self.persist_cycle(baseline);
        self.state.send_replace(LifecycleState::Stopped);
        tracing::info!("analytics service stopped");
    }
}
