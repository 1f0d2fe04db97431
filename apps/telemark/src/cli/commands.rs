//! # CLI Command Implementations

use crate::analytics::AnalyticsService;
use crate::api::{self, AppState};
use crate::config::load_config;
use std::path::Path;
use std::sync::Arc;
use telemark_core::{
    RedbStore, Snapshot, SnapshotBuilder, SnapshotStore, StatsProvider, TelemarkError, merge,
};

/// Database file name inside the data directory.
const DB_FILE: &str = "telemark.redb";

/// Open (or create) the store in `data_dir`.
fn open_store(data_dir: &Path) -> Result<RedbStore, TelemarkError> {
    std::fs::create_dir_all(data_dir).map_err(|e| {
        TelemarkError::IoError(format!(
            "Cannot create data directory '{}': {}",
            data_dir.display(),
            e
        ))
    })?;
    RedbStore::open(data_dir.join(DB_FILE))
}

fn print_snapshot(snapshot: &Snapshot) -> Result<(), TelemarkError> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| TelemarkError::SerializationError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

/// Resolve on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server and, unless opted out, the analytics service.
///
/// On Ctrl+C the server drains, then the analytics service performs its
/// final persist before the process exits.
pub async fn cmd_server(
    data_dir: &Path,
    config_path: Option<&Path>,
    opt_out: bool,
    host: &str,
    port: u16,
) -> Result<(), TelemarkError> {
    let config = load_config(config_path, opt_out)?;
    let store = Arc::new(open_store(data_dir)?);
    let mut state = AppState::new(Arc::clone(&store));

    let mut service = if config.opt_out {
        tracing::info!("usage analytics disabled");
        None
    } else {
        let snapshot_store: Arc<dyn SnapshotStore> = store.clone();
        let stats: Arc<dyn StatsProvider> = state.stats.clone();
        let mut service = AnalyticsService::with_http(config, snapshot_store, stats)?;
        state = state.with_analytics(service.preview());
        service.start();
        Some(service)
    };

    println!("Telemark server starting");
    println!("  Data:      {}", data_dir.display());
    println!("  Analytics: {}", if service.is_some() { "on" } else { "off" });
    println!("Press Ctrl+C to stop");

    let addr = format!("{}:{}", host, port);
    let result = api::run_server(&addr, state, shutdown_signal()).await;

    if let Some(service) = service.as_mut() {
        service.stop().await;
    }
    result
}

// =============================================================================
// ANALYTICS COMMANDS
// =============================================================================

/// Print the persisted snapshot.
pub fn cmd_analytics_show(data_dir: &Path) -> Result<(), TelemarkError> {
    let store = open_store(data_dir)?;
    print_snapshot(&store.read_snapshot()?)
}

/// Print what the next upload would send, without persisting it.
///
/// Outside a running server there is no request activity, so only storage,
/// memory and app counts are live.
pub fn cmd_analytics_preview(data_dir: &Path) -> Result<(), TelemarkError> {
    let store = Arc::new(open_store(data_dir)?);
    let baseline = store.read_snapshot()?;
    let stats = Arc::new(api::ActivityStats::new(Arc::clone(&store)));
    let builder = SnapshotBuilder::new(store, stats, env!("CARGO_PKG_VERSION"));
    print_snapshot(&merge(&baseline, &builder.build(0)))
}
