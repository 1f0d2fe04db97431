//! # Telemark HTTP API Module
//!
//! The host's profile API, served with axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /` - List registered applications
//! - `POST /ingest?name=&from=` - Store a profile payload
//! - `GET /render?name=` - Profile totals of one application
//! - `GET /comparison?left=&right=` - Totals of two applications
//! - `GET /diff?left=&right=` - Difference of two applications
//! - `GET /analytics` - Preview of the next usage report

mod activity;
mod handlers;
mod types;

pub use activity::ActivityStats;
pub use types::{
    CompareQuery, ComparisonResponse, DiffResponse, ErrorResponse, HealthResponse, IndexResponse,
    IngestQuery, IngestResponse, RenderQuery, RenderResponse,
};

use crate::analytics::AnalyticsPreview;
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use telemark_core::{RedbStore, TelemarkError};
use tower_http::trace::TraceLayer;

/// Maximum accepted profile payload (8 MB).
const MAX_PROFILE_BODY: usize = 8 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<RedbStore>,
    pub stats: Arc<ActivityStats>,
    /// `None` when analytics is opted out.
    pub analytics: Option<AnalyticsPreview>,
}

impl AppState {
    /// State with fresh activity counters over `store`.
    #[must_use]
    pub fn new(store: Arc<RedbStore>) -> Self {
        Self {
            stats: Arc::new(ActivityStats::new(Arc::clone(&store))),
            store,
            analytics: None,
        }
    }

    /// Expose an analytics preview on `GET /analytics`.
    #[must_use]
    pub fn with_analytics(mut self, preview: AnalyticsPreview) -> Self {
        self.analytics = Some(preview);
        self
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/health", get(handlers::health_handler))
        .route("/ingest", post(handlers::ingest_handler))
        .route("/render", get(handlers::render_handler))
        .route("/comparison", get(handlers::comparison_handler))
        .route("/diff", get(handlers::diff_handler))
        .route("/analytics", get(handlers::analytics_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_PROFILE_BODY))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn run_server(
    addr: &str,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), TelemarkError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TelemarkError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Telemark HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TelemarkError::IoError(format!("Server error: {}", e)))
}
