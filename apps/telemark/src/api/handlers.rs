//! # API Endpoint Handlers
//!
//! Every handler counts its request in [`ActivityStats`](super::ActivityStats)
//! before doing any work, so rejected requests are counted too.

use super::{
    AppState,
    types::{
        CompareQuery, ComparisonResponse, DiffResponse, ErrorResponse, HealthResponse,
        IndexResponse, IngestQuery, IngestResponse, RenderQuery, RenderResponse,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use telemark_core::{
    TelemarkError,
    primitives::{STAT_COMPARISON, STAT_DIFF, STAT_INDEX, STAT_RENDER},
};

/// Map a store error to a status code and JSON body.
fn error_response(e: &TelemarkError) -> Response {
    let status = match e {
        TelemarkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e.to_string()))).into_response()
}

fn render(state: &AppState, name: &str) -> Result<RenderResponse, TelemarkError> {
    let stats = state.store.profile_stats(name)?;
    Ok(RenderResponse::new(name, stats))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// INDEX HANDLER
// =============================================================================

/// List registered applications.
pub async fn index_handler(State(state): State<AppState>) -> Response {
    state.stats.record(STAT_INDEX);
    match state.store.apps() {
        Ok(apps) => Json(IndexResponse { apps }).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// INGEST HANDLER
// =============================================================================

/// Store one profile payload for `name`.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Query(query): Query<IngestQuery>,
    body: Bytes,
) -> impl IntoResponse {
    state.stats.record_ingest(query.from.as_deref());

    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(IngestResponse::error("empty profile payload")),
        );
    }

    match state.store.append_profile(&query.name, &body) {
        Ok(seq) => {
            tracing::debug!(app = %query.name, seq, bytes = body.len(), "profile ingested");
            (StatusCode::OK, Json(IngestResponse::success(seq)))
        }
        Err(e @ TelemarkError::InvalidInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(IngestResponse::error(e.to_string())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(IngestResponse::error(format!("Ingest failed: {}", e))),
        ),
    }
}

// =============================================================================
// RENDER HANDLERS
// =============================================================================

/// Profile totals of one application.
pub async fn render_handler(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
) -> Response {
    state.stats.record(STAT_RENDER);
    match render(&state, &query.name) {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Totals of two applications side by side.
pub async fn comparison_handler(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Response {
    state.stats.record(STAT_COMPARISON);
    let result = render(&state, &query.left)
        .and_then(|left| Ok(ComparisonResponse { left, right: render(&state, &query.right)? }));
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Difference between two applications' totals.
pub async fn diff_handler(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Response {
    state.stats.record(STAT_DIFF);
    let result = render(&state, &query.left)
        .and_then(|left| Ok(DiffResponse::between(&left, &render(&state, &query.right)?)));
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// ANALYTICS HANDLER
// =============================================================================

/// The snapshot the next upload would send.
///
/// 404 when analytics is opted out, 503 until the baseline is loaded.
pub async fn analytics_handler(State(state): State<AppState>) -> Response {
    let Some(preview) = state.analytics.as_ref() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("analytics disabled")),
        )
            .into_response();
    };
    match preview.preview() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("analytics baseline not loaded yet")),
        )
            .into_response(),
    }
}
