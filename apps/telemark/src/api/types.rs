//! # API Request/Response Types
//!
//! JSON structures and query strings of the host API.

use serde::{Deserialize, Serialize};
use telemark_core::ProfileStats;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// INDEX RESPONSE
// =============================================================================

/// Registered applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub apps: Vec<String>,
}

// =============================================================================
// INGEST
// =============================================================================

/// Query string of `POST /ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestQuery {
    pub name: String,
    /// Profiler that produced the payload, e.g. `pyspy`.
    #[serde(default)]
    pub from: Option<String>,
}

/// Ingest result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    #[must_use]
    pub fn success(sequence: u64) -> Self {
        Self {
            success: true,
            sequence: Some(sequence),
            error: None,
        }
    }

    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            sequence: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// RENDER / COMPARISON / DIFF
// =============================================================================

/// Query string of `GET /render`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderQuery {
    pub name: String,
}

/// Query string of `GET /comparison` and `GET /diff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareQuery {
    pub left: String,
    pub right: String,
}

/// Profile totals of one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub name: String,
    pub profiles: u64,
    pub bytes: u64,
}

impl RenderResponse {
    #[must_use]
    pub fn new(name: impl Into<String>, stats: ProfileStats) -> Self {
        Self {
            name: name.into(),
            profiles: stats.profiles,
            bytes: stats.bytes,
        }
    }
}

/// Side-by-side totals of two applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResponse {
    pub left: RenderResponse,
    pub right: RenderResponse,
}

/// Difference `right - left` of two applications' totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResponse {
    pub left: String,
    pub right: String,
    pub profiles_delta: i64,
    pub bytes_delta: i64,
}

impl DiffResponse {
    #[must_use]
    pub fn between(left: &RenderResponse, right: &RenderResponse) -> Self {
        let delta = |l: u64, r: u64| {
            i64::try_from(r)
                .unwrap_or(i64::MAX)
                .saturating_sub(i64::try_from(l).unwrap_or(i64::MAX))
        };
        Self {
            left: left.name.clone(),
            right: right.name.clone(),
            profiles_delta: delta(left.profiles, right.profiles),
            bytes_delta: delta(left.bytes, right.bytes),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
