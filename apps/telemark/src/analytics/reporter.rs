//! # Reporter
//!
//! Best-effort delivery of a merged snapshot to the collector.
//!
//! One JSON POST per call, bounded by the client's total timeout. Every
//! failure is logged and swallowed: no retry, no backoff, no queue.

use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::time::Duration;
use telemark_core::{Snapshot, TelemarkError};

/// Delivery seam used by the analytics loop.
///
/// Implementations must never fail the caller. The returned future is awaited
/// inline by the loop, so a slow report delays the next cycle.
pub trait Report: Send + Sync + 'static {
    fn report(&self, snapshot: &Snapshot) -> impl Future<Output = ()> + Send;
}

/// Reports snapshots over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReporter {
    http: reqwest::Client,
    url: String,
}

impl HttpReporter {
    /// Create a reporter posting to `url` with a total request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TelemarkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .user_agent(concat!("telemark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TelemarkError::IoError(format!("Cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// The collector endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Report for HttpReporter {
    async fn report(&self, snapshot: &Snapshot) {
        tracing::debug!(upload_index = snapshot.upload_index, "sending analytics report");

        let body = match serde_json::to_vec(snapshot) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode analytics report");
                return;
            }
        };

        let response = match self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "failed to upload anonymized usage data");
                return;
            }
        };

        let status = response.status();
        if let Err(e) = response.bytes().await {
            tracing::error!(error = %e, "failed to read collector response");
            return;
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "collector rejected analytics report");
        }
    }
}
