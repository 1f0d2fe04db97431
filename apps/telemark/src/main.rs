//! # Telemark - Profile Server
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    apps/telemark (THE BINARY)                │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │    Analytics     │  │
//! │  │  (clap)     │    │   (axum)    │    │ (tokio+reqwest)  │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘  │
//! │         └──────────────────┼────────────────────┘            │
//! │                            ▼                                 │
//! │                   ┌────────────────┐                         │
//! │                   │ telemark-core  │                         │
//! │                   │ (snapshots,    │                         │
//! │                   │  merge, redb)  │                         │
//! │                   └────────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! telemark server --host 0.0.0.0 --port 4040
//! telemark --analytics-opt-out server
//! telemark analytics show
//! ```

use clap::Parser;
use telemark::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // TELEMARK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TELEMARK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "telemark=info,tower_http=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        println!("telemark v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
