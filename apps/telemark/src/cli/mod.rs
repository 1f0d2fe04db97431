//! # Telemark CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server and the usage analytics service
//! - `analytics show` - Print the persisted usage snapshot
//! - `analytics preview` - Print the snapshot the next upload would send

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use telemark_core::TelemarkError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Telemark - profile server with anonymized usage analytics
#[derive(Parser, Debug)]
#[command(name = "telemark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the database
    #[arg(short = 'd', long, global = true, default_value = "telemark-data")]
    pub data_dir: PathBuf,

    /// Optional TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable anonymized usage reporting
    #[arg(long, global = true, env = "TELEMARK_ANALYTICS_OPT_OUT")]
    pub analytics_opt_out: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "4040")]
        port: u16,
    },

    /// Inspect usage analytics
    Analytics {
        #[command(subcommand)]
        action: AnalyticsCommand,
    },
}

/// `analytics` subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsCommand {
    /// Print the persisted snapshot as JSON
    Show,
    /// Build and merge a snapshot without persisting or uploading it
    Preview,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TelemarkError> {
    match cli.command {
        Commands::Server { host, port } => {
            cmd_server(
                &cli.data_dir,
                cli.config.as_deref(),
                cli.analytics_opt_out,
                &host,
                port,
            )
            .await
        }
        Commands::Analytics {
            action: AnalyticsCommand::Show,
        } => cmd_analytics_show(&cli.data_dir),
        Commands::Analytics {
            action: AnalyticsCommand::Preview,
        } => cmd_analytics_preview(&cli.data_dir),
    }
}
