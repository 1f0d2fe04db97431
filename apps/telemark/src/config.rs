//! # Configuration
//!
//! Analytics settings, with defaults, an optional TOML file, and CLI overrides.
//!
//! ```toml
//! [analytics]
//! opt_out = false
//! url = "https://analytics.pyroscope.io/api/events"
//! grace_period_ms = 1000
//! snapshot_frequency_secs = 5
//! upload_frequency_secs = 10
//! timeout_secs = 60
//! ```
//!
//! Precedence (highest first): CLI flag / `TELEMARK_ANALYTICS_OPT_OUT`,
//! config file, built-in defaults.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use telemark_core::TelemarkError;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Collector endpoint for anonymized usage reports.
pub const DEFAULT_URL: &str = "https://analytics.pyroscope.io/api/events";

/// Delay between service start and the first report.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// How often the merged snapshot is persisted.
pub const DEFAULT_SNAPSHOT_FREQUENCY: Duration = Duration::from_secs(5);

/// How often the merged snapshot is uploaded.
pub const DEFAULT_UPLOAD_FREQUENCY: Duration = Duration::from_secs(10);

/// Total timeout of one upload request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// ANALYTICS CONFIG
// =============================================================================

/// Settings of the usage analytics service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsConfig {
    /// When true the host must not construct the service at all.
    pub opt_out: bool,
    pub url: String,
    pub grace_period: Duration,
    pub snapshot_frequency: Duration,
    pub upload_frequency: Duration,
    pub timeout: Duration,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            opt_out: false,
            url: DEFAULT_URL.to_string(),
            grace_period: DEFAULT_GRACE_PERIOD,
            snapshot_frequency: DEFAULT_SNAPSHOT_FREQUENCY,
            upload_frequency: DEFAULT_UPLOAD_FREQUENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AnalyticsConfig {
    /// Reject settings the reporting loop cannot run with.
    pub fn validate(&self) -> Result<(), TelemarkError> {
        if self.snapshot_frequency.is_zero() || self.upload_frequency.is_zero() {
            return Err(TelemarkError::InvalidInput(
                "analytics frequencies must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(TelemarkError::InvalidInput(
                "analytics timeout must be greater than zero".to_string(),
            ));
        }
        if self.url.is_empty() {
            return Err(TelemarkError::InvalidInput(
                "analytics url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Overlay values present in a config file section.
    fn apply(&mut self, section: AnalyticsSection) {
        if let Some(opt_out) = section.opt_out {
            self.opt_out = opt_out;
        }
        if let Some(url) = section.url {
            self.url = url;
        }
        if let Some(ms) = section.grace_period_ms {
            self.grace_period = Duration::from_millis(ms);
        }
        if let Some(secs) = section.snapshot_frequency_secs {
            self.snapshot_frequency = Duration::from_secs(secs);
        }
        if let Some(secs) = section.upload_frequency_secs {
            self.upload_frequency = Duration::from_secs(secs);
        }
        if let Some(secs) = section.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
    }
}

// =============================================================================
// CONFIG FILE
// =============================================================================

/// Top-level layout of `telemark.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    analytics: AnalyticsSection,
}

/// The `[analytics]` table. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AnalyticsSection {
    opt_out: Option<bool>,
    url: Option<String>,
    grace_period_ms: Option<u64>,
    snapshot_frequency_secs: Option<u64>,
    upload_frequency_secs: Option<u64>,
    timeout_secs: Option<u64>,
}

/// Parse config file contents on top of the defaults.
pub fn parse_config(contents: &str) -> Result<AnalyticsConfig, TelemarkError> {
    let file: FileConfig = toml::from_str(contents)
        .map_err(|e| TelemarkError::DeserializationError(format!("Invalid config: {}", e)))?;
    let mut config = AnalyticsConfig::default();
    config.apply(file.analytics);
    config.validate()?;
    Ok(config)
}

/// Load the analytics config.
///
/// `path = None` yields the defaults. `opt_out_flag` comes from the CLI or
/// environment and can only turn analytics off, never back on.
pub fn load_config(
    path: Option<&Path>,
    opt_out_flag: bool,
) -> Result<AnalyticsConfig, TelemarkError> {
    let mut config = match path {
        Some(path) => {
            let metadata = std::fs::metadata(path).map_err(|e| {
                TelemarkError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
            })?;
            if metadata.len() > MAX_CONFIG_FILE_SIZE {
                return Err(TelemarkError::InvalidInput(format!(
                    "Config file {} bytes exceeds maximum allowed {} bytes",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                )));
            }
            let contents = std::fs::read_to_string(path).map_err(|e| {
                TelemarkError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
            })?;
            parse_config(&contents)?
        }
        None => AnalyticsConfig::default(),
    };

    if opt_out_flag {
        config.opt_out = true;
    }
    Ok(config)
}
