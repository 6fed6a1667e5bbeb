// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Every tunable parameter of the scanner lives here.  Persistence uses an
// atomic tmp + rename pattern to prevent corruption on crash, and all fields
// carry serde defaults so that adding new fields never breaks loading an
// older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default config file path, relative to the working directory.
pub const CONFIG_PATH: &str = "voltscan_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "R_10".to_string(),
        "R_25".to_string(),
        "R_50".to_string(),
        "R_75".to_string(),
        "R_100".to_string(),
    ]
}

fn default_display_symbol() -> String {
    "R_75".to_string()
}

fn default_endpoint() -> String {
    "wss://ws.binaryws.com/websockets/v3".to_string()
}

fn default_app_id() -> String {
    "1089".to_string()
}

fn default_timeframe_minutes() -> u32 {
    5
}

// =============================================================================
// ScannerConfig
// =============================================================================

/// Top-level runtime configuration for the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Volatility indices the scanner tracks.  Fixed for the lifetime of the
    /// process; order matters — it is the tie-break order for ranked scans.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// The instrument whose full indicator series is exposed to the chart
    /// collaborator.
    #[serde(default = "default_display_symbol")]
    pub display_symbol: String,

    /// Deriv WebSocket endpoint (without the app_id query parameter).
    #[serde(default = "default_endpoint")]
    pub deriv_endpoint: String,

    /// Deriv application id appended to the endpoint URL.
    #[serde(default = "default_app_id")]
    pub deriv_app_id: String,

    /// Default signal validity timeframe in minutes, used when a scan
    /// request does not specify one.
    #[serde(default = "default_timeframe_minutes")]
    pub default_timeframe_minutes: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            display_symbol: default_display_symbol(),
            deriv_endpoint: default_endpoint(),
            deriv_app_id: default_app_id(),
            default_timeframe_minutes: default_timeframe_minutes(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            display = %config.display_symbol,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise scanner config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "scanner config saved (atomic)");
        Ok(())
    }
}
