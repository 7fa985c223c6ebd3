//! Server configuration

use anyhow::{Context, Result};

use crate::sweeper::SweepConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Path to the SQLite database file; in-memory stores when unset
    pub database: Option<String>,

    /// Gemini API key
    pub gemini_api_key: String,

    /// Gemini model identifier
    pub gemini_model: String,

    /// Per-request timeout for Gemini calls, in seconds
    pub gemini_timeout_secs: u64,

    /// Expiry sweeper timing
    pub sweep: SweepConfig,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `GEMINI_API_KEY` is required; everything else has a default:
    /// - `PORT` (default: 3000)
    /// - `ATENEO_DB` (default: unset, keep everything in memory)
    /// - `GEMINI_MODEL` (default: "gemini-2.0-flash")
    /// - `GEMINI_TIMEOUT_SECS` (default: 30)
    /// - `EXPIRY_THRESHOLD_SECS` (default: 86400)
    /// - `ALERT_WINDOW_SECS` (default: 7200)
    /// - `SWEEP_INTERVAL_SECS` (default: 3600)
    ///
    /// Malformed numeric values fall back to their defaults.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key =
            std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?;

        let port = env_parsed("PORT", 3000);

        let database = std::env::var("ATENEO_DB").ok().filter(|s| !s.is_empty());

        let gemini_model = std::env::var("GEMINI_MODEL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "gemini-2.0-flash".to_string());

        let gemini_timeout_secs = env_parsed("GEMINI_TIMEOUT_SECS", 30);

        let sweep = SweepConfig {
            expiry_threshold_secs: env_parsed("EXPIRY_THRESHOLD_SECS", 24 * 60 * 60),
            alert_window_secs: env_parsed("ALERT_WINDOW_SECS", 2 * 60 * 60),
            sweep_interval_secs: env_parsed("SWEEP_INTERVAL_SECS", 60 * 60),
        };

        Ok(Self {
            port,
            database,
            gemini_api_key,
            gemini_model,
            gemini_timeout_secs,
            sweep,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
