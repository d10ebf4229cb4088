//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for assembly, caching, and refresh passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cache window length in days (epoch-aligned).
    pub cache_window_days: u32,

    /// Gap-filling lookback length in days.
    pub lookback_days: u32,

    /// Whether the window-average and imputed fallbacks run at all.
    pub fill_gaps_enabled: bool,

    /// Whether the periodic midnight refresh loop runs.
    pub refresh_enabled: bool,

    /// How many trailing days a refresh pass revises.
    pub revise_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_window_days: 5,
            lookback_days: 5,
            fill_gaps_enabled: true,
            refresh_enabled: true,
            revise_days: 5,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CACHE_WINDOW_DAYS") {
            if let Ok(days) = val.parse() {
                config.cache_window_days = days;
            }
        }

        if let Ok(val) = std::env::var("LOOKBACK_DAYS") {
            if let Ok(days) = val.parse() {
                config.lookback_days = days;
            }
        }

        if let Ok(val) = std::env::var("FILL_GAPS_ENABLED") {
            config.fill_gaps_enabled = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("DAILY_REFRESH_ENABLED") {
            config.refresh_enabled = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("REVISE_DAYS") {
            if let Ok(days) = val.parse() {
                config.revise_days = days;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_window_days == 0 {
            return Err("cache_window_days must be > 0".to_string());
        }
        if self.lookback_days == 0 {
            return Err("lookback_days must be > 0".to_string());
        }
        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
