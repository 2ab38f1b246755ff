//! Serializable scan configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config and a
//! partial one only overrides what it names.

use factorlab_core::{FundamentalsFilter, PullbackParams, UniverseFilter, Weights};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Tolerance for the "weights sum to 1" warning.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Full configuration of a screening or pullback scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of ranked candidates kept.
    pub top_n: usize,
    pub universe: UniverseFilter,
    /// Factor name → weight. Used as given; never renormalized.
    pub weights: Weights,
    pub pullback: PullbackConfig,
    pub fundamentals: FundamentalsFilter,
    pub fetch: FetchPolicy,
    pub cache: CacheConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            top_n: 30,
            universe: UniverseFilter::default(),
            weights: Weights::default(),
            pullback: PullbackConfig::default(),
            fundamentals: FundamentalsFilter::default(),
            fetch: FetchPolicy::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Pullback detector gates plus the history the scan fetches for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullbackConfig {
    #[serde(flatten)]
    pub params: PullbackParams,
    /// Histories shorter than this are skipped before detection.
    pub min_history: usize,
    /// Calendar days of history requested per symbol.
    pub lookback_days: u32,
}

impl Default for PullbackConfig {
    fn default() -> Self {
        Self {
            params: PullbackParams::default(),
            min_history: 40,
            lookback_days: 120,
        }
    }
}

/// Per-symbol fetch pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Minimum gap between consecutive per-symbol requests.
    pub min_delay_ms: u64,
    /// Upper bound on one provider call inside a fallback chain.
    pub timeout_ms: u64,
    /// Calendar days of history requested for screening.
    pub history_days: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 50,
            timeout_ms: 20_000,
            history_days: 90,
        }
    }
}

/// Time-to-live per cached operation, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub snapshot_ttl_secs: u64,
    pub price_history_ttl_secs: u64,
    pub moneyflow_ttl_secs: u64,
    pub fundamentals_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: 600,
            price_history_ttl_secs: 900,
            moneyflow_ttl_secs: 900,
            fundamentals_ttl_secs: 7200,
        }
    }
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no scan can run with.
    ///
    /// The weight map is deliberately not checked here; see `warn_on_weights`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid {
                field: "top_n",
                reason: "must be at least 1".into(),
            });
        }
        if self.universe.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "universe.batch_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.fundamentals.min_float_cap > self.fundamentals.max_float_cap {
            return Err(ConfigError::Invalid {
                field: "fundamentals.min_float_cap",
                reason: "exceeds max_float_cap".into(),
            });
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.timeout_ms",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Log a warning when the weights do not sum to 1. Returns the sum.
    pub fn warn_on_weights(&self) -> f64 {
        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            tracing::warn!(total, "factor weights do not sum to 1; scores are not on a 0-100 scale");
        }
        total
    }
}
