//! Error taxonomy for the factor engine.
//!
//! None of these escape a scan: per-symbol failures degrade to exclusion
//! from the output collection. Weight maps are never validated or
//! renormalized, so there is no configuration error variant here.

use chrono::NaiveDate;
use thiserror::Error;

/// Why a symbol (or one of its factors) was left out of a scan result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("rate limited by {provider} while fetching {symbol}")]
    RateLimited { symbol: String, provider: String },

    #[error("timed out after {after_ms}ms fetching {symbol} from {provider}")]
    Timeout {
        symbol: String,
        provider: String,
        after_ms: u64,
    },

    #[error("{indicator} skipped for {symbol}: needs {required} bars, have {available}")]
    ComputationSkipped {
        symbol: String,
        indicator: String,
        required: usize,
        available: usize,
    },
}

impl ScanError {
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Symbol the error refers to.
    pub fn symbol(&self) -> &str {
        match self {
            Self::DataUnavailable { symbol, .. }
            | Self::RateLimited { symbol, .. }
            | Self::Timeout { symbol, .. }
            | Self::ComputationSkipped { symbol, .. } => symbol,
        }
    }
}

/// Series construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("bar {index} dated {date} is not after its predecessor")]
    NotAscending { index: usize, date: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_accessor_covers_all_variants() {
        let errs = [
            ScanError::data_unavailable("600000.SH", "empty series"),
            ScanError::RateLimited {
                symbol: "600000.SH".into(),
                provider: "csv".into(),
            },
            ScanError::Timeout {
                symbol: "600000.SH".into(),
                provider: "csv".into(),
                after_ms: 20_000,
            },
            ScanError::ComputationSkipped {
                symbol: "600000.SH".into(),
                indicator: "rsi_14".into(),
                required: 15,
                available: 3,
            },
        ];
        for e in &errs {
            assert_eq!(e.symbol(), "600000.SH");
        }
    }

    #[test]
    fn display_is_readable() {
        let e = ScanError::Timeout {
            symbol: "000001.SZ".into(),
            provider: "primary".into(),
            after_ms: 1500,
        };
        assert_eq!(
            e.to_string(),
            "timed out after 1500ms fetching 000001.SZ from primary"
        );
    }
}
