//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over market-data sources (CSV directory,
//! synthetic generator, fallback chains, caches) so the pipelines never know
//! where their inputs come from and tests can swap in fakes.

use chrono::NaiveDate;
use factorlab_core::{
    Fundamentals, IndustryFlowRow, MoneyflowSeries, PriceSeries, ScanError, SnapshotRow,
};
use thiserror::Error;

/// One of the data operations a provider may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Snapshot,
    PriceHistory,
    Moneyflow,
    Fundamentals,
    IndustryFlow,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Snapshot => "snapshot",
            Operation::PriceHistory => "price_history",
            Operation::Moneyflow => "moneyflow",
            Operation::Fundamentals => "fundamentals",
            Operation::IndustryFlow => "industry_flow",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("{provider} does not serve {operation}")]
    Unsupported {
        provider: String,
        operation: Operation,
    },

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("{provider} timed out after {after_ms}ms")]
    Timeout { provider: String, after_ms: u64 },

    #[error("malformed data in {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("all {attempts} provider(s) failed for {operation} {key}")]
    AllProvidersFailed {
        operation: Operation,
        key: String,
        attempts: usize,
        /// Error of the last provider tried, if any.
        last: Option<Box<DataError>>,
    },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn unsupported(provider: &str, operation: Operation) -> Self {
        DataError::Unsupported {
            provider: provider.to_string(),
            operation,
        }
    }

    /// Map a provider failure onto the scan error taxonomy.
    ///
    /// Rate limiting and timeouts stay distinct (the last attempt of a chain
    /// decides); everything else is `DataUnavailable`.
    pub fn to_scan_error(&self, symbol: &str) -> ScanError {
        match self {
            DataError::RateLimited { provider } => ScanError::RateLimited {
                symbol: symbol.to_string(),
                provider: provider.clone(),
            },
            DataError::Timeout { provider, after_ms } => ScanError::Timeout {
                symbol: symbol.to_string(),
                provider: provider.clone(),
                after_ms: *after_ms,
            },
            DataError::AllProvidersFailed { last: Some(last), .. } => last.to_scan_error(symbol),
            other => ScanError::data_unavailable(symbol, other.to_string()),
        }
    }
}

/// Trait for market-data providers.
///
/// Every operation defaults to `DataError::Unsupported`, so a source only
/// implements what it actually serves. Date ranges are inclusive.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Market-wide snapshot of the latest session.
    fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
        Err(DataError::unsupported(self.name(), Operation::Snapshot))
    }

    /// Adjusted daily OHLCV history, ascending by date.
    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let _ = (symbol, start, end);
        Err(DataError::unsupported(self.name(), Operation::PriceHistory))
    }

    /// Daily order-flow history, ascending by date.
    fn moneyflow(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MoneyflowSeries, DataError> {
        let _ = (symbol, start, end);
        Err(DataError::unsupported(self.name(), Operation::Moneyflow))
    }

    /// Market cap / valuation table for the whole market.
    fn fundamentals(&self) -> Result<Vec<Fundamentals>, DataError> {
        Err(DataError::unsupported(self.name(), Operation::Fundamentals))
    }

    /// Net main-force flow per industry for the latest session.
    fn industry_flows(&self) -> Result<Vec<IndustryFlowRow>, DataError> {
        Err(DataError::unsupported(self.name(), Operation::IndustryFlow))
    }
}

/// Progress callback for multi-symbol scans.
pub trait ScanProgress: Send + Sync {
    /// Called once the candidate list is known.
    fn on_start(&self, total: usize);

    /// Called after each symbol's fetch completes or fails.
    fn on_symbol(&self, symbol: &str, index: usize, total: usize, outcome: Result<(), &ScanError>);

    /// Called when the scan is done.
    fn on_complete(&self, succeeded: usize, skipped: usize);
}

/// Progress reporter that writes through `tracing`.
pub struct TracingProgress;

impl ScanProgress for TracingProgress {
    fn on_start(&self, total: usize) {
        tracing::info!(total, "scanning candidates");
    }

    fn on_symbol(&self, symbol: &str, index: usize, total: usize, outcome: Result<(), &ScanError>) {
        match outcome {
            Ok(()) => tracing::debug!("[{}/{}] {symbol} fetched", index + 1, total),
            Err(e) => tracing::warn!(symbol, error = %e, "[{}/{}] skipped", index + 1, total),
        }
    }

    fn on_complete(&self, succeeded: usize, skipped: usize) {
        tracing::info!(succeeded, skipped, "scan complete");
    }
}

/// Progress reporter that ignores every event.
pub struct SilentProgress;

impl ScanProgress for SilentProgress {
    fn on_start(&self, _total: usize) {}
    fn on_symbol(&self, _symbol: &str, _index: usize, _total: usize, _outcome: Result<(), &ScanError>) {}
    fn on_complete(&self, _succeeded: usize, _skipped: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl DataProvider for Empty {
        fn name(&self) -> &str {
            "empty"
        }
    }

    #[test]
    fn every_operation_defaults_to_unsupported() {
        let p = Empty;
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(matches!(p.snapshot(), Err(DataError::Unsupported { .. })));
        assert!(matches!(
            p.price_history("X", day, day),
            Err(DataError::Unsupported { operation: Operation::PriceHistory, .. })
        ));
        assert!(matches!(p.moneyflow("X", day, day), Err(DataError::Unsupported { .. })));
        assert!(matches!(p.fundamentals(), Err(DataError::Unsupported { .. })));
        assert!(matches!(
            p.industry_flows(),
            Err(DataError::Unsupported { operation: Operation::IndustryFlow, .. })
        ));
    }

    #[test]
    fn rate_limit_and_timeout_stay_distinct() {
        let rl = DataError::RateLimited { provider: "p".into() }.to_scan_error("600000.SH");
        assert!(matches!(rl, ScanError::RateLimited { .. }));

        let to = DataError::Timeout { provider: "p".into(), after_ms: 20 }.to_scan_error("600000.SH");
        assert!(matches!(to, ScanError::Timeout { after_ms: 20, .. }));

        let nf = DataError::NotFound { symbol: "600000.SH".into() }.to_scan_error("600000.SH");
        assert!(matches!(nf, ScanError::DataUnavailable { .. }));
        assert_eq!(nf.symbol(), "600000.SH");
    }

    #[test]
    fn chain_failure_maps_through_last_attempt() {
        let err = DataError::AllProvidersFailed {
            operation: Operation::PriceHistory,
            key: "000001.SZ".into(),
            attempts: 2,
            last: Some(Box::new(DataError::Timeout { provider: "slow".into(), after_ms: 5 })),
        };
        assert!(matches!(err.to_scan_error("000001.SZ"), ScanError::Timeout { .. }));
    }
}
