//! FactorLab Runner — data plumbing and scan orchestration.
//!
//! This crate builds on `factorlab-core` to provide:
//! - Typed TOML scan configuration
//! - The `DataProvider` abstraction with CSV and synthetic sources
//! - Ordered provider fallback with per-provider timeout
//! - TTL cache keyed by operation, arguments and time bucket
//! - Rate-limited screening and pullback pipelines
//! - JSON / CSV export

pub mod cache;
pub mod chain;
pub mod config;
pub mod csv_source;
pub mod export;
pub mod pipeline;
pub mod provider;
pub mod synthetic;
pub mod throttle;

pub use cache::{CachedProvider, Clock, ManualClock, SystemClock, TtlCache};
pub use chain::{AttemptOutcome, FetchAttempt, ProviderChain, MAX_STALLED_WORKERS};
pub use config::{CacheConfig, ConfigError, FetchPolicy, PullbackConfig, ScanConfig};
pub use csv_source::CsvProvider;
pub use export::{
    export_pullback_csv, export_pullback_json, export_ranked_csv, export_ranked_json,
    write_report, Report,
};
pub use pipeline::{
    run_breadth, run_pullback_scan, run_screen, PullbackHit, PullbackReport, ScreenReport,
    INDUSTRY_FLOW_TOP,
};
pub use provider::{DataError, DataProvider, Operation, ScanProgress, SilentProgress, TracingProgress};
pub use synthetic::SyntheticProvider;
pub use throttle::RateLimiter;
