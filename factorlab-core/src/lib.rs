//! FactorLab Core — the quantitative factor engine.
//!
//! This crate holds every numeric rule of a scan and no I/O:
//! - Domain types (bars, price/moneyflow series, snapshot rows, fundamentals)
//! - Technical indicator library behind the `Indicator` trait
//! - Capital-flow factors from moneyflow history
//! - Universe filter, fundamentals pre-filter, market breadth and industry flow ranking
//! - Composite scorer with fixed per-factor normalization curves
//! - Pullback pattern detector (explicit state machine)

pub mod domain;
pub mod error;
pub mod factors;
pub mod indicators;
pub mod moneyflow;
pub mod pattern;
pub mod scoring;
pub mod screen;
pub mod universe;

pub use domain::{
    Bar, Fundamentals, IndustryFlowRow, MoneyflowBar, MoneyflowSeries, PriceSeries, SnapshotRow,
};
pub use error::{ScanError, SeriesError};
pub use factors::{Factor, FactorSet};
pub use indicators::technical_factors;
pub use moneyflow::moneyflow_factors;
pub use pattern::{detect_pullback, PatternSignal, PullbackDetector, PullbackParams, Rejection};
pub use scoring::{composite_score, subscore, Weights};
pub use screen::{screen, ScoredCandidate};
pub use universe::{Exclusion, FundamentalsFilter, IndustryFlow, MarketBreadth, UniverseFilter};
