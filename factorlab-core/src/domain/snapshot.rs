//! Market-wide snapshot rows, per-symbol fundamentals and industry flows.

use serde::{Deserialize, Serialize};

/// One instrument in a market-wide snapshot.
///
/// `turnover` is the traded monetary value for the session, in currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub industry: String,
    pub pct_change: f64,
    pub turnover: f64,
}

/// Valuation attributes used to pre-filter the pullback universe.
///
/// `float_market_cap` is in currency units; `pe_ttm` may be negative for
/// loss-making companies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub industry: String,
    pub float_market_cap: f64,
    pub pe_ttm: f64,
}

/// Net main-force flow into one industry for the latest session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryFlowRow {
    pub industry: String,
    /// Net inflow in currency units; negative for net outflow.
    pub net_amount: f64,
}
