//! Universe Filter — reduces a market-wide snapshot to a tradeable candidate pool.
//!
//! Rules are an AND-chain; a row must pass every one:
//! 1. name carries no special-treatment / delisting marker
//! 2. symbol does not start with a restricted exchange-segment prefix
//! 3. turnover >= `min_turnover`
//! 4. |pct_change| < `limit_move_pct` (the boundary itself is excluded)
//!
//! Survivors are sorted by turnover descending (stable), truncated to
//! `pool_size`, and `batch` further truncates to `batch_size` ahead of the
//! per-symbol history fetches.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Fundamentals, IndustryFlowRow, SnapshotRow};

/// Why a snapshot row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    SpecialTreatment,
    RestrictedSegment,
    LowTurnover,
    LimitMove,
    Valuation,
    MarketCap,
    Industry,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Exclusion::SpecialTreatment => "special treatment marker",
            Exclusion::RestrictedSegment => "restricted segment",
            Exclusion::LowTurnover => "turnover below floor",
            Exclusion::LimitMove => "limit move",
            Exclusion::Valuation => "valuation out of range",
            Exclusion::MarketCap => "float market cap out of range",
            Exclusion::Industry => "industry not targeted",
        };
        f.write_str(s)
    }
}

fn default_name_markers() -> Vec<String> {
    vec!["ST".to_string(), "退".to_string()]
}

fn carries_marker(name: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && name.contains(m.as_str()))
}

/// Snapshot filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilter {
    /// Substrings in the instrument name that mark special treatment or delisting.
    pub name_markers: Vec<String>,
    /// Ticker prefixes of restricted / illiquid exchange segments.
    pub restricted_prefixes: Vec<String>,
    /// Minimum session turnover, currency units.
    pub min_turnover: f64,
    /// Absolute percent change at which a row is treated as limit-locked.
    pub limit_move_pct: f64,
    pub pool_size: usize,
    pub batch_size: usize,
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self {
            name_markers: default_name_markers(),
            restricted_prefixes: vec!["4".to_string(), "8".to_string(), "92".to_string()],
            min_turnover: 50_000_000.0,
            limit_move_pct: 9.8,
            pool_size: 200,
            batch_size: 50,
        }
    }
}

impl UniverseFilter {
    /// Check one row against the rule chain, reporting the first failed rule.
    pub fn check(&self, row: &SnapshotRow) -> Result<(), Exclusion> {
        if carries_marker(&row.name, &self.name_markers) {
            return Err(Exclusion::SpecialTreatment);
        }
        if self
            .restricted_prefixes
            .iter()
            .any(|p| !p.is_empty() && row.symbol.starts_with(p.as_str()))
        {
            return Err(Exclusion::RestrictedSegment);
        }
        if row.turnover.is_nan() || row.turnover < self.min_turnover {
            return Err(Exclusion::LowTurnover);
        }
        if row.pct_change.is_nan() || row.pct_change.abs() >= self.limit_move_pct {
            return Err(Exclusion::LimitMove);
        }
        Ok(())
    }

    /// Filtered pool: passing rows by turnover descending, at most `pool_size`.
    pub fn apply(&self, snapshot: &[SnapshotRow]) -> Vec<SnapshotRow> {
        let mut pool: Vec<SnapshotRow> = snapshot
            .iter()
            .filter(|row| match self.check(row) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!(symbol = %row.symbol, %reason, "excluded from universe");
                    false
                }
            })
            .cloned()
            .collect();
        pool.sort_by(|a, b| b.turnover.total_cmp(&a.turnover));
        pool.truncate(self.pool_size);
        pool
    }

    /// Leading `batch_size` rows of a pool.
    pub fn batch<'a>(&self, pool: &'a [SnapshotRow]) -> &'a [SnapshotRow] {
        &pool[..pool.len().min(self.batch_size)]
    }

    /// `apply` followed by `batch`, owned.
    pub fn select(&self, snapshot: &[SnapshotRow]) -> Vec<SnapshotRow> {
        let pool = self.apply(snapshot);
        self.batch(&pool).to_vec()
    }
}

/// Valuation / size pre-filter run ahead of pattern detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalsFilter {
    pub name_markers: Vec<String>,
    /// Inclusive float market cap range, currency units.
    pub min_float_cap: f64,
    pub max_float_cap: f64,
    /// Exclusive P/E (TTM) range.
    pub pe_min: f64,
    pub pe_max: f64,
    /// Industries to keep; empty keeps every industry.
    pub industries: Vec<String>,
}

impl Default for FundamentalsFilter {
    fn default() -> Self {
        Self {
            name_markers: default_name_markers(),
            min_float_cap: 2_000_000_000.0,
            max_float_cap: 10_000_000_000.0,
            pe_min: 0.0,
            pe_max: 80.0,
            industries: Vec::new(),
        }
    }
}

impl FundamentalsFilter {
    pub fn check(&self, row: &Fundamentals) -> Result<(), Exclusion> {
        if carries_marker(&row.name, &self.name_markers) {
            return Err(Exclusion::SpecialTreatment);
        }
        if !(self.min_float_cap..=self.max_float_cap).contains(&row.float_market_cap) {
            return Err(Exclusion::MarketCap);
        }
        // NaN PE fails both bounds.
        let pe_in_band = row.pe_ttm > self.pe_min && row.pe_ttm < self.pe_max;
        if !pe_in_band {
            return Err(Exclusion::Valuation);
        }
        if !self.industries.is_empty() && !self.industries.iter().any(|i| *i == row.industry) {
            return Err(Exclusion::Industry);
        }
        Ok(())
    }

    /// Rows passing every rule, in input order.
    pub fn apply(&self, rows: &[Fundamentals]) -> Vec<Fundamentals> {
        rows.iter().filter(|r| self.check(r).is_ok()).cloned().collect()
    }
}

/// Advance/decline summary of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBreadth {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub flat: usize,
    pub limit_up: usize,
    pub limit_down: usize,
    pub total_turnover: f64,
    /// Share of advancing rows, percent; 0 for an empty snapshot.
    pub up_ratio_pct: f64,
}

impl MarketBreadth {
    pub fn from_snapshot(snapshot: &[SnapshotRow], limit_move_pct: f64) -> Self {
        let total = snapshot.len();
        let up = snapshot.iter().filter(|r| r.pct_change > 0.0).count();
        let down = snapshot.iter().filter(|r| r.pct_change < 0.0).count();
        let limit_up = snapshot.iter().filter(|r| r.pct_change >= limit_move_pct).count();
        let limit_down = snapshot.iter().filter(|r| r.pct_change <= -limit_move_pct).count();
        let total_turnover = snapshot
            .iter()
            .map(|r| r.turnover)
            .filter(|t| t.is_finite())
            .sum();
        let up_ratio_pct = if total == 0 {
            0.0
        } else {
            up as f64 / total as f64 * 100.0
        };
        Self {
            total,
            up,
            down,
            flat: total - up - down,
            limit_up,
            limit_down,
            total_turnover,
            up_ratio_pct,
        }
    }
}

/// Strongest net inflows and outflows across industries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryFlow {
    /// Largest net inflow first.
    pub inflow: Vec<IndustryFlowRow>,
    /// Largest net outflow first.
    pub outflow: Vec<IndustryFlowRow>,
}

impl IndustryFlow {
    /// Rank industries by net amount and keep `n` from each end.
    ///
    /// Rows with a non-finite amount are ignored. With fewer than `2n`
    /// industries the two lists overlap.
    pub fn rank(rows: &[IndustryFlowRow], n: usize) -> Self {
        let mut sorted: Vec<IndustryFlowRow> = rows
            .iter()
            .filter(|r| r.net_amount.is_finite())
            .cloned()
            .collect();
        sorted.sort_by(|a, b| b.net_amount.total_cmp(&a.net_amount));
        let inflow = sorted.iter().take(n).cloned().collect();
        let outflow = sorted.iter().rev().take(n).cloned().collect();
        Self { inflow, outflow }
    }
}
