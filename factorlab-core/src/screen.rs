//! Multi-factor screening entry point.
//!
//! snapshot → UniverseFilter → per-candidate technical + moneyflow factors →
//! composite score → ranked list. A candidate without price history is
//! dropped; a candidate without moneyflow history is scored without the
//! capital-flow factors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{MoneyflowSeries, PriceSeries, SnapshotRow};
use crate::error::ScanError;
use crate::factors::FactorSet;
use crate::indicators::IndicatorSet;
use crate::moneyflow::moneyflow_factors;
use crate::scoring::{composite_score, rank_by_score, Weights};
use crate::universe::UniverseFilter;

/// A scored member of the candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub symbol: String,
    pub name: String,
    pub industry: String,
    pub pct_change: f64,
    pub turnover: f64,
    pub factors: FactorSet,
    pub composite_score: f64,
}

/// Factors for one candidate, or why it cannot be scored.
pub fn candidate_factors(
    indicators: &IndicatorSet,
    symbol: &str,
    prices: Option<&PriceSeries>,
    flows: Option<&MoneyflowSeries>,
) -> Result<FactorSet, ScanError> {
    let prices = match prices {
        Some(p) if !p.is_empty() => p,
        Some(_) => return Err(ScanError::data_unavailable(symbol, "empty price history")),
        None => return Err(ScanError::data_unavailable(symbol, "no price history")),
    };
    let (mut factors, skipped) = indicators.evaluate_traced(symbol, prices);
    for skip in &skipped {
        tracing::debug!("{skip}");
    }
    if let Some(flows) = flows {
        factors.extend(moneyflow_factors(flows));
    }
    Ok(factors)
}

/// Score a candidate from its factor set.
pub fn score_candidate(row: &SnapshotRow, factors: FactorSet, weights: &Weights) -> ScoredCandidate {
    let composite_score = composite_score(&factors, weights);
    ScoredCandidate {
        symbol: row.symbol.clone(),
        name: row.name.clone(),
        industry: row.industry.clone(),
        pct_change: row.pct_change,
        turnover: row.turnover,
        factors,
        composite_score,
    }
}

/// Score already-filtered candidates and return the `top_n` best.
///
/// Candidates that cannot be scored are returned alongside as skip records.
pub fn rank_candidates(
    candidates: &[SnapshotRow],
    price_history: &HashMap<String, PriceSeries>,
    moneyflow_history: &HashMap<String, MoneyflowSeries>,
    weights: &Weights,
    top_n: usize,
) -> (Vec<ScoredCandidate>, Vec<ScanError>) {
    let indicators = IndicatorSet::standard();
    let mut scored = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();

    for row in candidates {
        match candidate_factors(
            &indicators,
            &row.symbol,
            price_history.get(&row.symbol),
            moneyflow_history.get(&row.symbol),
        ) {
            Ok(factors) => scored.push(score_candidate(row, factors, weights)),
            Err(e) => {
                tracing::debug!("skipping candidate: {e}");
                skipped.push(e);
            }
        }
    }

    (rank_by_score(scored, top_n, |c| c.composite_score), skipped)
}

/// Screen a market snapshot with the default universe filter.
pub fn screen(
    universe_snapshot: &[SnapshotRow],
    price_history_by_symbol: &HashMap<String, PriceSeries>,
    moneyflow_history_by_symbol: &HashMap<String, MoneyflowSeries>,
    weights: &Weights,
    top_n: usize,
) -> Vec<ScoredCandidate> {
    screen_with_filter(
        &UniverseFilter::default(),
        universe_snapshot,
        price_history_by_symbol,
        moneyflow_history_by_symbol,
        weights,
        top_n,
    )
}

/// Screen a market snapshot with an explicit universe filter.
pub fn screen_with_filter(
    filter: &UniverseFilter,
    universe_snapshot: &[SnapshotRow],
    price_history_by_symbol: &HashMap<String, PriceSeries>,
    moneyflow_history_by_symbol: &HashMap<String, MoneyflowSeries>,
    weights: &Weights,
    top_n: usize,
) -> Vec<ScoredCandidate> {
    let candidates = filter.select(universe_snapshot);
    rank_candidates(
        &candidates,
        price_history_by_symbol,
        moneyflow_history_by_symbol,
        weights,
        top_n,
    )
    .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::Factor;
    use crate::indicators::make_bars;

    fn row(symbol: &str, turnover: f64) -> SnapshotRow {
        SnapshotRow {
            symbol: symbol.into(),
            name: format!("name-{symbol}"),
            industry: "电子".into(),
            pct_change: 1.0,
            turnover,
        }
    }

    fn rising(n: usize, step: f64) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 10.0 + step * i as f64).collect();
        PriceSeries::new(make_bars(&closes)).unwrap()
    }

    #[test]
    fn candidate_without_prices_is_dropped() {
        let snapshot = vec![row("000001.SZ", 1e9), row("000002.SZ", 2e9)];
        let mut prices = HashMap::new();
        prices.insert("000001.SZ".to_string(), rising(30, 0.1));
        prices.insert("000002.SZ".to_string(), PriceSeries::empty());

        let (ranked, skipped) =
            rank_candidates(&snapshot, &prices, &HashMap::new(), &Weights::default(), 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "000001.SZ");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].symbol(), "000002.SZ");
    }

    #[test]
    fn stronger_trend_ranks_first() {
        let snapshot = vec![row("000001.SZ", 1e9), row("000002.SZ", 2e9)];
        let mut prices = HashMap::new();
        prices.insert("000001.SZ".to_string(), rising(70, 0.2));
        prices.insert("000002.SZ".to_string(), rising(70, -0.05));
        let weights = Weights::new().with(Factor::Momentum20d, 1.0);

        let ranked = screen(&snapshot, &prices, &HashMap::new(), &weights, 10);
        assert_eq!(ranked[0].symbol, "000001.SZ");
        assert!(ranked[0].composite_score > ranked[1].composite_score);
    }

    #[test]
    fn ties_keep_filtered_order() {
        // Equal factor sets → equal scores; the filter orders by turnover.
        let snapshot = vec![row("000001.SZ", 1e9), row("000002.SZ", 2e9)];
        let mut prices = HashMap::new();
        prices.insert("000001.SZ".to_string(), rising(30, 0.1));
        prices.insert("000002.SZ".to_string(), rising(30, 0.1));
        let ranked = screen(&snapshot, &prices, &HashMap::new(), &Weights::default(), 10);
        let symbols: Vec<&str> = ranked.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["000002.SZ", "000001.SZ"]);
    }

    #[test]
    fn filtered_rows_never_scored() {
        let mut limit = row("000003.SZ", 5e9);
        limit.pct_change = 10.0;
        let snapshot = vec![limit, row("000001.SZ", 1e9)];
        let mut prices = HashMap::new();
        prices.insert("000003.SZ".to_string(), rising(30, 0.1));
        prices.insert("000001.SZ".to_string(), rising(30, 0.1));
        let ranked = screen(&snapshot, &prices, &HashMap::new(), &Weights::default(), 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "000001.SZ");
    }

    #[test]
    fn top_n_truncates() {
        let snapshot: Vec<SnapshotRow> = (0..5).map(|i| row(&format!("00000{i}.SZ"), 1e9)).collect();
        let prices: HashMap<String, PriceSeries> = snapshot
            .iter()
            .map(|r| (r.symbol.clone(), rising(25, 0.1)))
            .collect();
        let ranked = screen(&snapshot, &prices, &HashMap::new(), &Weights::default(), 3);
        assert_eq!(ranked.len(), 3);
    }
}
