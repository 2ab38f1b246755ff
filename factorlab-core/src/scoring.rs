//! Composite Scorer — weighted sum of per-factor 0–100 subscores.
//!
//! Weights are taken exactly as supplied: they are not required to sum to 1
//! and are never renormalized, so a weight total above 1 can push a score
//! above 100. A factor missing from a candidate's set contributes 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::factors::{Factor, FactorSet};

/// Caller-supplied weight per factor.
///
/// Keyed by `Factor`, so iteration order is fixed regardless of the order the
/// weights were inserted or written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<Factor, f64>);

impl Weights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, factor: Factor, weight: f64) -> Self {
        self.0.insert(factor, weight);
        self
    }

    pub fn set(&mut self, factor: Factor, weight: f64) {
        self.0.insert(factor, weight);
    }

    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.0.get(&factor).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        self.0.iter().map(|(f, w)| (*f, *w))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Weights {
    /// Trend 25%, technical 20%, volume/breakout 25%, capital flow 30%.
    fn default() -> Self {
        Self::new()
            .with(Factor::Momentum20d, 0.15)
            .with(Factor::MaBullish, 0.10)
            .with(Factor::MacdCross, 0.10)
            .with(Factor::Rsi14, 0.10)
            .with(Factor::VolumeRatio5To20, 0.15)
            .with(Factor::NewHigh20, 0.10)
            .with(Factor::MainNetFlow5d, 0.20)
            .with(Factor::ConsecutiveInflowDays, 0.10)
    }
}

impl FromIterator<(Factor, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (Factor, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn clamp_pct(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Map a raw factor value onto its 0–100 subscore.
pub fn subscore(factor: Factor, v: f64) -> f64 {
    match factor {
        Factor::Momentum20d => clamp_pct((v + 10.0) / 30.0 * 100.0),
        Factor::VolumeRatio5To20 => clamp_pct(v * 50.0),
        Factor::MacdCross | Factor::MaBullish | Factor::NewHigh20 => v * 100.0,
        Factor::Rsi14 => rsi_reward(v),
        Factor::MainNetFlow5d => clamp_pct((v + 5000.0) / 10000.0 * 100.0),
        Factor::ConsecutiveInflowDays => clamp_pct(v * 20.0),
        _ => clamp_pct(v),
    }
}

/// Rewards mid-strength momentum and penalizes overbought readings.
fn rsi_reward(v: f64) -> f64 {
    if (50.0..=80.0).contains(&v) {
        100.0
    } else if (40.0..50.0).contains(&v) {
        60.0
    } else if v > 80.0 {
        30.0
    } else {
        20.0
    }
}

/// Σ weight × subscore over the weighted factors.
pub fn composite_score(factors: &FactorSet, weights: &Weights) -> f64 {
    weights
        .iter()
        .map(|(factor, weight)| match factors.get(factor) {
            Some(v) => weight * subscore(factor, v),
            None => 0.0,
        })
        .sum()
}

/// Sort descending by score, ties kept in input order, truncated to `top_n`.
pub fn rank_by_score<T>(mut items: Vec<T>, top_n: usize, score: impl Fn(&T) -> f64) -> Vec<T> {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
    items.truncate(top_n);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn momentum_curve() {
        approx(subscore(Factor::Momentum20d, -10.0), 0.0);
        approx(subscore(Factor::Momentum20d, 5.0), 50.0);
        approx(subscore(Factor::Momentum20d, 20.0), 100.0);
        approx(subscore(Factor::Momentum20d, 50.0), 100.0);
        approx(subscore(Factor::Momentum20d, -40.0), 0.0);
    }

    #[test]
    fn volume_ratio_curve() {
        approx(subscore(Factor::VolumeRatio5To20, 1.0), 50.0);
        approx(subscore(Factor::VolumeRatio5To20, 3.0), 100.0);
    }

    #[test]
    fn flag_curves() {
        for f in [Factor::MacdCross, Factor::MaBullish, Factor::NewHigh20] {
            approx(subscore(f, 1.0), 100.0);
            approx(subscore(f, 0.0), 0.0);
        }
    }

    #[test]
    fn rsi_curve_is_non_monotonic() {
        approx(subscore(Factor::Rsi14, 50.0), 100.0);
        approx(subscore(Factor::Rsi14, 80.0), 100.0);
        approx(subscore(Factor::Rsi14, 80.01), 30.0);
        approx(subscore(Factor::Rsi14, 40.0), 60.0);
        approx(subscore(Factor::Rsi14, 49.99), 60.0);
        approx(subscore(Factor::Rsi14, 39.99), 20.0);
        approx(subscore(Factor::Rsi14, 100.0), 30.0);
        approx(subscore(Factor::Rsi14, 0.0), 20.0);
    }

    #[test]
    fn flow_curves() {
        approx(subscore(Factor::MainNetFlow5d, 0.0), 50.0);
        approx(subscore(Factor::MainNetFlow5d, -5000.0), 0.0);
        approx(subscore(Factor::MainNetFlow5d, 9000.0), 100.0);
        approx(subscore(Factor::ConsecutiveInflowDays, 3.0), 60.0);
        approx(subscore(Factor::ConsecutiveInflowDays, 7.0), 100.0);
    }

    #[test]
    fn other_factors_clamped_identity() {
        approx(subscore(Factor::BollPosition, 0.7), 0.7);
        approx(subscore(Factor::AtrPct, 150.0), 100.0);
        approx(subscore(Factor::MainNetFlow, -3.0), 0.0);
    }

    #[test]
    fn missing_factor_contributes_zero() {
        let mut fs = FactorSet::new();
        fs.insert(Factor::Momentum20d, 20.0);
        let weights = Weights::new()
            .with(Factor::Momentum20d, 0.5)
            .with(Factor::Rsi14, 0.5);
        approx(composite_score(&fs, &weights), 50.0);
    }

    #[test]
    fn weights_above_one_can_exceed_100() {
        let mut fs = FactorSet::new();
        fs.insert_flag(Factor::MacdCross, true);
        fs.insert_flag(Factor::MaBullish, true);
        let weights = Weights::new()
            .with(Factor::MacdCross, 1.0)
            .with(Factor::MaBullish, 0.5);
        approx(composite_score(&fs, &weights), 150.0);
    }

    #[test]
    fn default_weights_sum_to_one() {
        approx(Weights::default().total(), 1.0);
        assert_eq!(Weights::default().len(), 8);
    }

    #[test]
    fn rank_is_stable_on_ties() {
        let items = vec![("a", 1.0), ("b", 3.0), ("c", 1.0), ("d", 3.0), ("e", 2.0)];
        let ranked = rank_by_score(items, 4, |(_, s)| *s);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "d", "e", "a"]);
    }

    #[test]
    fn weights_parse_from_json_map() {
        let w: Weights = serde_json::from_str(r#"{"rsi_14": 0.3, "momentum_20d": 0.7}"#).unwrap();
        assert_eq!(w.get(Factor::Rsi14), Some(0.3));
        assert!(serde_json::from_str::<Weights>(r#"{"bogus": 1.0}"#).is_err());
    }
}
