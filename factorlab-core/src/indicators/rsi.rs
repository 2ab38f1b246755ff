//! Relative Strength Index over the latest percent changes.
//!
//! avg_gain = mean(max(p, 0)), avg_loss = mean(max(-p, 0)) over the last
//! `period` values of `pct_change`.
//! RSI = 100 when avg_loss == 0, else 100 - 100 / (1 + avg_gain / avg_loss).
//! Window: period.

use super::{tail, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        if bars.len() < self.period {
            return;
        }
        let changes: Vec<f64> = tail(bars, self.period).iter().map(|b| b.pct_change).collect();
        if changes.iter().any(|c| c.is_nan()) {
            return;
        }
        if let Some(value) = rsi_from_changes(&changes) {
            // Only the 14-period RSI has a factor slot.
            if self.period == 14 {
                out.insert(Factor::Rsi14, value);
            }
        }
    }
}

/// RSI from a window of percent changes; `None` for an empty window.
pub fn rsi_from_changes(changes: &[f64]) -> Option<f64> {
    if changes.is_empty() {
        return None;
    }
    let n = changes.len() as f64;
    let avg_gain = changes.iter().map(|c| c.max(0.0)).sum::<f64>() / n;
    let avg_loss = changes.iter().map(|c| (-c).max(0.0)).sum::<f64>() / n;
    if avg_loss == 0.0 {
        Some(100.0)
    } else {
        Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn all_gains_is_exactly_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let mut out = FactorSet::new();
        Rsi::new(14).compute(&make_bars(&closes), &mut out);
        assert_eq!(out.get(Factor::Rsi14), Some(100.0));
    }

    #[test]
    fn flat_window_is_100() {
        // No losses at all, including no gains.
        let mut out = FactorSet::new();
        Rsi::new(14).compute(&make_bars(&[10.0; 15]), &mut out);
        assert_eq!(out.get(Factor::Rsi14), Some(100.0));
    }

    #[test]
    fn all_losses_is_zero() {
        assert_approx(rsi_from_changes(&[-1.0, -2.0, -0.5]).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn mixed_changes() {
        // gains = 2 + 1 = 3, losses = 1 → ratio 3 → RSI = 75
        assert_approx(rsi_from_changes(&[2.0, -1.0, 1.0, 0.0]).unwrap(), 75.0, 1e-12);
    }

    #[test]
    fn uses_only_latest_period_changes() {
        // Big loss early, then 14 gains: the loss is outside the window.
        let mut closes = vec![100.0, 50.0];
        closes.extend((1..=14).map(|i| 50.0 + i as f64));
        let mut out = FactorSet::new();
        Rsi::new(14).compute(&make_bars(&closes), &mut out);
        assert_eq!(out.get(Factor::Rsi14), Some(100.0));
    }
}
