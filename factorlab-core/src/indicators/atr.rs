//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR = simple mean of the last `period` true ranges; atr_pct = ATR / close * 100.
//! Window: period (each true range needs the previous close).

use super::{mean, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range of `bar` given the previous bar's close.
pub fn true_range(bar: &Bar, prev_close: f64) -> f64 {
    let (h, l) = (bar.high, bar.low);
    (h - l).max((h - prev_close).abs()).max((l - prev_close).abs())
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        let n = bars.len();
        if n < self.period + 1 {
            return;
        }
        let ranges: Vec<f64> = ((n - self.period)..n)
            .map(|i| true_range(&bars[i], bars[i - 1].close))
            .collect();
        let atr = mean(&ranges);
        if self.period == 14 {
            out.insert(Factor::Atr14, atr);
        }
        out.insert(Factor::AtrPct, atr / bars[n - 1].close * 100.0);
    }
}
