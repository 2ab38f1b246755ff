//! Simple moving averages, price/MA ratios and the bullish-alignment flag.
//!
//! ma_k = mean(close[-k:]); price_to_ma_k = close[-1] / ma_k
//! ma_bullish = 1 iff MA(fast) > MA(slow)

use super::{mean, tail, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    value: Factor,
    ratio: Factor,
    name: String,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        let (value, ratio) = Factor::moving_average(period)
            .unwrap_or_else(|| panic!("no moving-average factor for period {period}"));
        Self {
            period,
            value,
            ratio,
            name: format!("ma_{period}"),
        }
    }
}

impl Indicator for MovingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        let Some(latest) = bars.last() else {
            return;
        };
        if bars.len() < self.period {
            return;
        }
        let closes: Vec<f64> = tail(bars, self.period).iter().map(|b| b.close).collect();
        let ma = mean(&closes);
        out.insert(self.value, ma);
        out.insert(self.ratio, latest.close / ma);
    }
}

/// Bullish alignment: fast MA strictly above slow MA.
#[derive(Debug, Clone)]
pub struct MaAlignment {
    fast: usize,
    slow: usize,
    name: String,
}

impl MaAlignment {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && fast < slow, "MaAlignment needs 1 <= fast < slow");
        Self {
            fast,
            slow,
            name: format!("ma_bullish_{fast}_{slow}"),
        }
    }
}

impl Indicator for MaAlignment {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.slow
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        if bars.len() < self.slow {
            return;
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = mean(tail(&closes, self.fast));
        let slow = mean(tail(&closes, self.slow));
        if fast.is_finite() && slow.is_finite() {
            out.insert_flag(Factor::MaBullish, fast > slow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ma_5_and_ratio() {
        let bars = make_bars(&[1.0, 10.0, 11.0, 12.0, 13.0, 14.0]);
        let mut out = FactorSet::new();
        MovingAverage::new(5).compute(&bars, &mut out);
        assert_approx(out.get(Factor::Ma5).unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(out.get(Factor::PriceToMa5).unwrap(), 14.0 / 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bullish_when_fast_above_slow() {
        let closes: Vec<f64> = (1..=21).map(|i| i as f64).collect();
        let mut out = FactorSet::new();
        MaAlignment::new(5, 20).compute(&make_bars(&closes), &mut out);
        assert_eq!(out.get(Factor::MaBullish), Some(1.0));
    }

    #[test]
    fn not_bullish_when_equal_or_below() {
        let flat = vec![10.0; 21];
        let mut out = FactorSet::new();
        MaAlignment::new(5, 20).compute(&make_bars(&flat), &mut out);
        assert_eq!(out.get(Factor::MaBullish), Some(0.0));

        let falling: Vec<f64> = (1..=21).rev().map(|i| i as f64).collect();
        let mut out = FactorSet::new();
        MaAlignment::new(5, 20).compute(&make_bars(&falling), &mut out);
        assert_eq!(out.get(Factor::MaBullish), Some(0.0));
    }

    #[test]
    fn too_few_bars_writes_nothing() {
        let mut out = FactorSet::new();
        MovingAverage::new(20).compute(&make_bars(&[1.0, 2.0]), &mut out);
        assert!(out.is_empty());
    }
}
