//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! middle = mean(close[-period:]); sd = sample standard deviation (n - 1)
//! upper/lower = middle +/- mult * sd
//! position = (close - lower) / (upper - lower), 0 at the lower band, 1 at the upper.
//! Window: period. Position is omitted when the bands collapse (sd == 0).

use super::{mean, tail, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self {
            period,
            multiplier,
            name: format!("bollinger_{period}_{multiplier}"),
        }
    }
}

impl Indicator for Bollinger {
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
        let middle = mean(&closes);
        let var = closes.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / (self.period - 1) as f64;
        let sd = var.sqrt();
        let upper = middle + self.multiplier * sd;
        let lower = middle - self.multiplier * sd;

        out.insert(Factor::BollUpper, upper);
        out.insert(Factor::BollLower, lower);
        if upper > lower {
            out.insert(Factor::BollPosition, (latest.close - lower) / (upper - lower));
        }
    }
}
