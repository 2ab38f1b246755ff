//! Momentum — percent return from the k-th most recent close to the latest.
//!
//! momentum_k = (close[-1] / close[-k] - 1) * 100
//! Window: k.

use super::Indicator;
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    factor: Factor,
    name: String,
}

impl Momentum {
    /// Supported periods: 5, 10, 20, 60.
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        let factor = Factor::momentum(period)
            .unwrap_or_else(|| panic!("no momentum factor for period {period}"));
        Self {
            period,
            factor,
            name: format!("momentum_{period}d"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        let n = bars.len();
        if n < self.period {
            return;
        }
        let latest = bars[n - 1].close;
        let reference = bars[n - self.period].close;
        out.insert(self.factor, (latest / reference - 1.0) * 100.0);
    }
}
