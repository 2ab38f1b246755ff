//! Breakout flags relative to the recent high/low range.
//!
//! new_high = 1 iff close[-1] >= 0.98 * max(high[-period:])
//! new_low  = 1 iff close[-1] <= 1.02 * min(low[-period:])
//! Window: period.

use super::{tail, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

/// Closing within this fraction of the range extreme counts as a breakout.
const PROXIMITY: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct Breakout {
    period: usize,
    high: Factor,
    low: Option<Factor>,
    name: String,
}

impl Breakout {
    pub fn new(period: usize, high: Factor, low: Option<Factor>) -> Self {
        assert!(period >= 1, "Breakout period must be >= 1");
        Self {
            period,
            high,
            low,
            name: format!("breakout_{period}"),
        }
    }
}

impl Indicator for Breakout {
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
        let window = tail(bars, self.period);
        let max_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        if max_high.is_finite() {
            out.insert_flag(self.high, latest.close >= (1.0 - PROXIMITY) * max_high);
        }
        if let Some(low) = self.low {
            if min_low.is_finite() {
                out.insert_flag(low, latest.close <= (1.0 + PROXIMITY) * min_low);
            }
        }
    }
}
