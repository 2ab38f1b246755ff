//! Consecutive up days: trailing bars with pct_change > 0, counted backward
//! from the latest bar and stopping at the first non-positive one.

use super::Indicator;
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct UpStreak;

impl Indicator for UpStreak {
    fn name(&self) -> &str {
        "consecutive_up_days"
    }

    fn window(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        if bars.is_empty() {
            return;
        }
        let streak = bars.iter().rev().take_while(|b| b.pct_change > 0.0).count();
        out.insert(Factor::ConsecutiveUpDays, streak as f64);
    }
}
