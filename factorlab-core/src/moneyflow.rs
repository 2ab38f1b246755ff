//! Moneyflow Factor Calculator — capital-flow factors from order-flow history.
//!
//! main_net_flow           latest bar's (xlarge net + large net)
//! main_net_flow_5d        sum of the same over the last 5 bars (or fewer if unavailable)
//! consecutive_inflow_days trailing bars with main net flow > 0

use crate::domain::MoneyflowSeries;
use crate::factors::{Factor, FactorSet};

/// Bars summed for `main_net_flow_5d`.
pub const NET_FLOW_WINDOW: usize = 5;

/// Capital-flow factors for one instrument. An empty series yields an empty set.
pub fn moneyflow_factors(series: &MoneyflowSeries) -> FactorSet {
    let mut out = FactorSet::new();
    let bars = series.bars();
    let Some(latest) = bars.last() else {
        return out;
    };

    out.insert(Factor::MainNetFlow, latest.main_net());

    let recent = &bars[bars.len().saturating_sub(NET_FLOW_WINDOW)..];
    out.insert(Factor::MainNetFlow5d, recent.iter().map(|b| b.main_net()).sum());

    let streak = bars.iter().rev().take_while(|b| b.main_net() > 0.0).count();
    out.insert(Factor::ConsecutiveInflowDays, streak as f64);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MoneyflowBar;
    use chrono::NaiveDate;

    /// Bars whose main net flow equals each given value (large tier only).
    fn flows(nets: &[f64]) -> MoneyflowSeries {
        let base = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let bars = nets
            .iter()
            .enumerate()
            .map(|(i, &net)| MoneyflowBar {
                date: base + chrono::Duration::days(i as i64),
                buy_large: net.max(0.0),
                sell_large: (-net).max(0.0),
                buy_xlarge: 10.0,
                sell_xlarge: 10.0,
            })
            .collect();
        MoneyflowSeries::new(bars).unwrap()
    }

    #[test]
    fn empty_series_has_no_factors() {
        assert!(moneyflow_factors(&MoneyflowSeries::empty()).is_empty());
    }

    #[test]
    fn latest_and_five_day_sum() {
        let fs = moneyflow_factors(&flows(&[100.0, -50.0, 20.0, 30.0, -10.0, 40.0, 60.0]));
        assert_eq!(fs.get(Factor::MainNetFlow), Some(60.0));
        // last five: 20 + 30 - 10 + 40 + 60
        assert_eq!(fs.get(Factor::MainNetFlow5d), Some(140.0));
        assert_eq!(fs.get(Factor::ConsecutiveInflowDays), Some(2.0));
    }

    #[test]
    fn short_history_sums_what_exists() {
        let fs = moneyflow_factors(&flows(&[5.0, 7.0]));
        assert_eq!(fs.get(Factor::MainNetFlow5d), Some(12.0));
        assert_eq!(fs.get(Factor::ConsecutiveInflowDays), Some(2.0));
    }

    #[test]
    fn zero_flow_breaks_inflow_streak() {
        let fs = moneyflow_factors(&flows(&[5.0, 0.0, 7.0, 8.0]));
        assert_eq!(fs.get(Factor::ConsecutiveInflowDays), Some(2.0));
        let fs = moneyflow_factors(&flows(&[5.0, 7.0, 0.0]));
        assert_eq!(fs.get(Factor::ConsecutiveInflowDays), Some(0.0));
    }
}
