//! Moneyflow history — order-flow split by order-size tier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One day of order-flow amounts for the large and extra-large tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyflowBar {
    pub date: NaiveDate,
    pub buy_large: f64,
    pub sell_large: f64,
    pub buy_xlarge: f64,
    pub sell_xlarge: f64,
}

impl MoneyflowBar {
    /// Main-force net flow: extra-large net plus large net.
    pub fn main_net(&self) -> f64 {
        (self.buy_xlarge - self.sell_xlarge) + (self.buy_large - self.sell_large)
    }
}

/// Chronologically ascending moneyflow history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MoneyflowBar>", into = "Vec<MoneyflowBar>")]
pub struct MoneyflowSeries {
    bars: Vec<MoneyflowBar>,
}

impl MoneyflowSeries {
    pub fn new(bars: Vec<MoneyflowBar>) -> Result<Self, SeriesError> {
        if let Some(i) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::NotAscending {
                index: i + 1,
                date: bars[i + 1].date,
            });
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[MoneyflowBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl TryFrom<Vec<MoneyflowBar>> for MoneyflowSeries {
    type Error = SeriesError;

    fn try_from(bars: Vec<MoneyflowBar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<MoneyflowSeries> for Vec<MoneyflowBar> {
    fn from(series: MoneyflowSeries) -> Self {
        series.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_net_sums_both_tiers() {
        let bar = MoneyflowBar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            buy_large: 300.0,
            sell_large: 100.0,
            buy_xlarge: 50.0,
            sell_xlarge: 250.0,
        };
        assert_eq!(bar.main_net(), 0.0);
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let d = |day| MoneyflowBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            buy_large: 0.0,
            sell_large: 0.0,
            buy_xlarge: 0.0,
            sell_xlarge: 0.0,
        };
        assert!(MoneyflowSeries::new(vec![d(1), d(2)]).is_ok());
        assert!(MoneyflowSeries::new(vec![d(3), d(2)]).is_err());
    }
}
