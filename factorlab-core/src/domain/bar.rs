//! Bar and PriceSeries — one instrument's adjusted daily history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One trading-period OHLCV record, adjusted for corporate actions.
///
/// `pct_change` is the close-to-close change in percent as reported by the
/// provider (not recomputed here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    pub pct_change: f64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}

/// Chronologically ascending bar history.
///
/// The order is validated once on construction and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting bars that are not in strictly ascending date order.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        if let Some(i) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::NotAscending {
                index: i + 1,
                date: bars[i + 1].date,
            });
        }
        Ok(Self { bars })
    }

    /// An empty series, the shape a failed fetch degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

impl TryFrom<Vec<Bar>> for PriceSeries {
    type Error = SeriesError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<Bar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
            amount: close * 1_000.0,
            pct_change: 0.0,
        }
    }

    #[test]
    fn accepts_ascending_bars() {
        let series = PriceSeries::new(vec![bar(1, 10.0), bar(2, 11.0), bar(4, 12.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
        assert_eq!(series.last().unwrap().close, 12.0);
    }

    #[test]
    fn rejects_out_of_order_bars() {
        let err = PriceSeries::new(vec![bar(2, 10.0), bar(1, 11.0)]).unwrap_err();
        match err {
            SeriesError::NotAscending { index, .. } => assert_eq!(index, 1),
        }
    }

    #[test]
    fn rejects_duplicate_dates() {
        assert!(PriceSeries::new(vec![bar(2, 10.0), bar(2, 11.0)]).is_err());
    }

    #[test]
    fn bar_sanity() {
        let mut b = bar(1, 10.0);
        assert!(b.is_sane());
        b.high = 8.0;
        assert!(!b.is_sane());
        b.close = f64::NAN;
        assert!(b.is_void());
    }

    #[test]
    fn series_serde_roundtrip_keeps_order_check() {
        let series = PriceSeries::new(vec![bar(1, 10.0), bar(2, 11.0)]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(series, back);

        let reversed = serde_json::to_string(&vec![bar(2, 10.0), bar(1, 11.0)]).unwrap();
        assert!(serde_json::from_str::<PriceSeries>(&reversed).is_err());
    }
}
