//! Indicator Library — technical factors from one instrument's price history.
//!
//! Each indicator declares a `window()`: the number of bars it needs before
//! the latest one. `IndicatorSet::evaluate` only runs an indicator when the
//! series holds at least `window() + 1` bars, so a short history yields a
//! partial FactorSet rather than fabricated values. Indicators never panic
//! and never return errors.

pub mod atr;
pub mod bollinger;
pub mod breakout;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod moving_average;
pub mod rsi;
pub mod streak;
pub mod volume;

pub use atr::Atr;
pub use bollinger::Bollinger;
pub use breakout::Breakout;
pub use ema::ema_of_series;
pub use macd::Macd;
pub use momentum::Momentum;
pub use moving_average::{MaAlignment, MovingAverage};
pub use rsi::Rsi;
pub use streak::UpStreak;
pub use volume::VolumeRatio;

use crate::domain::{Bar, PriceSeries};
use crate::error::ScanError;
use crate::factors::{Factor, FactorSet};

/// A technical indicator that writes its latest value(s) into a FactorSet.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "macd_12_26_9").
    fn name(&self) -> &str;

    /// Bars of history needed before the latest bar.
    fn window(&self) -> usize;

    /// Write the indicator's factors for the latest bar into `out`.
    ///
    /// Called with at least `window() + 1` bars by `IndicatorSet`; direct
    /// callers passing fewer bars get no output.
    fn compute(&self, bars: &[Bar], out: &mut FactorSet);
}

/// An ordered collection of indicators evaluated together.
pub struct IndicatorSet {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorSet {
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Self {
        Self { indicators }
    }

    /// The full technical factor catalogue.
    pub fn standard() -> Self {
        let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();
        for period in [5, 10, 20, 60] {
            indicators.push(Box::new(Momentum::new(period)));
        }
        for period in [5, 10, 20, 60] {
            indicators.push(Box::new(MovingAverage::new(period)));
        }
        indicators.push(Box::new(MaAlignment::new(5, 20)));
        indicators.push(Box::new(Macd::standard()));
        indicators.push(Box::new(Rsi::new(14)));
        indicators.push(Box::new(Bollinger::new(20, 2.0)));
        indicators.push(Box::new(Atr::new(14)));
        indicators.push(Box::new(VolumeRatio::new(5, 20)));
        indicators.push(Box::new(Breakout::new(20, Factor::NewHigh20, Some(Factor::NewLow20))));
        indicators.push(Box::new(Breakout::new(60, Factor::NewHigh60, None)));
        indicators.push(Box::new(UpStreak));
        Self::new(indicators)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Evaluate every indicator whose window the series can satisfy.
    pub fn evaluate(&self, series: &PriceSeries) -> FactorSet {
        self.evaluate_traced("", series).0
    }

    /// Like `evaluate`, also returning a `ComputationSkipped` record for
    /// each indicator the history was too short for.
    pub fn evaluate_traced(&self, symbol: &str, series: &PriceSeries) -> (FactorSet, Vec<ScanError>) {
        let bars = series.bars();
        let mut out = FactorSet::new();
        let mut skipped = Vec::new();
        for ind in &self.indicators {
            let required = ind.window() + 1;
            if bars.len() < required {
                skipped.push(ScanError::ComputationSkipped {
                    symbol: symbol.to_string(),
                    indicator: ind.name().to_string(),
                    required,
                    available: bars.len(),
                });
                continue;
            }
            ind.compute(bars, &mut out);
        }
        (out, skipped)
    }
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Technical factors for one series using the standard catalogue.
pub fn technical_factors(series: &PriceSeries) -> FactorSet {
    IndicatorSet::standard().evaluate(series)
}

/// Arithmetic mean; NaN for an empty slice (dropped by `FactorSet::insert`).
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Last `n` elements of a slice (or the whole slice if shorter).
pub(crate) fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1,
/// low = min(open,close) - 1, volume = 1000, pct_change from consecutive closes.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let volumes = vec![1000.0; closes.len()];
    make_bars_with_volume(closes, &volumes)
}

#[cfg(test)]
pub fn make_bars_with_volume(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let pct_change = if i == 0 { 0.0 } else { (close / closes[i - 1] - 1.0) * 100.0 };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume,
                amount: close * volume,
                pct_change,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(make_bars(closes)).unwrap()
    }

    #[test]
    fn empty_series_yields_empty_set() {
        let fs = technical_factors(&PriceSeries::empty());
        assert!(fs.is_empty());
    }

    #[test]
    fn short_series_omits_long_windows() {
        let closes: Vec<f64> = (0..21).map(|i| 10.0 + i as f64 * 0.1).collect();
        let fs = technical_factors(&series(&closes));
        assert!(fs.contains(Factor::Momentum20d));
        assert!(fs.contains(Factor::Ma20));
        assert!(fs.contains(Factor::Rsi14));
        assert!(fs.contains(Factor::BollPosition));
        assert!(!fs.contains(Factor::Momentum60d));
        assert!(!fs.contains(Factor::Ma60));
        assert!(!fs.contains(Factor::NewHigh60));
        assert!(!fs.contains(Factor::MacdDif));
    }

    #[test]
    fn long_series_has_full_catalogue() {
        let closes: Vec<f64> = (0..80).map(|i| 20.0 + (i as f64 * 0.3).sin()).collect();
        let fs = technical_factors(&series(&closes));
        for f in [
            Factor::Momentum5d,
            Factor::Momentum60d,
            Factor::Ma60,
            Factor::PriceToMa60,
            Factor::MaBullish,
            Factor::MacdHist,
            Factor::MacdCross,
            Factor::Rsi14,
            Factor::BollUpper,
            Factor::Atr14,
            Factor::AtrPct,
            Factor::VolumeRatio5To20,
            Factor::VolumeRatioToday,
            Factor::NewHigh20,
            Factor::NewLow20,
            Factor::NewHigh60,
            Factor::ConsecutiveUpDays,
        ] {
            assert!(fs.contains(f), "missing {f}");
        }
        assert!(fs.iter().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn traced_evaluation_reports_skips() {
        let (fs, skipped) = IndicatorSet::standard().evaluate_traced("TEST", &series(&[10.0, 11.0]));
        assert_eq!(fs.get(Factor::ConsecutiveUpDays), Some(1.0));
        assert!(skipped.iter().any(|e| matches!(
            e,
            ScanError::ComputationSkipped { indicator, required: 15, available: 2, .. } if indicator == "rsi_14"
        )));
    }

    #[test]
    fn tail_and_mean_helpers() {
        assert_eq!(tail(&[1, 2, 3, 4], 2), &[3, 4]);
        assert_eq!(tail(&[1, 2], 5), &[1, 2]);
        assert!(mean(&[]).is_nan());
        assert_approx(mean(&[1.0, 2.0, 3.0]), 2.0, DEFAULT_EPSILON);
    }
}
