//! MACD — difference of fast/slow EMAs, its signal line and histogram.
//!
//! dif = EMA(fast) - EMA(slow); dea = EMA(signal) of dif; hist = 2 * (dif - dea)
//! Golden cross: dif[-1] > dea[-1] and dif[-2] <= dea[-2].
//! Window: slow period.

use super::{ema_of_series, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

/// Full MACD series for a close series.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub hist: Vec<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && fast < slow, "MACD needs 1 <= fast < slow");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_{fast}_{slow}_{signal}"),
        }
    }

    /// The conventional 12/26/9 configuration.
    pub fn standard() -> Self {
        Self::new(12, 26, 9)
    }

    pub fn series(&self, closes: &[f64]) -> MacdSeries {
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let dea = ema_of_series(&dif, self.signal);
        let hist = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();
        MacdSeries { dif, dea, hist }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.slow
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        let n = bars.len();
        if n < 2 {
            return;
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let s = self.series(&closes);

        out.insert(Factor::MacdDif, s.dif[n - 1]);
        out.insert(Factor::MacdDea, s.dea[n - 1]);
        out.insert(Factor::MacdHist, s.hist[n - 1]);

        let (dif_now, dea_now) = (s.dif[n - 1], s.dea[n - 1]);
        let (dif_prev, dea_prev) = (s.dif[n - 2], s.dea[n - 2]);
        if [dif_now, dea_now, dif_prev, dea_prev].iter().all(|v| v.is_finite()) {
            out.insert_flag(Factor::MacdCross, dif_now > dea_now && dif_prev <= dea_prev);
        }
    }
}
