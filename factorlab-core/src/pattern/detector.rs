//! Surge → retracement detector.
//!
//! One pass over the history, driven by an explicit stage enum:
//!
//! ```text
//! SearchPeak → SearchBase → CheckSurge → CheckRetracement → CheckVolume → Signal
//!      └────────────┴────────────┴──────────────┴─────────────────┴──→ Reject
//! ```
//!
//! Every stage either advances or terminates; nothing re-enters.

use crate::domain::{Bar, PriceSeries};
use crate::indicators::mean;

use super::{
    PatternSignal, PullbackParams, Rejection, MAX_PEAK_AGE, MIN_BASE_BARS, RETRACEMENT_LEVEL,
    VERIFICATION_BARS,
};

#[derive(Debug, Clone, Copy)]
struct Extreme {
    index: usize,
    price: f64,
}

#[derive(Debug)]
enum Stage {
    SearchPeak,
    SearchBase {
        peak: Extreme,
    },
    CheckSurge {
        peak: Extreme,
        base: Extreme,
    },
    CheckRetracement {
        peak: Extreme,
        base: Extreme,
        surge: f64,
    },
    CheckVolume {
        peak: Extreme,
        base: Extreme,
        surge: f64,
        target: f64,
    },
}

/// First index holding the maximum `high`. NaN highs never win.
fn highest_high(bars: &[Bar]) -> Option<Extreme> {
    let mut best: Option<Extreme> = None;
    for (index, bar) in bars.iter().enumerate() {
        if best.map_or(!bar.high.is_nan(), |b| bar.high > b.price) {
            best = Some(Extreme { index, price: bar.high });
        }
    }
    best
}

/// First index holding the minimum `low`. NaN lows never win.
fn lowest_low(bars: &[Bar]) -> Option<Extreme> {
    let mut best: Option<Extreme> = None;
    for (index, bar) in bars.iter().enumerate() {
        if best.map_or(!bar.low.is_nan(), |b| bar.low < b.price) {
            best = Some(Extreme { index, price: bar.low });
        }
    }
    best
}

/// Pullback detector with fixed gate parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullbackDetector {
    params: PullbackParams,
}

impl PullbackDetector {
    pub fn new(params: PullbackParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PullbackParams {
        &self.params
    }

    /// Run the state machine over `series`.
    pub fn evaluate(&self, symbol: &str, series: &PriceSeries) -> Result<PatternSignal, Rejection> {
        let bars = series.bars();
        let n = bars.len();
        let mut stage = Stage::SearchPeak;

        loop {
            stage = match stage {
                Stage::SearchPeak => {
                    if n <= VERIFICATION_BARS {
                        return Err(Rejection::InsufficientHistory { len: n });
                    }
                    let peak = highest_high(&bars[..n - VERIFICATION_BARS])
                        .ok_or(Rejection::InsufficientHistory { len: n })?;
                    let age = n - peak.index;
                    if age > MAX_PEAK_AGE {
                        return Err(Rejection::StalePeak { age });
                    }
                    Stage::SearchBase { peak }
                }
                Stage::SearchBase { peak } => {
                    if peak.index < MIN_BASE_BARS {
                        return Err(Rejection::ShortBase { bars: peak.index });
                    }
                    let base = lowest_low(&bars[..peak.index])
                        .ok_or(Rejection::ShortBase { bars: peak.index })?;
                    if base.price.is_nan() || base.price <= 0.0 {
                        return Err(Rejection::InvalidBase { base: base.price });
                    }
                    Stage::CheckSurge { peak, base }
                }
                Stage::CheckSurge { peak, base } => {
                    let surge = (peak.price - base.price) / base.price;
                    if surge < self.params.surge_threshold {
                        return Err(Rejection::WeakSurge { surge });
                    }
                    Stage::CheckRetracement { peak, base, surge }
                }
                Stage::CheckRetracement { peak, base, surge } => {
                    let target = peak.price - RETRACEMENT_LEVEL * (peak.price - base.price);
                    let band = target * self.params.retracement_tolerance;
                    let current = bars[n - 1].close;
                    if !(target - band..=target + band).contains(&current) {
                        return Err(Rejection::OutsideRetracement { current, target });
                    }
                    Stage::CheckVolume { peak, base, surge, target }
                }
                Stage::CheckVolume { peak, base, surge, target } => {
                    let volumes = series.volumes();
                    // The impulse leg includes the peak bar itself.
                    let impulse_vol = mean(&volumes[base.index..=peak.index]);
                    let pullback_vol = mean(&volumes[peak.index + 1..]);
                    if impulse_vol.is_nan() || impulse_vol <= 0.0 {
                        return Err(Rejection::NoImpulseVolume);
                    }
                    let shrink_ratio = pullback_vol / impulse_vol;
                    if shrink_ratio.is_nan() || shrink_ratio > self.params.volume_shrink_ceiling {
                        return Err(Rejection::VolumeNotShrinking { shrink_ratio });
                    }
                    return Ok(PatternSignal {
                        symbol: symbol.to_string(),
                        peak_price: peak.price,
                        base_price: base.price,
                        current_price: bars[n - 1].close,
                        surge_ratio: surge,
                        retracement_target: target,
                        shrink_ratio,
                    });
                }
            };
        }
    }
}

/// Scan one history for a pullback formation.
///
/// Returns `None` whenever any gate rejects; no partial signal is produced.
pub fn detect_pullback(
    symbol: &str,
    price_history: &PriceSeries,
    surge_threshold: f64,
    volume_shrink_ceiling: f64,
    retracement_tolerance: f64,
) -> Option<PatternSignal> {
    let detector = PullbackDetector::new(PullbackParams {
        surge_threshold,
        volume_shrink_ceiling,
        retracement_tolerance,
    });
    match detector.evaluate(symbol, price_history) {
        Ok(signal) => Some(signal),
        Err(reason) => {
            tracing::debug!(symbol, %reason, "no pullback");
            None
        }
    }
}
