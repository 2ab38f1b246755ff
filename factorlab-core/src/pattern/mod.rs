//! Chart-pattern detection over a single instrument's price history.
//!
//! Currently one formation is supported: the surge → 50% pullback on
//! shrinking volume ("pullback radar").

pub mod detector;

pub use detector::{detect_pullback, PullbackDetector};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bars at the end of the history excluded from the peak search.
pub const VERIFICATION_BARS: usize = 5;
/// A peak more than this many bars before the end of history is stale.
pub const MAX_PEAK_AGE: usize = 30;
/// Minimum number of bars that must precede the peak.
pub const MIN_BASE_BARS: usize = 5;
/// Fraction of the rally given back at the target level.
pub const RETRACEMENT_LEVEL: f64 = 0.5;

/// Tunable gates of the pullback detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullbackParams {
    /// Minimum (peak - base) / base.
    pub surge_threshold: f64,
    /// Maximum pullback-volume / impulse-volume.
    pub volume_shrink_ceiling: f64,
    /// Allowed relative distance of the last close from the target.
    pub retracement_tolerance: f64,
}

impl Default for PullbackParams {
    fn default() -> Self {
        Self {
            surge_threshold: 0.40,
            volume_shrink_ceiling: 0.45,
            retracement_tolerance: 0.12,
        }
    }
}

/// An accepted pullback formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSignal {
    pub symbol: String,
    pub peak_price: f64,
    pub base_price: f64,
    pub current_price: f64,
    pub surge_ratio: f64,
    pub retracement_target: f64,
    pub shrink_ratio: f64,
}

/// Why the detector stopped without a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Nothing left to search once the verification window is reserved.
    InsufficientHistory { len: usize },
    /// The peak lies more than `MAX_PEAK_AGE` bars before the end.
    StalePeak { age: usize },
    /// Fewer than `MIN_BASE_BARS` bars precede the peak.
    ShortBase { bars: usize },
    /// The base low is zero, negative or not a number.
    InvalidBase { base: f64 },
    WeakSurge { surge: f64 },
    OutsideRetracement { current: f64, target: f64 },
    /// The rally carried no volume, so no ratio exists.
    NoImpulseVolume,
    VolumeNotShrinking { shrink_ratio: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InsufficientHistory { len } => write!(f, "insufficient history ({len} bars)"),
            Rejection::StalePeak { age } => write!(f, "stale peak ({age} bars old)"),
            Rejection::ShortBase { bars } => write!(f, "only {bars} bars before peak"),
            Rejection::InvalidBase { base } => write!(f, "invalid base price {base}"),
            Rejection::WeakSurge { surge } => write!(f, "surge {:.1}% below threshold", surge * 100.0),
            Rejection::OutsideRetracement { current, target } => {
                write!(f, "price {current:.2} outside band around {target:.2}")
            }
            Rejection::NoImpulseVolume => write!(f, "no volume during impulse"),
            Rejection::VolumeNotShrinking { shrink_ratio } => {
                write!(f, "pullback volume at {:.1}% of impulse", shrink_ratio * 100.0)
            }
        }
    }
}
