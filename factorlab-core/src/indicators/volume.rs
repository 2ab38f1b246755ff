//! Volume ratios.
//!
//! volume_ratio_5_20 = mean(vol[-short:]) / mean(vol[-long:])
//! volume_ratio_today = vol[-1] / mean(vol[-long:])
//! Window: long. Both are dropped when the long mean is zero.

use super::{mean, tail, Indicator};
use crate::domain::Bar;
use crate::factors::{Factor, FactorSet};

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    short: usize,
    long: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(short: usize, long: usize) -> Self {
        assert!(short >= 1 && short <= long, "VolumeRatio needs 1 <= short <= long");
        Self {
            short,
            long,
            name: format!("volume_ratio_{short}_{long}"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.long
    }

    fn compute(&self, bars: &[Bar], out: &mut FactorSet) {
        let Some(latest) = bars.last() else {
            return;
        };
        if bars.len() < self.long {
            return;
        }
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let long_mean = mean(tail(&volumes, self.long));
        if long_mean == 0.0 {
            return;
        }
        out.insert(Factor::VolumeRatio5To20, mean(tail(&volumes, self.short)) / long_mean);
        out.insert(Factor::VolumeRatioToday, latest.volume / long_mean);
    }
}
