//! Factor names and the FactorSet container.
//!
//! A FactorSet only ever holds finite values: a factor that cannot be
//! computed is absent, never a NaN placeholder or a fabricated zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every factor the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    #[serde(rename = "momentum_5d")]
    Momentum5d,
    #[serde(rename = "momentum_10d")]
    Momentum10d,
    #[serde(rename = "momentum_20d")]
    Momentum20d,
    #[serde(rename = "momentum_60d")]
    Momentum60d,
    #[serde(rename = "ma_5")]
    Ma5,
    #[serde(rename = "ma_10")]
    Ma10,
    #[serde(rename = "ma_20")]
    Ma20,
    #[serde(rename = "ma_60")]
    Ma60,
    #[serde(rename = "price_to_ma_5")]
    PriceToMa5,
    #[serde(rename = "price_to_ma_10")]
    PriceToMa10,
    #[serde(rename = "price_to_ma_20")]
    PriceToMa20,
    #[serde(rename = "price_to_ma_60")]
    PriceToMa60,
    #[serde(rename = "ma_bullish")]
    MaBullish,
    #[serde(rename = "macd_dif")]
    MacdDif,
    #[serde(rename = "macd_dea")]
    MacdDea,
    #[serde(rename = "macd_hist")]
    MacdHist,
    #[serde(rename = "macd_cross")]
    MacdCross,
    #[serde(rename = "rsi_14")]
    Rsi14,
    #[serde(rename = "boll_upper")]
    BollUpper,
    #[serde(rename = "boll_lower")]
    BollLower,
    #[serde(rename = "boll_position")]
    BollPosition,
    #[serde(rename = "atr_14")]
    Atr14,
    #[serde(rename = "atr_pct")]
    AtrPct,
    #[serde(rename = "volume_ratio_5_20")]
    VolumeRatio5To20,
    #[serde(rename = "volume_ratio_today")]
    VolumeRatioToday,
    #[serde(rename = "new_high_20")]
    NewHigh20,
    #[serde(rename = "new_low_20")]
    NewLow20,
    #[serde(rename = "new_high_60")]
    NewHigh60,
    #[serde(rename = "consecutive_up_days")]
    ConsecutiveUpDays,
    #[serde(rename = "main_net_flow")]
    MainNetFlow,
    #[serde(rename = "main_net_flow_5d")]
    MainNetFlow5d,
    #[serde(rename = "consecutive_inflow_days")]
    ConsecutiveInflowDays,
}

impl Factor {
    pub const ALL: [Factor; 32] = [
        Factor::Momentum5d,
        Factor::Momentum10d,
        Factor::Momentum20d,
        Factor::Momentum60d,
        Factor::Ma5,
        Factor::Ma10,
        Factor::Ma20,
        Factor::Ma60,
        Factor::PriceToMa5,
        Factor::PriceToMa10,
        Factor::PriceToMa20,
        Factor::PriceToMa60,
        Factor::MaBullish,
        Factor::MacdDif,
        Factor::MacdDea,
        Factor::MacdHist,
        Factor::MacdCross,
        Factor::Rsi14,
        Factor::BollUpper,
        Factor::BollLower,
        Factor::BollPosition,
        Factor::Atr14,
        Factor::AtrPct,
        Factor::VolumeRatio5To20,
        Factor::VolumeRatioToday,
        Factor::NewHigh20,
        Factor::NewLow20,
        Factor::NewHigh60,
        Factor::ConsecutiveUpDays,
        Factor::MainNetFlow,
        Factor::MainNetFlow5d,
        Factor::ConsecutiveInflowDays,
    ];

    /// Stable snake_case name, identical to the serde name.
    pub fn as_str(self) -> &'static str {
        match self {
            Factor::Momentum5d => "momentum_5d",
            Factor::Momentum10d => "momentum_10d",
            Factor::Momentum20d => "momentum_20d",
            Factor::Momentum60d => "momentum_60d",
            Factor::Ma5 => "ma_5",
            Factor::Ma10 => "ma_10",
            Factor::Ma20 => "ma_20",
            Factor::Ma60 => "ma_60",
            Factor::PriceToMa5 => "price_to_ma_5",
            Factor::PriceToMa10 => "price_to_ma_10",
            Factor::PriceToMa20 => "price_to_ma_20",
            Factor::PriceToMa60 => "price_to_ma_60",
            Factor::MaBullish => "ma_bullish",
            Factor::MacdDif => "macd_dif",
            Factor::MacdDea => "macd_dea",
            Factor::MacdHist => "macd_hist",
            Factor::MacdCross => "macd_cross",
            Factor::Rsi14 => "rsi_14",
            Factor::BollUpper => "boll_upper",
            Factor::BollLower => "boll_lower",
            Factor::BollPosition => "boll_position",
            Factor::Atr14 => "atr_14",
            Factor::AtrPct => "atr_pct",
            Factor::VolumeRatio5To20 => "volume_ratio_5_20",
            Factor::VolumeRatioToday => "volume_ratio_today",
            Factor::NewHigh20 => "new_high_20",
            Factor::NewLow20 => "new_low_20",
            Factor::NewHigh60 => "new_high_60",
            Factor::ConsecutiveUpDays => "consecutive_up_days",
            Factor::MainNetFlow => "main_net_flow",
            Factor::MainNetFlow5d => "main_net_flow_5d",
            Factor::ConsecutiveInflowDays => "consecutive_inflow_days",
        }
    }

    /// Momentum factor for a lookback, if it is one the library computes.
    pub fn momentum(period: usize) -> Option<Factor> {
        match period {
            5 => Some(Factor::Momentum5d),
            10 => Some(Factor::Momentum10d),
            20 => Some(Factor::Momentum20d),
            60 => Some(Factor::Momentum60d),
            _ => None,
        }
    }

    /// Moving-average value and price/MA ratio factors for a period.
    pub fn moving_average(period: usize) -> Option<(Factor, Factor)> {
        match period {
            5 => Some((Factor::Ma5, Factor::PriceToMa5)),
            10 => Some((Factor::Ma10, Factor::PriceToMa10)),
            20 => Some((Factor::Ma20, Factor::PriceToMa20)),
            60 => Some((Factor::Ma60, Factor::PriceToMa60)),
            _ => None,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown factor name: {0}")]
pub struct UnknownFactor(pub String);

impl FromStr for Factor {
    type Err = UnknownFactor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFactor(s.to_string()))
    }
}

/// Mapping from factor to value; keys present only when computable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorSet {
    values: BTreeMap<Factor, f64>,
}

impl FactorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Non-finite values are dropped so the set never
    /// carries NaN or infinity. Returns whether the value was stored.
    pub fn insert(&mut self, factor: Factor, value: f64) -> bool {
        if value.is_finite() {
            self.values.insert(factor, value);
            true
        } else {
            false
        }
    }

    /// Insert a 0/1 flag.
    pub fn insert_flag(&mut self, factor: Factor, flag: bool) {
        self.values.insert(factor, if flag { 1.0 } else { 0.0 });
    }

    pub fn get(&self, factor: Factor) -> Option<f64> {
        self.values.get(&factor).copied()
    }

    pub fn contains(&self, factor: Factor) -> bool {
        self.values.contains_key(&factor)
    }

    /// Merge another set into this one; entries in `other` win on conflict.
    pub fn extend(&mut self, other: FactorSet) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_drops_non_finite() {
        let mut fs = FactorSet::new();
        assert!(!fs.insert(Factor::Rsi14, f64::NAN));
        assert!(!fs.insert(Factor::AtrPct, f64::INFINITY));
        assert!(fs.insert(Factor::Momentum5d, 3.5));
        assert_eq!(fs.len(), 1);
        assert_eq!(fs.get(Factor::Momentum5d), Some(3.5));
        assert_eq!(fs.get(Factor::Rsi14), None);
    }

    #[test]
    fn names_roundtrip_through_from_str() {
        for f in Factor::ALL {
            assert_eq!(f.as_str().parse::<Factor>().unwrap(), f);
        }
        assert!("momentum_7d".parse::<Factor>().is_err());
    }

    #[test]
    fn serde_names_match_as_str() {
        for f in Factor::ALL {
            let json = serde_json::to_string(&f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.as_str()));
        }
    }

    #[test]
    fn extend_overwrites() {
        let mut a = FactorSet::new();
        a.insert(Factor::MainNetFlow, 1.0);
        let mut b = FactorSet::new();
        b.insert(Factor::MainNetFlow, 2.0);
        b.insert_flag(Factor::MacdCross, true);
        a.extend(b);
        assert_eq!(a.get(Factor::MainNetFlow), Some(2.0));
        assert_eq!(a.get(Factor::MacdCross), Some(1.0));
    }
}
