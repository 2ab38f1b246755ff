//! Deterministic synthetic market data for development and demos.
//!
//! Every series is a random walk seeded from a BLAKE3 hash of the symbol, so
//! the same symbol and range always produce the same bars. The data is clearly
//! fake: names carry a 合成 ("synthetic") prefix and the provider reports
//! itself as `synthetic`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use factorlab_core::{
    Bar, Fundamentals, IndustryFlowRow, MoneyflowBar, MoneyflowSeries, PriceSeries, SnapshotRow,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::provider::{DataError, DataProvider};

const INDUSTRIES: [&str; 6] = ["半导体", "电力设备", "医药生物", "汽车", "计算机", "有色金属"];

fn rng_for(domain: &str, key: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

fn trading_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let span = (end - start).num_days().max(-1) + 1;
    (0..span)
        .map(move |i| start + Duration::days(i))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
}

pub struct SyntheticProvider {
    universe_size: usize,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(300)
    }
}

impl SyntheticProvider {
    pub fn new(universe_size: usize) -> Self {
        Self { universe_size }
    }

    fn symbol(i: usize) -> String {
        match i % 4 {
            0 => format!("{:06}.SH", 600_000 + i),
            1 => format!("{:06}.SZ", i),
            2 => format!("{:06}.SZ", 300_000 + i),
            // Restricted segment; the universe filter should drop these.
            _ => format!("{:06}.BJ", 830_000 + i),
        }
    }

    fn name(i: usize) -> String {
        if i % 23 == 7 {
            format!("ST合成{i:03}")
        } else {
            format!("合成{i:03}")
        }
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
        let mut rng = rng_for("snapshot", &self.universe_size.to_string());
        Ok((0..self.universe_size)
            .map(|i| SnapshotRow {
                symbol: Self::symbol(i),
                name: Self::name(i),
                industry: INDUSTRIES[i % INDUSTRIES.len()].to_string(),
                pct_change: rng.gen_range(-10.0..10.0_f64),
                turnover: rng.gen_range(1e7..3e9_f64),
            })
            .collect())
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        tracing::debug!(symbol, source = "synthetic", "generating price history");
        let mut rng = rng_for("price", symbol);
        let mut price = rng.gen_range(5.0..80.0_f64);
        let bars = trading_days(start, end)
            .map(|date| {
                let daily_return: f64 = rng.gen_range(-0.04..0.045);
                let open = price;
                let close = price * (1.0 + daily_return);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.015));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.015));
                let volume = rng.gen_range(20_000.0..400_000.0_f64);
                price = close;
                Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                    amount: close * volume * 100.0,
                    pct_change: daily_return * 100.0,
                }
            })
            .collect();
        PriceSeries::new(bars).map_err(|e| DataError::Other(e.to_string()))
    }

    fn moneyflow(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MoneyflowSeries, DataError> {
        let mut rng = rng_for("moneyflow", symbol);
        let bars = trading_days(start, end)
            .map(|date| MoneyflowBar {
                date,
                buy_large: rng.gen_range(1_000.0..8_000.0),
                sell_large: rng.gen_range(1_000.0..8_000.0),
                buy_xlarge: rng.gen_range(0.0..5_000.0),
                sell_xlarge: rng.gen_range(0.0..5_000.0),
            })
            .collect();
        MoneyflowSeries::new(bars).map_err(|e| DataError::Other(e.to_string()))
    }

    fn fundamentals(&self) -> Result<Vec<Fundamentals>, DataError> {
        Ok((0..self.universe_size)
            .map(|i| {
                let symbol = Self::symbol(i);
                let mut rng = rng_for("fundamentals", &symbol);
                Fundamentals {
                    name: Self::name(i),
                    industry: INDUSTRIES[i % INDUSTRIES.len()].to_string(),
                    float_market_cap: rng.gen_range(5e8..3e10_f64),
                    pe_ttm: rng.gen_range(-30.0..120.0_f64),
                    symbol,
                }
            })
            .collect())
    }

    fn industry_flows(&self) -> Result<Vec<IndustryFlowRow>, DataError> {
        Ok(INDUSTRIES
            .iter()
            .map(|industry| IndustryFlowRow {
                industry: industry.to_string(),
                net_amount: rng_for("industry_flow", industry).gen_range(-8e8..8e8_f64),
            })
            .collect())
    }
}
