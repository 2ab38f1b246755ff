//! CSV-directory provider.
//!
//! Layout:
//! ```text
//! {root}/snapshot.csv            symbol,name,industry,pct_change,turnover
//! {root}/fundamentals.csv        symbol,name,industry,float_market_cap,pe_ttm
//! {root}/industry_flow.csv       industry,net_amount
//! {root}/prices/{SYMBOL}.csv     date,open,high,low,close,volume,amount,pct_change
//! {root}/moneyflow/{SYMBOL}.csv  date,buy_large,sell_large,buy_xlarge,sell_xlarge
//! ```
//! Dates are `YYYY-MM-DD`; rows must already be in ascending date order.
//! An empty `pe_ttm` cell (loss-making company) reads as NaN.

use chrono::NaiveDate;
use factorlab_core::{
    Bar, Fundamentals, IndustryFlowRow, MoneyflowBar, MoneyflowSeries, PriceSeries, SnapshotRow,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::provider::{DataError, DataProvider};

pub struct CsvProvider {
    root: PathBuf,
}

#[derive(Deserialize)]
struct FundamentalsRecord {
    symbol: String,
    name: String,
    #[serde(default)]
    industry: String,
    float_market_cap: f64,
    pe_ttm: Option<f64>,
}

impl From<FundamentalsRecord> for Fundamentals {
    fn from(r: FundamentalsRecord) -> Self {
        Fundamentals {
            symbol: r.symbol,
            name: r.name,
            industry: r.industry,
            float_market_cap: r.float_market_cap,
            pe_ttm: r.pe_ttm.unwrap_or(f64::NAN),
        }
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, e: csv::Error) -> DataError {
    if let csv::ErrorKind::Io(io) = e.kind() {
        if io.kind() == std::io::ErrorKind::NotFound {
            return DataError::Other(format!("missing file {}", path.display()));
        }
    }
    DataError::Parse {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl CsvProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{dir}/{symbol}.csv`, or NotFound for a missing file or a
    /// symbol that is not a plain file stem.
    fn symbol_file(&self, dir: &str, symbol: &str) -> Result<PathBuf, DataError> {
        let plain = !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
            && symbol != "."
            && symbol != "..";
        let path = self.root.join(dir).join(format!("{symbol}.csv"));
        if !plain || !path.is_file() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(path)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
        read_rows(&self.root.join("snapshot.csv"))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let path = self.symbol_file("prices", symbol)?;
        let bars: Vec<Bar> = read_rows::<Bar>(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        PriceSeries::new(bars).map_err(|e| DataError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn moneyflow(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MoneyflowSeries, DataError> {
        let path = self.symbol_file("moneyflow", symbol)?;
        let bars: Vec<MoneyflowBar> = read_rows::<MoneyflowBar>(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        MoneyflowSeries::new(bars).map_err(|e| DataError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn fundamentals(&self) -> Result<Vec<Fundamentals>, DataError> {
        let rows: Vec<FundamentalsRecord> = read_rows(&self.root.join("fundamentals.csv"))?;
        Ok(rows.into_iter().map(Fundamentals::from).collect())
    }

    fn industry_flows(&self) -> Result<Vec<IndustryFlowRow>, DataError> {
        read_rows(&self.root.join("industry_flow.csv"))
    }
}
