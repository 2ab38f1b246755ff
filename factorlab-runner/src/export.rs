//! Result export — JSON and CSV artifacts for screening and pullback scans.
//!
//! CSV carries one row per ranked candidate / hit with fixed columns, so the
//! files load straight into a spreadsheet. JSON carries the full report,
//! including breadth, industry flow and skip reasons.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use factorlab_core::{Factor, ScanError, ScoredCandidate};
use serde_json::json;

use crate::pipeline::{PullbackHit, PullbackReport, ScreenReport};

/// Bumped whenever the JSON layout changes.
pub const SCHEMA_VERSION: u32 = 1;

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn skip_reasons(skipped: &[ScanError]) -> Vec<serde_json::Value> {
    skipped
        .iter()
        .map(|e| json!({ "symbol": e.symbol(), "reason": e.to_string() }))
        .collect()
}

// ─── Screening ──────────────────────────────────────────────────────

/// Ranked candidates as CSV.
///
/// Columns: rank, symbol, name, industry, pct_change, turnover,
/// composite_score, then one column per factor (empty when absent).
pub fn export_ranked_csv(ranked: &[ScoredCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = vec![
        "rank",
        "symbol",
        "name",
        "industry",
        "pct_change",
        "turnover",
        "composite_score",
    ];
    header.extend(Factor::ALL.iter().map(|f| f.as_str()));
    wtr.write_record(&header)?;

    for (i, c) in ranked.iter().enumerate() {
        let mut record = vec![
            (i + 1).to_string(),
            c.symbol.clone(),
            c.name.clone(),
            c.industry.clone(),
            format!("{:.2}", c.pct_change),
            format!("{:.0}", c.turnover),
            format!("{:.2}", c.composite_score),
        ];
        record.extend(
            Factor::ALL
                .iter()
                .map(|f| c.factors.get(*f).map(|v| format!("{v:.4}")).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    finish_csv(wtr)
}

/// Full screening report as pretty JSON.
pub fn export_ranked_json(report: &ScreenReport) -> Result<String> {
    let value = json!({
        "schema_version": SCHEMA_VERSION,
        "as_of": report.as_of,
        "batch_size": report.batch_size,
        "breadth": report.breadth,
        "industry_flow": report.industry_flow,
        "ranked": report.ranked,
        "skipped": skip_reasons(&report.skipped),
    });
    serde_json::to_string_pretty(&value).context("failed to serialize screen report to JSON")
}

// ─── Pullback ───────────────────────────────────────────────────────

/// Pullback hits as CSV; ratios are written as percentages.
pub fn export_pullback_csv(hits: &[PullbackHit]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "name",
        "industry",
        "float_market_cap",
        "pe_ttm",
        "base_price",
        "peak_price",
        "current_price",
        "surge_pct",
        "retracement_target",
        "shrink_pct",
    ])?;
    for h in hits {
        let s = &h.signal;
        let f = &h.fundamentals;
        wtr.write_record([
            &s.symbol,
            &f.name,
            &f.industry,
            &format!("{:.0}", f.float_market_cap),
            &format!("{:.2}", f.pe_ttm),
            &format!("{:.2}", s.base_price),
            &format!("{:.2}", s.peak_price),
            &format!("{:.2}", s.current_price),
            &format!("{:.1}", s.surge_ratio * 100.0),
            &format!("{:.2}", s.retracement_target),
            &format!("{:.1}", s.shrink_ratio * 100.0),
        ])?;
    }
    finish_csv(wtr)
}

/// Full pullback report as pretty JSON.
pub fn export_pullback_json(report: &PullbackReport) -> Result<String> {
    let value = json!({
        "schema_version": SCHEMA_VERSION,
        "as_of": report.as_of,
        "scanned": report.scanned,
        "hits": report.hits,
        "skipped": skip_reasons(&report.skipped),
    });
    serde_json::to_string_pretty(&value).context("failed to serialize pullback report to JSON")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// A finished scan, ready to be written to disk.
pub enum Report<'a> {
    Screen(&'a ScreenReport),
    Pullback(&'a PullbackReport),
}

/// Write `{kind}_{as_of}/results.csv` and `report.json` under `output_dir`.
///
/// Returns the path to the created directory. Existing files are replaced.
pub fn write_report(report: Report<'_>, output_dir: &Path) -> Result<PathBuf> {
    let (dirname, csv, json) = match report {
        Report::Screen(r) => (
            format!("screen_{}", r.as_of.format("%Y%m%d")),
            export_ranked_csv(&r.ranked)?,
            export_ranked_json(r)?,
        ),
        Report::Pullback(r) => (
            format!("pullback_{}", r.as_of.format("%Y%m%d")),
            export_pullback_csv(&r.hits)?,
            export_pullback_json(r)?,
        ),
    };

    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create report dir: {}", run_dir.display()))?;
    std::fs::write(run_dir.join("results.csv"), csv)
        .with_context(|| format!("failed to write {}/results.csv", run_dir.display()))?;
    std::fs::write(run_dir.join("report.json"), json)
        .with_context(|| format!("failed to write {}/report.json", run_dir.display()))?;
    tracing::info!(dir = %run_dir.display(), "report written");
    Ok(run_dir)
}
