//! FactorLab CLI — multi-factor screening and pullback scans.
//!
//! Commands:
//! - `screen` — rank the filtered universe by composite factor score
//! - `pullback` — scan the fundamentals-filtered universe for surge → pullback formations
//! - `breadth` — advance/decline summary of the current snapshot
//! - `init-config` — write the default configuration as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

use factorlab_core::{Factor, IndustryFlow, IndustryFlowRow, MarketBreadth};
use factorlab_runner::{
    run_breadth, run_pullback_scan, run_screen, write_report, CachedProvider, CsvProvider,
    ProviderChain, PullbackReport, Report, ScanConfig, ScreenReport,
    SyntheticProvider, TracingProgress,
};

#[derive(Parser)]
#[command(name = "factorlab", about = "FactorLab CLI — multi-factor stock screening")]
struct Cli {
    /// Directory holding snapshot.csv, fundamentals.csv, prices/ and moneyflow/.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fall back to deterministic synthetic data when the data directory lacks a file.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Output directory for report bundles.
    #[arg(long, global = true, default_value = "results")]
    output_dir: PathBuf,

    /// Verbose (debug) logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the filtered universe by composite factor score.
    Screen {
        /// Number of ranked candidates to keep (overrides the config).
        #[arg(long)]
        top_n: Option<usize>,

        /// Scan date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Scan for surge → 50% pullback formations on shrinking volume.
    Pullback {
        /// Scan date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print the advance/decline summary of the current snapshot.
    Breadth,
    /// Write the default configuration to a TOML file.
    InitConfig {
        /// Destination file.
        #[arg(default_value = "factorlab.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::InitConfig { path, force } => run_init_config(path, *force),
        Commands::Screen { top_n, as_of } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(n) = top_n {
                config.top_n = *n;
            }
            let provider = build_provider(&cli, &config);
            let report = run_screen(&provider, &config, parse_date(as_of.as_deref())?, &TracingProgress)?;
            print_screen(&report);
            let dir = write_report(Report::Screen(&report), &cli.output_dir)?;
            println!("Report saved to: {}", dir.display());
            Ok(())
        }
        Commands::Pullback { as_of } => {
            let config = load_config(cli.config.as_deref())?;
            let provider = build_provider(&cli, &config);
            let report =
                run_pullback_scan(&provider, &config, parse_date(as_of.as_deref())?, &TracingProgress)?;
            print_pullback(&report);
            let dir = write_report(Report::Pullback(&report), &cli.output_dir)?;
            println!("Report saved to: {}", dir.display());
            Ok(())
        }
        Commands::Breadth => {
            let config = load_config(cli.config.as_deref())?;
            let provider = build_provider(&cli, &config);
            let breadth = run_breadth(&provider, &config)?;
            print_breadth(&breadth);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(p) => ScanConfig::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(ScanConfig::default()),
    }
}

fn parse_date(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// CSV directory first, synthetic data second (only with `--synthetic`),
/// behind a TTL cache.
fn build_provider(cli: &Cli, config: &ScanConfig) -> CachedProvider<ProviderChain> {
    let mut chain = ProviderChain::new(Duration::from_millis(config.fetch.timeout_ms))
        .with(Arc::new(CsvProvider::new(&cli.data_dir)));
    if cli.synthetic {
        tracing::warn!("synthetic fallback enabled: results may contain generated data");
        chain = chain.with(Arc::new(SyntheticProvider::default()));
    }
    tracing::debug!(providers = chain.len(), data_dir = %cli.data_dir.display(), "provider chain ready");
    CachedProvider::new(chain, &config.cache)
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = ScanConfig::default().to_toml()?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Default config written to: {}", path.display());
    Ok(())
}

fn fmt_factor(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

fn print_screen(report: &ScreenReport) {
    print_breadth(&report.breadth);
    if let Some(flow) = &report.industry_flow {
        print_industry_flow(flow);
    }
    println!();
    println!(
        "Screen as of {}: {} ranked of {} fetched, {} skipped",
        report.as_of,
        report.ranked.len(),
        report.batch_size,
        report.skipped.len()
    );
    println!(
        "{:>4}  {:<10} {:<10} {:>7} {:>8} {:>8} {:>6} {:>10}",
        "#", "symbol", "name", "score", "mom20%", "vol5/20", "rsi", "flow5d"
    );
    for (i, c) in report.ranked.iter().enumerate() {
        println!(
            "{:>4}  {:<10} {:<10} {:>7.2} {:>8} {:>8} {:>6} {:>10}",
            i + 1,
            c.symbol,
            c.name,
            c.composite_score,
            fmt_factor(c.factors.get(Factor::Momentum20d)),
            fmt_factor(c.factors.get(Factor::VolumeRatio5To20)),
            fmt_factor(c.factors.get(Factor::Rsi14)),
            fmt_factor(c.factors.get(Factor::MainNetFlow5d)),
        );
    }
}

fn print_industry_flow(flow: &IndustryFlow) {
    println!();
    println!("{:<12} {:>14}   {:<12} {:>14}", "inflow", "net (10k)", "outflow", "net (10k)");
    let rows = flow.inflow.len().max(flow.outflow.len());
    for i in 0..rows {
        let cell = |side: &[IndustryFlowRow]| match side.get(i) {
            Some(r) => (r.industry.clone(), format!("{:+.0}", r.net_amount / 1e4)),
            None => (String::new(), String::new()),
        };
        let (in_name, in_net) = cell(&flow.inflow);
        let (out_name, out_net) = cell(&flow.outflow);
        println!("{in_name:<12} {in_net:>14}   {out_name:<12} {out_net:>14}");
    }
}

fn print_pullback(report: &PullbackReport) {
    println!(
        "Pullback scan as of {}: {} hit(s) among {} candidates, {} skipped",
        report.as_of,
        report.hits.len(),
        report.scanned,
        report.skipped.len()
    );
    for hit in &report.hits {
        let s = &hit.signal;
        println!(
            "  {:<10} {:<10} base {:>8.2}  peak {:>8.2}  now {:>8.2}  target {:>8.2}  surge {:>5.1}%  vol {:>5.1}%",
            s.symbol,
            hit.fundamentals.name,
            s.base_price,
            s.peak_price,
            s.current_price,
            s.retracement_target,
            s.surge_ratio * 100.0,
            s.shrink_ratio * 100.0,
        );
    }
}

fn print_breadth(b: &MarketBreadth) {
    println!(
        "Market: {} instruments, {} up / {} down / {} flat, limit up {} / down {}, up ratio {:.1}%, turnover {:.2e}",
        b.total, b.up, b.down, b.flat, b.limit_up, b.limit_down, b.up_ratio_pct, b.total_turnover
    );
}
