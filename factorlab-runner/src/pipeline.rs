//! Screening and pullback pipelines.
//!
//! Both pipelines follow the same shape:
//! 1. one market-wide call (snapshot or fundamentals); failure aborts the scan
//! 2. filter to a candidate list
//! 3. sequential per-symbol fetches, every history request paced by the rate
//!    limiter; a symbol whose price fetch fails is logged, recorded as
//!    skipped, and never retried
//! 4. pure computation over the fetched series in parallel (rayon)

use chrono::{Duration, NaiveDate};
use factorlab_core::indicators::IndicatorSet;
use factorlab_core::screen::{candidate_factors, score_candidate};
use factorlab_core::scoring::rank_by_score;
use factorlab_core::{
    Fundamentals, IndustryFlow, MarketBreadth, MoneyflowSeries, PatternSignal, PriceSeries, PullbackDetector,
    ScanError, ScoredCandidate, SnapshotRow,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::provider::{DataError, DataProvider, ScanProgress};
use crate::throttle::RateLimiter;

/// Industries kept at each end of the flow ranking.
pub const INDUSTRY_FLOW_TOP: usize = 5;

/// Outcome of a screening scan.
#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub as_of: NaiveDate,
    /// Best candidates, highest composite score first.
    pub ranked: Vec<ScoredCandidate>,
    /// Breadth of the full, unfiltered snapshot.
    pub breadth: MarketBreadth,
    /// Industry flow ranking; `None` when the provider could not serve it.
    pub industry_flow: Option<IndustryFlow>,
    /// Candidates dropped for missing data or failed fetches.
    pub skipped: Vec<ScanError>,
    /// Number of candidates actually fetched and scored.
    pub batch_size: usize,
}

/// A detected formation together with the fundamentals that admitted it.
#[derive(Debug, Clone, Serialize)]
pub struct PullbackHit {
    pub signal: PatternSignal,
    pub fundamentals: Fundamentals,
}

/// Outcome of a pullback scan.
#[derive(Debug, Clone)]
pub struct PullbackReport {
    pub as_of: NaiveDate,
    pub hits: Vec<PullbackHit>,
    /// Symbols that passed the fundamentals pre-filter.
    pub scanned: usize,
    pub skipped: Vec<ScanError>,
}

fn history_start(as_of: NaiveDate, days: u32) -> NaiveDate {
    as_of - Duration::days(i64::from(days))
}

/// Run a screening scan as of `as_of`.
pub fn run_screen(
    provider: &dyn DataProvider,
    config: &ScanConfig,
    as_of: NaiveDate,
    progress: &dyn ScanProgress,
) -> Result<ScreenReport, DataError> {
    config.warn_on_weights();

    let snapshot = provider.snapshot()?;
    let breadth = MarketBreadth::from_snapshot(&snapshot, config.universe.limit_move_pct);
    let industry_flow = match provider.industry_flows() {
        Ok(rows) => Some(IndustryFlow::rank(&rows, INDUSTRY_FLOW_TOP)),
        Err(e) => {
            tracing::warn!(error = %e, "industry flow unavailable");
            None
        }
    };
    let candidates = config.universe.select(&snapshot);
    tracing::info!(
        provider = provider.name(),
        snapshot = snapshot.len(),
        candidates = candidates.len(),
        "universe filtered"
    );

    let start = history_start(as_of, config.fetch.history_days);
    let limiter = RateLimiter::from_millis(config.fetch.min_delay_ms);
    let total = candidates.len();
    progress.on_start(total);

    let mut fetched: Vec<(SnapshotRow, PriceSeries, Option<MoneyflowSeries>)> = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (index, row) in candidates.into_iter().enumerate() {
        limiter.acquire();
        let prices = match provider.price_history(&row.symbol, start, as_of) {
            Ok(p) => p,
            Err(e) => {
                let err = e.to_scan_error(&row.symbol);
                progress.on_symbol(&row.symbol, index, total, Err(&err));
                skipped.push(err);
                continue;
            }
        };
        limiter.acquire();
        let flows = match provider.moneyflow(&row.symbol, start, as_of) {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!(
                    symbol = %row.symbol,
                    error = %e,
                    "moneyflow fetch failed; flow factors omitted"
                );
                None
            }
        };
        progress.on_symbol(&row.symbol, index, total, Ok(()));
        fetched.push((row, prices, flows));
    }

    let indicators = IndicatorSet::standard();
    let scored: Vec<Result<ScoredCandidate, ScanError>> = fetched
        .par_iter()
        .map(|(row, prices, flows)| {
            candidate_factors(&indicators, &row.symbol, Some(prices), flows.as_ref())
                .map(|factors| score_candidate(row, factors, &config.weights))
        })
        .collect();

    let mut ranked = Vec::with_capacity(scored.len());
    for result in scored {
        match result {
            Ok(candidate) => ranked.push(candidate),
            Err(e) => {
                tracing::warn!(symbol = e.symbol(), error = %e, "candidate skipped");
                skipped.push(e);
            }
        }
    }
    let ranked = rank_by_score(ranked, config.top_n, |c| c.composite_score);
    progress.on_complete(total - skipped.len(), skipped.len());

    Ok(ScreenReport {
        as_of,
        ranked,
        breadth,
        industry_flow,
        skipped,
        batch_size: total,
    })
}

/// Run a pullback scan as of `as_of`.
pub fn run_pullback_scan(
    provider: &dyn DataProvider,
    config: &ScanConfig,
    as_of: NaiveDate,
    progress: &dyn ScanProgress,
) -> Result<PullbackReport, DataError> {
    let universe = provider.fundamentals()?;
    let candidates = config.fundamentals.apply(&universe);
    tracing::info!(
        provider = provider.name(),
        universe = universe.len(),
        candidates = candidates.len(),
        "fundamentals pre-filter applied"
    );

    let start = history_start(as_of, config.pullback.lookback_days);
    let limiter = RateLimiter::from_millis(config.fetch.min_delay_ms);
    let min_history = config.pullback.min_history;
    let total = candidates.len();
    progress.on_start(total);

    let mut fetched: Vec<(Fundamentals, PriceSeries)> = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (index, row) in candidates.into_iter().enumerate() {
        limiter.acquire();
        let outcome = provider
            .price_history(&row.symbol, start, as_of)
            .map_err(|e| e.to_scan_error(&row.symbol))
            .and_then(|series| {
                if series.len() < min_history {
                    Err(ScanError::ComputationSkipped {
                        symbol: row.symbol.clone(),
                        indicator: "pullback".to_string(),
                        required: min_history,
                        available: series.len(),
                    })
                } else {
                    Ok(series)
                }
            });
        match outcome {
            Ok(series) => {
                progress.on_symbol(&row.symbol, index, total, Ok(()));
                fetched.push((row, series));
            }
            Err(err) => {
                progress.on_symbol(&row.symbol, index, total, Err(&err));
                skipped.push(err);
            }
        }
    }

    let detector = PullbackDetector::new(config.pullback.params);
    let hits: Vec<PullbackHit> = fetched
        .par_iter()
        .filter_map(|(fundamentals, series)| match detector.evaluate(&fundamentals.symbol, series) {
            Ok(signal) => Some(PullbackHit {
                signal,
                fundamentals: fundamentals.clone(),
            }),
            Err(reason) => {
                tracing::debug!(symbol = %fundamentals.symbol, %reason, "no pullback");
                None
            }
        })
        .collect();
    progress.on_complete(total - skipped.len(), skipped.len());
    tracing::info!(hits = hits.len(), "pullback scan complete");

    Ok(PullbackReport {
        as_of,
        hits,
        scanned: total,
        skipped,
    })
}

/// Breadth summary of the current snapshot.
pub fn run_breadth(provider: &dyn DataProvider, config: &ScanConfig) -> Result<MarketBreadth, DataError> {
    let snapshot = provider.snapshot()?;
    Ok(MarketBreadth::from_snapshot(&snapshot, config.universe.limit_move_pct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SilentProgress;
    use crate::synthetic::SyntheticProvider;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration as StdDuration, Instant};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Metadata, Subscriber};

    fn fast_config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.fetch.min_delay_ms = 0;
        config
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn screen_respects_batch_and_top_n() {
        let mut config = fast_config();
        config.universe.batch_size = 12;
        config.universe.min_turnover = 0.0;
        config.top_n = 5;
        let report =
            run_screen(&SyntheticProvider::new(80), &config, as_of(), &SilentProgress).unwrap();
        assert_eq!(report.batch_size, 12);
        assert_eq!(report.ranked.len(), 5);
        assert_eq!(report.breadth.total, 80);
        let flow = report.industry_flow.unwrap();
        assert_eq!(flow.inflow.len(), INDUSTRY_FLOW_TOP);
        assert!(flow.inflow[0].net_amount >= flow.outflow[0].net_amount);
        for pair in report.ranked.windows(2) {
            assert!(pair[0].composite_score >= pair[1].composite_score);
        }
    }

    #[test]
    fn pullback_skips_short_histories() {
        let mut config = fast_config();
        config.fundamentals = factorlab_core::FundamentalsFilter {
            min_float_cap: 0.0,
            max_float_cap: f64::MAX,
            pe_min: f64::MIN,
            pe_max: f64::MAX,
            ..Default::default()
        };
        // 20 calendar days hold at most 16 trading days.
        config.pullback.lookback_days = 20;
        let report =
            run_pullback_scan(&SyntheticProvider::new(10), &config, as_of(), &SilentProgress).unwrap();
        assert!(report.hits.is_empty());
        assert_eq!(report.skipped.len(), report.scanned);
        assert!(report
            .skipped
            .iter()
            .all(|e| matches!(e, ScanError::ComputationSkipped { required: 40, .. })));
    }

    /// Stamps every history request made through it.
    struct Recording {
        inner: SyntheticProvider,
        stamps: Mutex<Vec<Instant>>,
        flows_down: bool,
    }

    impl Recording {
        fn new(flows_down: bool) -> Self {
            Self {
                inner: SyntheticProvider::new(80),
                stamps: Mutex::new(Vec::new()),
                flows_down,
            }
        }

        fn stamp(&self) {
            self.stamps.lock().unwrap().push(Instant::now());
        }
    }

    impl DataProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
            self.inner.snapshot()
        }

        fn price_history(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries, DataError> {
            self.stamp();
            self.inner.price_history(symbol, start, end)
        }

        fn moneyflow(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<MoneyflowSeries, DataError> {
            self.stamp();
            if self.flows_down {
                return Err(DataError::Timeout {
                    provider: "recording".into(),
                    after_ms: 20_000,
                });
            }
            self.inner.moneyflow(symbol, start, end)
        }
    }

    #[test]
    fn every_history_fetch_is_paced() {
        let mut config = fast_config();
        config.fetch.min_delay_ms = 40;
        config.universe.batch_size = 3;
        config.universe.min_turnover = 0.0;
        let provider = Recording::new(false);
        run_screen(&provider, &config, as_of(), &SilentProgress).unwrap();

        let stamps = provider.stamps.into_inner().unwrap();
        // price and moneyflow for each of the 3 candidates
        assert_eq!(stamps.len(), 6);
        // The limiter stamps just before each call, so allow a little slack.
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= StdDuration::from_millis(35));
        }
    }

    /// Collects `(level, message)` for every event emitted inside `f`.
    fn messages_during(f: impl FnOnce()) -> Vec<(Level, String)> {
        #[derive(Clone, Default)]
        struct Collector(Arc<Mutex<Vec<(Level, String)>>>);

        struct Message(String);

        impl Visit for Message {
            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.0 = format!("{value:?}");
                }
            }
        }

        impl Subscriber for Collector {
            fn enabled(&self, _: &Metadata<'_>) -> bool {
                true
            }
            fn new_span(&self, _: &Attributes<'_>) -> Id {
                Id::from_u64(1)
            }
            fn record(&self, _: &Id, _: &Record<'_>) {}
            fn record_follows_from(&self, _: &Id, _: &Id) {}
            fn event(&self, event: &Event<'_>) {
                let mut message = Message(String::new());
                event.record(&mut message);
                self.0.lock().unwrap().push((*event.metadata().level(), message.0));
            }
            fn enter(&self, _: &Id) {}
            fn exit(&self, _: &Id) {}
        }

        let collector = Collector::default();
        tracing::subscriber::with_default(collector.clone(), f);
        let events = collector.0.lock().unwrap().clone();
        events
    }

    #[test]
    fn failed_moneyflow_warns_and_keeps_the_candidate() {
        let mut config = fast_config();
        config.universe.batch_size = 3;
        config.universe.min_turnover = 0.0;
        let provider = Recording::new(true);
        let mut report = None;
        let events = messages_during(|| {
            report = Some(run_screen(&provider, &config, as_of(), &SilentProgress).unwrap());
        });

        let report = report.unwrap();
        assert_eq!(report.ranked.len(), 3);
        assert!(report.skipped.is_empty());
        assert!(report
            .ranked
            .iter()
            .all(|c| !c.factors.contains(factorlab_core::Factor::MainNetFlow5d)));
        let warnings = events
            .iter()
            .filter(|(level, msg)| *level == Level::WARN && msg.starts_with("moneyflow fetch failed"))
            .count();
        assert_eq!(warnings, 3);
    }

    #[test]
    fn breadth_counts_the_whole_snapshot() {
        let breadth = run_breadth(&SyntheticProvider::new(50), &fast_config()).unwrap();
        assert_eq!(breadth.total, 50);
        assert_eq!(breadth.up + breadth.down + breadth.flat, 50);
    }
}
