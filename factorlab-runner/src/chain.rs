//! Ordered provider fallback chain.
//!
//! Providers are tried in order; each call runs on its own worker thread and
//! is abandoned once the per-provider timeout elapses. The first success wins.
//! Every attempt is recorded. There is no retry and no backoff: a provider
//! that fails is simply skipped for this call.
//!
//! An abandoned worker keeps running until the provider call returns; threads
//! cannot be cancelled. Each provider may hold at most
//! `MAX_STALLED_WORKERS` such threads, after which it is skipped without
//! spawning until one of them finishes.

use chrono::NaiveDate;
use factorlab_core::{Fundamentals, IndustryFlowRow, MoneyflowSeries, PriceSeries, SnapshotRow};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::provider::{DataError, DataProvider, Operation};

/// Abandoned-but-running workers tolerated per provider.
pub const MAX_STALLED_WORKERS: usize = 2;

/// How one provider call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Failed(String),
    TimedOut,
    /// Not attempted: the provider still has too many stalled workers.
    Saturated,
}

struct Slot {
    provider: Arc<dyn DataProvider>,
    /// Workers spawned for this provider that have not returned yet.
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when the worker finishes, even on panic.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One provider call made by the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub provider: String,
    pub operation: Operation,
    pub key: String,
    pub outcome: AttemptOutcome,
}

pub struct ProviderChain {
    slots: Vec<Slot>,
    timeout: Duration,
    attempts: Mutex<Vec<FetchAttempt>>,
}

impl ProviderChain {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Vec::new(),
            timeout,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Append a provider; earlier providers are preferred.
    pub fn with(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.slots.push(Slot {
            provider,
            in_flight: Arc::new(AtomicUsize::new(0)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Attempts recorded so far, oldest first.
    pub fn attempts(&self) -> Vec<FetchAttempt> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drain the attempt log.
    pub fn take_attempts(&self) -> Vec<FetchAttempt> {
        std::mem::take(&mut *self.attempts.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, provider: &str, operation: Operation, key: &str, outcome: AttemptOutcome) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FetchAttempt {
                provider: provider.to_string(),
                operation,
                key: key.to_string(),
                outcome,
            });
    }

    /// Run `call` against each provider in turn until one succeeds.
    fn first_success<T, F>(&self, operation: Operation, key: &str, call: F) -> Result<T, DataError>
    where
        T: Send + 'static,
        F: Fn(&dyn DataProvider) -> Result<T, DataError> + Clone + Send + 'static,
    {
        let mut last = None;
        for slot in &self.slots {
            let name = slot.provider.name().to_string();
            if slot.in_flight.load(Ordering::SeqCst) >= MAX_STALLED_WORKERS {
                tracing::warn!(provider = %name, %operation, key, "provider saturated by stalled workers");
                self.record(&name, operation, key, AttemptOutcome::Saturated);
                last = Some(DataError::Other(format!("{name}: too many stalled requests")));
                continue;
            }

            let (tx, rx) = mpsc::channel();
            let worker = Arc::clone(&slot.provider);
            let call = call.clone();
            slot.in_flight.fetch_add(1, Ordering::SeqCst);
            let guard = InFlight(Arc::clone(&slot.in_flight));
            let spawned = std::thread::Builder::new()
                .name(format!("fetch-{name}"))
                .spawn(move || {
                    let _guard = guard;
                    // The receiver is gone once the chain has given up on us.
                    let _ = tx.send(call(worker.as_ref()));
                });
            if let Err(e) = spawned {
                self.record(&name, operation, key, AttemptOutcome::Failed(e.to_string()));
                last = Some(DataError::Io(e));
                continue;
            }

            match rx.recv_timeout(self.timeout) {
                Ok(Ok(value)) => {
                    self.record(&name, operation, key, AttemptOutcome::Success);
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    tracing::debug!(provider = %name, %operation, key, error = %e, "provider failed");
                    self.record(&name, operation, key, AttemptOutcome::Failed(e.to_string()));
                    last = Some(e);
                }
                Err(_) => {
                    let after_ms = self.timeout.as_millis() as u64;
                    tracing::debug!(provider = %name, %operation, key, after_ms, "provider timed out");
                    self.record(&name, operation, key, AttemptOutcome::TimedOut);
                    last = Some(DataError::Timeout { provider: name, after_ms });
                }
            }
        }
        Err(DataError::AllProvidersFailed {
            operation,
            key: key.to_string(),
            attempts: self.slots.len(),
            last: last.map(Box::new),
        })
    }
}

impl DataProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
        self.first_success(Operation::Snapshot, "", |p| p.snapshot())
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let owned = symbol.to_string();
        self.first_success(Operation::PriceHistory, symbol, move |p| {
            p.price_history(&owned, start, end)
        })
    }

    fn moneyflow(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MoneyflowSeries, DataError> {
        let owned = symbol.to_string();
        self.first_success(Operation::Moneyflow, symbol, move |p| p.moneyflow(&owned, start, end))
    }

    fn fundamentals(&self) -> Result<Vec<Fundamentals>, DataError> {
        self.first_success(Operation::Fundamentals, "", |p| p.fundamentals())
    }

    fn industry_flows(&self) -> Result<Vec<IndustryFlowRow>, DataError> {
        self.first_success(Operation::IndustryFlow, "", |p| p.industry_flows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl DataProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
            Err(DataError::RateLimited { provider: "failing".into() })
        }
    }

    struct Slow;

    impl DataProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
    }

    struct Fixed;

    impl DataProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
            Ok(vec![SnapshotRow {
                symbol: "600000.SH".into(),
                name: "浦发银行".into(),
                industry: "银行".into(),
                pct_change: 0.5,
                turnover: 1e9,
            }])
        }
    }

    #[test]
    fn falls_back_to_next_provider() {
        let chain = ProviderChain::new(Duration::from_secs(2))
            .with(Arc::new(Failing))
            .with(Arc::new(Fixed));
        let rows = chain.snapshot().unwrap();
        assert_eq!(rows.len(), 1);

        let attempts = chain.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].provider, "failing");
        assert!(matches!(attempts[0].outcome, AttemptOutcome::Failed(_)));
        assert_eq!(attempts[1].outcome, AttemptOutcome::Success);
    }

    #[test]
    fn slow_provider_is_abandoned() {
        let chain = ProviderChain::new(Duration::from_millis(20))
            .with(Arc::new(Slow))
            .with(Arc::new(Fixed));
        assert_eq!(chain.snapshot().unwrap().len(), 1);
        assert_eq!(chain.take_attempts()[0].outcome, AttemptOutcome::TimedOut);
        assert!(chain.attempts().is_empty());
    }

    #[test]
    fn all_failures_surface_last_error() {
        let chain = ProviderChain::new(Duration::from_millis(20))
            .with(Arc::new(Failing))
            .with(Arc::new(Slow));
        match chain.snapshot() {
            Err(DataError::AllProvidersFailed { attempts, last, .. }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(last.as_deref(), Some(DataError::Timeout { .. })));
            }
            other => panic!("expected chain failure, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_operations_fall_through() {
        let chain = ProviderChain::new(Duration::from_secs(1)).with(Arc::new(Fixed));
        let err = chain.fundamentals().unwrap_err();
        assert!(matches!(err, DataError::AllProvidersFailed { attempts: 1, .. }));
    }

    #[test]
    fn stalled_provider_stops_spawning_workers() {
        let chain = ProviderChain::new(Duration::from_millis(10))
            .with(Arc::new(Slow))
            .with(Arc::new(Fixed));
        for _ in 0..4 {
            assert_eq!(chain.snapshot().unwrap().len(), 1);
        }
        let slow: Vec<AttemptOutcome> = chain
            .attempts()
            .into_iter()
            .filter(|a| a.provider == "slow")
            .map(|a| a.outcome)
            .collect();
        assert_eq!(
            slow,
            vec![
                AttemptOutcome::TimedOut,
                AttemptOutcome::TimedOut,
                AttemptOutcome::Saturated,
                AttemptOutcome::Saturated,
            ]
        );

        // Once the stalled workers return, the provider is tried again.
        std::thread::sleep(Duration::from_millis(600));
        chain.take_attempts();
        chain.snapshot().unwrap();
        assert_eq!(chain.attempts()[0].outcome, AttemptOutcome::TimedOut);
    }

    #[test]
    fn empty_chain_fails_without_attempts() {
        let chain = ProviderChain::new(Duration::from_secs(1));
        assert!(chain.is_empty());
        assert!(chain.snapshot().is_err());
        assert!(chain.attempts().is_empty());
    }
}
