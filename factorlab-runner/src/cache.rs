//! Explicit TTL cache for provider calls.
//!
//! Entries are keyed by a BLAKE3 hash of `(operation, arguments, time-bucket)`
//! where the bucket is `now / ttl`. An entry expires `ttl` seconds after it
//! was stored and is evicted the next time it is looked up. Failures are never
//! cached.

use chrono::NaiveDate;
use factorlab_core::{Fundamentals, IndustryFlowRow, MoneyflowSeries, PriceSeries, SnapshotRow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::CacheConfig;
use crate::provider::{DataError, DataProvider, Operation};

/// Source of "now", in whole seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_secs: u64) -> Self {
        Self(AtomicU64::new(start_secs))
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Content-addressed cache key.
pub fn cache_key(operation: Operation, args: &[&str], bucket: u64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(operation.as_str().as_bytes());
    for arg in args {
        hasher.update(b"\x1f");
        hasher.update(arg.as_bytes());
    }
    hasher.update(&bucket.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

struct Entry<V> {
    value: V,
    expires_at: u64,
}

/// Single-operation cache with a fixed time-to-live.
pub struct TtlCache<V> {
    operation: Operation,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(operation: Operation, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            operation,
            ttl_secs,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, args: &[&str], now: u64) -> String {
        let bucket = if self.ttl_secs == 0 { now } else { now / self.ttl_secs };
        cache_key(self.operation, args, bucket)
    }

    /// Cached value for `args`, if present and unexpired.
    pub fn get(&self, args: &[&str]) -> Option<V> {
        let now = self.clock.now_secs();
        let key = self.key(args, now);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a value; also drops every already-expired entry.
    pub fn insert(&self, args: &[&str], value: V) {
        if self.ttl_secs == 0 {
            return;
        }
        let now = self.clock.now_secs();
        let key = self.key(args, now);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl_secs,
            },
        );
    }

    /// Cached value, or the result of `fetch` (stored only on success).
    pub fn get_or_try_insert(
        &self,
        args: &[&str],
        fetch: impl FnOnce() -> Result<V, DataError>,
    ) -> Result<V, DataError> {
        if let Some(hit) = self.get(args) {
            tracing::trace!(operation = %self.operation, ?args, "cache hit");
            return Ok(hit);
        }
        let value = fetch()?;
        self.insert(args, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps a provider with one `TtlCache` per operation.
pub struct CachedProvider<P> {
    inner: P,
    snapshots: TtlCache<Vec<SnapshotRow>>,
    prices: TtlCache<PriceSeries>,
    flows: TtlCache<MoneyflowSeries>,
    fundamentals: TtlCache<Vec<Fundamentals>>,
    industry_flows: TtlCache<Vec<IndustryFlowRow>>,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: P, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            snapshots: TtlCache::new(Operation::Snapshot, config.snapshot_ttl_secs, Arc::clone(&clock)),
            prices: TtlCache::new(Operation::PriceHistory, config.price_history_ttl_secs, Arc::clone(&clock)),
            flows: TtlCache::new(Operation::Moneyflow, config.moneyflow_ttl_secs, Arc::clone(&clock)),
            fundamentals: TtlCache::new(Operation::Fundamentals, config.fundamentals_ttl_secs, Arc::clone(&clock)),
            industry_flows: TtlCache::new(Operation::IndustryFlow, config.moneyflow_ttl_secs, clock),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn snapshot(&self) -> Result<Vec<SnapshotRow>, DataError> {
        self.snapshots.get_or_try_insert(&[], || self.inner.snapshot())
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let (s, e) = (start.to_string(), end.to_string());
        self.prices
            .get_or_try_insert(&[symbol, &s, &e], || self.inner.price_history(symbol, start, end))
    }

    fn moneyflow(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MoneyflowSeries, DataError> {
        let (s, e) = (start.to_string(), end.to_string());
        self.flows
            .get_or_try_insert(&[symbol, &s, &e], || self.inner.moneyflow(symbol, start, end))
    }

    fn fundamentals(&self) -> Result<Vec<Fundamentals>, DataError> {
        self.fundamentals.get_or_try_insert(&[], || self.inner.fundamentals())
    }

    fn industry_flows(&self) -> Result<Vec<IndustryFlowRow>, DataError> {
        self.industry_flows.get_or_try_insert(&[], || self.inner.industry_flows())
    }
}
