//! Caching layer for routing oracle answers.
//!
//! Oracle calls are slow and rate-limited, and the same pair is asked for
//! repeatedly when several groups meet around the same time. We memoise
//! successful answers keyed by (from, to, time bucket).
//!
//! Time bucketing (5-minute buckets by default) bounds cache cardinality
//! while keeping answers specific to the meeting time. Failures are never
//! cached.

use std::time::Duration;

use chrono::NaiveDateTime;
use moka::future::Cache as MokaCache;

use crate::domain::{DEFAULT_BUCKET_MINS, Stop, StopId, TimeBucket};
use crate::oracle::{OracleError, TransitOracle};

/// Cache key: (from, to, time bucket).
type TransitKey = (StopId, StopId, TimeBucket);

/// Configuration for the oracle cache.
#[derive(Debug, Clone)]
pub struct OracleCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Time bucket size in minutes.
    pub bucket_mins: u32,
}

impl Default for OracleCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 1_000_000,
            bucket_mins: DEFAULT_BUCKET_MINS,
        }
    }
}

/// Oracle wrapper with caching.
///
/// Wraps any `TransitOracle` and caches successful answers.
pub struct CachedOracle<O> {
    inner: O,
    cache: MokaCache<TransitKey, f64>,
    bucket_mins: u32,
}

impl<O: TransitOracle> CachedOracle<O> {
    /// Create a new cached oracle.
    pub fn new(inner: O, config: &OracleCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            inner,
            cache,
            bucket_mins: config.bucket_mins,
        }
    }

    fn key(&self, from: &Stop, to: &Stop, at: NaiveDateTime) -> TransitKey {
        (
            from.id().clone(),
            to.id().clone(),
            TimeBucket::of(at, self.bucket_mins),
        )
    }

    /// Access the underlying oracle for operations that bypass cache.
    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Get cache statistics.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Flush pending cache maintenance so counts are current.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<O: TransitOracle> TransitOracle for CachedOracle<O> {
    async fn query_transit(
        &self,
        from: &Stop,
        to: &Stop,
        at: NaiveDateTime,
    ) -> Result<f64, OracleError> {
        let key = self.key(from, to, at);

        // Try cache first
        if let Some(minutes) = self.cache.get(&key).await {
            return Ok(minutes);
        }

        let minutes = self.inner.query_transit(from, to, at).await?;
        self.cache.insert(key, minutes).await;
        Ok(minutes)
    }
}
