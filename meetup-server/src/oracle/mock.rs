//! Deterministic oracles for testing and offline operation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::domain::{Stop, StopId};
use crate::matrix::GeoMetric;

use super::TransitOracle;
use super::error::OracleError;

type PairKey = (StopId, StopId);

/// Scripted routing oracle.
///
/// Answers come from a fixed table of durations, optionally backed by a
/// geo-derived estimate. Individual pairs (or every pair) can be scripted to
/// fail, and artificial latency can be added to exercise timeouts. Every call
/// is counted and logged.
#[derive(Debug, Default)]
pub struct MockOracle {
    durations: HashMap<PairKey, f64>,
    failing: HashSet<PairKey>,
    fail_all: bool,
    symmetric: bool,
    geo_fallback: Option<(GeoMetric, f64)>,
    latency: Option<Duration>,
    pair_latency: HashMap<PairKey, Duration>,
    calls: AtomicUsize,
    call_log: Mutex<Vec<PairKey>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a duration for an ordered pair.
    pub fn with_duration(mut self, from: &StopId, to: &StopId, minutes: f64) -> Self {
        self.durations.insert((from.clone(), to.clone()), minutes);
        self
    }

    /// Answer B→A with the A→B duration when only one direction is scripted.
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Answer unscripted pairs with `metric` distance times `minutes_per_unit`.
    pub fn with_geo_fallback(mut self, metric: GeoMetric, minutes_per_unit: f64) -> Self {
        self.geo_fallback = Some((metric, minutes_per_unit));
        self
    }

    /// Make one ordered pair fail with `Unavailable`.
    pub fn with_failure(mut self, from: &StopId, to: &StopId) -> Self {
        self.failing.insert((from.clone(), to.clone()));
        self
    }

    /// Make every query fail with `Unavailable`.
    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Delay every answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay answers for one ordered pair.
    pub fn with_pair_latency(mut self, from: &StopId, to: &StopId, latency: Duration) -> Self {
        self.pair_latency.insert((from.clone(), to.clone()), latency);
        self
    }

    /// Number of queries received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Pairs queried so far, in arrival order.
    pub fn calls(&self) -> Vec<(StopId, StopId)> {
        self.call_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Reset the call counter and log.
    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
        if let Ok(mut log) = self.call_log.lock() {
            log.clear();
        }
    }

    fn answer(&self, from: &Stop, to: &Stop) -> Result<f64, OracleError> {
        let key = (from.id().clone(), to.id().clone());

        if self.fail_all || self.failing.contains(&key) {
            return Err(OracleError::Unavailable(format!(
                "scripted failure for {} -> {}",
                from.id(),
                to.id()
            )));
        }

        if let Some(minutes) = self.durations.get(&key) {
            return Ok(*minutes);
        }

        if self.symmetric {
            if let Some(minutes) = self.durations.get(&(key.1.clone(), key.0.clone())) {
                return Ok(*minutes);
            }
        }

        if let Some((metric, factor)) = self.geo_fallback {
            return Ok(metric.distance(from, to) * factor);
        }

        Err(OracleError::NoConnection {
            from: key.0,
            to: key.1,
        })
    }
}

impl TransitOracle for MockOracle {
    async fn query_transit(
        &self,
        from: &Stop,
        to: &Stop,
        _at: NaiveDateTime,
    ) -> Result<f64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.call_log.lock() {
            log.push((from.id().clone(), to.id().clone()));
        }

        let delay = self
            .pair_latency
            .get(&(from.id().clone(), to.id().clone()))
            .copied()
            .or(self.latency);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.answer(from, to)
    }
}

/// Oracle used when no routing service is configured.
///
/// Every query fails as unavailable, so ranking degrades to the configured
/// fallback policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

impl TransitOracle for OfflineOracle {
    async fn query_transit(
        &self,
        _from: &Stop,
        _to: &Stop,
        _at: NaiveDateTime,
    ) -> Result<f64, OracleError> {
        Err(OracleError::Unavailable(
            "no routing oracle configured".to_string(),
        ))
    }
}
