//! Pipeline configuration for the meeting point planner.

use std::time::Duration;

/// Default minutes charged per geo unit for an unresolved pair.
///
/// Roughly 15 km/h door to door, typical for urban public transit.
pub const DEFAULT_GEO_PENALTY: f64 = 4.0;

/// What to do with a candidate whose transit durations could not all be
/// refined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnresolvedPolicy {
    /// Drop any candidate with at least one unresolved source pair.
    Exclude,

    /// Score unresolved pairs as `geo_distance * penalty` minutes.
    ///
    /// A candidate is still dropped when the fraction of its source pairs
    /// that are unresolved exceeds `max_unresolved_fraction`.
    GeoFallback {
        penalty: f64,
        max_unresolved_fraction: f64,
    },
}

impl UnresolvedPolicy {
    /// Geo fallback that never drops a candidate.
    pub fn geo_fallback(penalty: f64) -> Self {
        UnresolvedPolicy::GeoFallback {
            penalty,
            max_unresolved_fraction: 1.0,
        }
    }

    /// Whether a candidate with `unresolved` of `total` pairs is dropped.
    pub fn excludes(&self, unresolved: usize, total: usize) -> bool {
        if unresolved == 0 {
            return false;
        }
        match self {
            UnresolvedPolicy::Exclude => true,
            UnresolvedPolicy::GeoFallback {
                max_unresolved_fraction,
                ..
            } => {
                let fraction = unresolved as f64 / total.max(1) as f64;
                fraction > *max_unresolved_fraction
            }
        }
    }
}

impl Default for UnresolvedPolicy {
    fn default() -> Self {
        UnresolvedPolicy::Exclude
    }
}

/// Configuration parameters for the planner pipeline.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Number of oracle queries in flight at once.
    pub workers: usize,

    /// Timeout for a single oracle query (seconds).
    /// A query exceeding it counts as a failure.
    pub query_timeout_secs: u64,

    /// Deadline for a whole refinement batch (seconds).
    /// Pairs still pending when it passes are left unresolved.
    pub batch_deadline_secs: u64,

    /// Handling of candidates with unresolved pairs.
    pub unresolved_policy: UnresolvedPolicy,

    /// Whether a source stop may itself be proposed as a meeting point.
    pub allow_source_candidates: bool,

    /// Maximum number of people in one query.
    pub max_sources: usize,
}

impl PlannerConfig {
    /// Set the worker count (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_query_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    pub fn with_batch_deadline_secs(mut self, secs: u64) -> Self {
        self.batch_deadline_secs = secs;
        self
    }

    pub fn with_unresolved_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved_policy = policy;
        self
    }

    pub fn with_allow_source_candidates(mut self, allow: bool) -> Self {
        self.allow_source_candidates = allow;
        self
    }

    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources = max;
        self
    }

    /// Returns the per-query timeout as a Duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Returns the batch deadline as a Duration.
    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            query_timeout_secs: 15,
            batch_deadline_secs: 120,
            unresolved_policy: UnresolvedPolicy::Exclude,
            allow_source_candidates: false,
            max_sources: 12,
        }
    }
}
