//! Stop-to-stop distance store.
//!
//! The matrix combines two kinds of distance:
//! - **geo**: a static, symmetric estimate derived from coordinates (or
//!   supplied up front). Always available for catalogue stops.
//! - **transit**: an authoritative, directional, time-dependent duration
//!   obtained from the routing oracle. Stored per time bucket and only
//!   present once refined.
//!
//! Static data is fixed after construction. Transit samples live in a
//! sharded, lock-protected layer so refinement workers can record results
//! concurrently while the matrix is shared behind an `Arc`. The refined
//! layer is bounded: each pair keeps a limited number of buckets, and
//! [`DistanceMatrix::evict_before`] drops buckets whose time has passed.

mod entry;
mod geo;
mod shard;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::catalogue::{Catalogue, StaticDistanceRow};
use crate::domain::{DEFAULT_BUCKET_MINS, StopId, TimeBucket, UnknownStop};

pub use entry::{DistanceEntry, TransitSample};
pub use geo::GeoMetric;

use shard::TransitShards;

/// Default number of refined buckets kept per ordered pair: one day of
/// five-minute buckets.
pub const DEFAULT_MAX_BUCKETS_PER_PAIR: usize = 288;

/// Unordered key for symmetric geo distances.
fn geo_key(a: &StopId, b: &StopId) -> (StopId, StopId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Queryable store of geo and transit distances between catalogue stops.
pub struct DistanceMatrix {
    catalogue: Arc<Catalogue>,
    metric: GeoMetric,
    bucket_mins: u32,

    /// Supplied geo distances, keyed by unordered pair.
    geo: HashMap<(StopId, StopId), f64>,

    /// Time-agnostic transit estimates, keyed by ordered pair.
    baseline: HashMap<(StopId, StopId), f64>,

    /// Refined transit samples.
    transit: TransitShards,
}

impl DistanceMatrix {
    /// Create an empty matrix over a catalogue.
    ///
    /// Geo distances are computed on demand with `metric` until static
    /// values are seeded.
    pub fn new(catalogue: Arc<Catalogue>, metric: GeoMetric) -> Self {
        Self {
            catalogue,
            metric,
            bucket_mins: DEFAULT_BUCKET_MINS,
            geo: HashMap::new(),
            baseline: HashMap::new(),
            transit: TransitShards::new(DEFAULT_MAX_BUCKETS_PER_PAIR),
        }
    }

    /// Limit how many refined buckets are kept per ordered pair.
    ///
    /// Replaces the refined layer, so call it before any updates.
    pub fn with_max_buckets_per_pair(mut self, max: usize) -> Self {
        self.transit = TransitShards::new(max);
        self
    }

    /// Set the time bucket size used for transit lookups.
    pub fn with_bucket_mins(mut self, mins: u32) -> Self {
        self.bucket_mins = mins.max(1);
        self
    }

    /// Load pre-computed distances.
    ///
    /// Rows with a `departure` seed the refined layer for that time bucket,
    /// stamped with `seeded_at`. Rows without one become baselines.
    pub fn seed(&mut self, rows: &[StaticDistanceRow], seeded_at: DateTime<Utc>) {
        let mut seeded_transit = 0usize;
        for row in rows {
            if let Some(km) = row.geo_km {
                self.geo.insert(geo_key(&row.from, &row.to), km);
            }
            match (row.transit_minutes, row.departure) {
                (Some(minutes), Some(departure)) => {
                    self.update(&row.from, &row.to, departure, minutes, seeded_at);
                    seeded_transit += 1;
                }
                (Some(minutes), None) => {
                    self.baseline
                        .insert((row.from.clone(), row.to.clone()), minutes);
                }
                (None, _) => {}
            }
        }
        debug!(
            rows = rows.len(),
            geo = self.geo.len(),
            baseline = self.baseline.len(),
            seeded_transit,
            "Seeded distance matrix"
        );
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn metric(&self) -> GeoMetric {
        self.metric
    }

    pub fn bucket_mins(&self) -> u32 {
        self.bucket_mins
    }

    /// The time bucket a datetime falls into.
    pub fn bucket(&self, at: NaiveDateTime) -> TimeBucket {
        TimeBucket::of(at, self.bucket_mins)
    }

    /// Snapshot of everything known about an ordered pair.
    ///
    /// Returns `None` if either stop is not in the catalogue.
    pub fn get(&self, from: &StopId, to: &StopId) -> Option<DistanceEntry> {
        let geo = self.geo_distance(from, to).ok()?;
        Some(DistanceEntry {
            geo,
            baseline_minutes: self.baseline.get(&(from.clone(), to.clone())).copied(),
            samples: self.transit.samples(from, to),
        })
    }

    /// Geo distance between two stops.
    ///
    /// Supplied values win over computed ones. Symmetric.
    pub fn geo_distance(&self, from: &StopId, to: &StopId) -> Result<f64, UnknownStop> {
        let a = self.catalogue.require(from)?;
        let b = self.catalogue.require(to)?;
        if from == to {
            return Ok(0.0);
        }
        Ok(self
            .geo
            .get(&geo_key(from, to))
            .copied()
            .unwrap_or_else(|| self.metric.distance(a, b)))
    }

    /// Authoritative transit duration for the time bucket of `at`.
    ///
    /// `None` means "not yet known", never zero distance. Travelling from a
    /// stop to itself takes no time.
    pub fn transit_distance(&self, from: &StopId, to: &StopId, at: NaiveDateTime) -> Option<f64> {
        if from == to && self.catalogue.contains(from) {
            return Some(0.0);
        }
        self.transit
            .sample(from, to, self.bucket(at))
            .map(|s| s.minutes)
    }

    /// Best transit estimate regardless of time: the baseline if one was
    /// supplied, else the most recently refined sample.
    ///
    /// Used only for cheap pre-filtering.
    pub fn known_transit(&self, from: &StopId, to: &StopId) -> Option<f64> {
        if from == to && self.catalogue.contains(from) {
            return Some(0.0);
        }
        if let Some(minutes) = self.baseline.get(&(from.clone(), to.clone())) {
            return Some(*minutes);
        }
        self.transit
            .samples(from, to)
            .values()
            .max_by_key(|s| s.updated_at)
            .map(|s| s.minutes)
    }

    /// Record a transit duration for the time bucket of `at`.
    ///
    /// Idempotent; a later `timestamp` wins on conflict. Returns whether the
    /// stored value changed.
    pub fn update(
        &self,
        from: &StopId,
        to: &StopId,
        at: NaiveDateTime,
        minutes: f64,
        timestamp: DateTime<Utc>,
    ) -> bool {
        self.transit.upsert(
            from,
            to,
            self.bucket(at),
            TransitSample {
                minutes,
                updated_at: timestamp,
            },
        )
    }

    /// Drop refined samples for buckets before the one containing `cutoff`.
    ///
    /// Baselines and geo distances are untouched. Returns the number of
    /// samples removed.
    pub fn evict_before(&self, cutoff: NaiveDateTime) -> usize {
        let removed = self.transit.evict_before(self.bucket(cutoff));
        if removed > 0 {
            debug!(removed, %cutoff, "Evicted past transit samples");
        }
        removed
    }

    /// Number of refined transit samples stored.
    pub fn transit_sample_count(&self) -> usize {
        self.transit.len()
    }
}
