//! Distance entry types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::TimeBucket;

/// One authoritative transit duration for a specific time bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitSample {
    /// Travel time in minutes.
    pub minutes: f64,
    /// When the value was obtained. Later timestamps win on conflict.
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of everything known about one ordered stop pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceEntry {
    /// Geographic distance; always present for catalogue stops.
    pub geo: f64,

    /// Time-agnostic transit estimate from static input, if any.
    pub baseline_minutes: Option<f64>,

    /// Refined transit durations keyed by time bucket.
    pub samples: BTreeMap<TimeBucket, TransitSample>,
}

impl DistanceEntry {
    /// Transit duration for a specific bucket.
    pub fn transit_at(&self, bucket: TimeBucket) -> Option<f64> {
        self.samples.get(&bucket).map(|s| s.minutes)
    }

    /// The most recently updated sample, across all buckets.
    pub fn latest(&self) -> Option<&TransitSample> {
        self.samples.values().max_by_key(|s| s.updated_at)
    }

    /// Timestamp of the most recent refinement, if any.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|s| s.updated_at)
    }
}
