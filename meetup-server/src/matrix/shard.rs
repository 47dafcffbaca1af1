//! Partitioned storage for refined transit samples.
//!
//! Refinement workers write concurrently. Each ordered pair hashes to a
//! fixed shard, so writes to different pairs rarely contend and writes to
//! the same pair are serialised by that shard's lock.
//!
//! Each pair keeps at most a fixed number of buckets. Past the limit the
//! earliest bucket goes first, so the stored set is the latest buckets
//! whatever order the writes arrived in.

use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{PoisonError, RwLock};

use crate::domain::{StopId, TimeBucket};

use super::entry::TransitSample;

/// Number of lock shards.
pub(super) const SHARD_COUNT: usize = 16;

type PairKey = (StopId, StopId);
type Samples = BTreeMap<TimeBucket, TransitSample>;

pub(super) struct TransitShards {
    shards: Vec<RwLock<HashMap<PairKey, Samples>>>,
    max_buckets_per_pair: usize,
}

impl TransitShards {
    pub(super) fn new(max_buckets_per_pair: usize) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            max_buckets_per_pair: max_buckets_per_pair.max(1),
        }
    }

    fn shard_for(&self, from: &StopId, to: &StopId) -> &RwLock<HashMap<PairKey, Samples>> {
        let mut hasher = DefaultHasher::new();
        from.hash(&mut hasher);
        to.hash(&mut hasher);
        let idx = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    /// Clone all samples for a pair.
    pub(super) fn samples(&self, from: &StopId, to: &StopId) -> Samples {
        let shard = self
            .shard_for(from, to)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard
            .get(&(from.clone(), to.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Read the sample for one bucket.
    pub(super) fn sample(
        &self,
        from: &StopId,
        to: &StopId,
        bucket: TimeBucket,
    ) -> Option<TransitSample> {
        let shard = self
            .shard_for(from, to)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard
            .get(&(from.clone(), to.clone()))
            .and_then(|samples| samples.get(&bucket))
            .copied()
    }

    /// Upsert a sample. Later `updated_at` wins; on equal timestamps the
    /// smaller duration wins, so the outcome never depends on write order.
    /// Returns whether the write changed the stored samples.
    pub(super) fn upsert(
        &self,
        from: &StopId,
        to: &StopId,
        bucket: TimeBucket,
        sample: TransitSample,
    ) -> bool {
        let mut shard = self
            .shard_for(from, to)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let samples = shard.entry((from.clone(), to.clone())).or_default();
        match samples.get(&bucket) {
            Some(existing)
                if existing.updated_at > sample.updated_at
                    || (existing.updated_at == sample.updated_at
                        && existing.minutes <= sample.minutes) =>
            {
                false
            }
            _ => {
                samples.insert(bucket, sample);
                while samples.len() > self.max_buckets_per_pair {
                    samples.pop_first();
                }
                samples.contains_key(&bucket)
            }
        }
    }

    /// Drop every sample in a bucket earlier than `bucket`. Returns how many
    /// were removed.
    pub(super) fn evict_before(&self, bucket: TimeBucket) -> usize {
        let mut removed = 0usize;
        for shard in &self.shards {
            let mut shard = shard.write().unwrap_or_else(PoisonError::into_inner);
            shard.retain(|_, samples| {
                let kept = samples.split_off(&bucket);
                removed += samples.len();
                *samples = kept;
                !samples.is_empty()
            });
        }
        removed
    }

    /// Total number of stored samples.
    pub(super) fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .values()
                    .map(BTreeMap::len)
                    .sum::<usize>()
            })
            .sum()
    }
}
