//! Stop catalogue.
//!
//! The catalogue is the fixed set of public-transit stops a meeting point can
//! be chosen from. It is loaded once at startup and never mutated.

mod error;
mod load;

use std::collections::BTreeMap;

use crate::domain::{Stop, StopId, UnknownStop};

pub use error::CatalogueError;
pub use load::{StaticDistanceRow, StopRecord, load_static_distances, read_static_distances};

/// Immutable, deterministically ordered set of stops.
///
/// Iteration is always in ascending `StopId` order, so every stage that
/// scans the catalogue sees the same sequence on every run.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    stops: BTreeMap<StopId, Stop>,
}

impl Catalogue {
    /// Build a catalogue, rejecting duplicate ids.
    pub fn from_stops(stops: impl IntoIterator<Item = Stop>) -> Result<Self, CatalogueError> {
        let mut map = BTreeMap::new();
        for stop in stops {
            let id = stop.id().clone();
            if map.insert(id.clone(), stop).is_some() {
                return Err(CatalogueError::DuplicateStop(id));
            }
        }
        Ok(Self { stops: map })
    }

    /// Look up a stop by id.
    pub fn get(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    /// Look up a stop, failing with `UnknownStop` if absent.
    pub fn require(&self, id: &StopId) -> Result<&Stop, UnknownStop> {
        self.stops.get(id).ok_or_else(|| UnknownStop(id.clone()))
    }

    pub fn contains(&self, id: &StopId) -> bool {
        self.stops.contains_key(id)
    }

    /// Iterate stops in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Case-insensitive substring search over stop names and ids.
    ///
    /// Prefix matches on the name come first, then other matches, each group
    /// in id order. At most `limit` stops are returned.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Stop> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.stops.values().take(limit).collect();
        }

        let mut prefix = Vec::new();
        let mut other = Vec::new();
        for stop in self.stops.values() {
            let name = stop.name().to_lowercase();
            if name.starts_with(&needle) {
                prefix.push(stop);
            } else if name.contains(&needle) || stop.id().as_str().to_lowercase().contains(&needle)
            {
                other.push(stop);
            }
        }

        prefix.into_iter().chain(other).take(limit).collect()
    }
}
