//! Cheap candidate pre-selection.
//!
//! Scores every catalogue stop against the sources using only what the
//! matrix already knows, then keeps the best few by geo distance and by
//! known transit time. The union is what refinement spends oracle calls on.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{Objective, Stop, StopId, UnknownStop};
use crate::matrix::DistanceMatrix;

/// Which pre-selection produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Geo,
    Time,
    Both,
}

impl Provenance {
    fn merge(self, other: Provenance) -> Provenance {
        if self == other {
            self
        } else {
            Provenance::Both
        }
    }
}

/// A stop worth refining.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub stop: Stop,
    /// Objective applied to geo distances from every source.
    pub geo_score: f64,
    /// Objective applied to known transit times, when all are known.
    pub time_score: Option<f64>,
    pub provenance: Provenance,
}

impl Candidate {
    pub fn id(&self) -> &StopId {
        self.stop.id()
    }
}

/// Deduplicated candidates, ordered by geo score then id.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, id: &StopId) -> bool {
        self.candidates.iter().any(|c| c.id() == id)
    }
}

/// Total order on (score, id).
fn by_score(a: (f64, &StopId), b: (f64, &StopId)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

/// Selects the candidate pool for a query.
pub struct CandidateFilter<'a> {
    matrix: &'a DistanceMatrix,
    allow_sources: bool,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(matrix: &'a DistanceMatrix) -> Self {
        Self {
            matrix,
            allow_sources: false,
        }
    }

    /// Whether source stops themselves may be candidates.
    pub fn with_allow_sources(mut self, allow: bool) -> Self {
        self.allow_sources = allow;
        self
    }

    /// Union of the `top_n_geo` best stops by geo score and the
    /// `top_n_time` best by known transit score.
    ///
    /// Only stops with a known transit time from every source take part in
    /// the time ranking. Deterministic for identical matrix contents.
    pub fn select(
        &self,
        sources: &[StopId],
        objective: Objective,
        top_n_geo: usize,
        top_n_time: usize,
    ) -> Result<CandidatePool, UnknownStop> {
        let catalogue = self.matrix.catalogue();
        for source in sources {
            catalogue.require(source)?;
        }
        let source_set: HashSet<&StopId> = sources.iter().collect();

        let mut scored = Vec::new();
        for stop in catalogue.iter() {
            if !self.allow_sources && source_set.contains(stop.id()) {
                continue;
            }

            let mut geo = Vec::with_capacity(sources.len());
            for source in sources {
                geo.push(self.matrix.geo_distance(source, stop.id())?);
            }
            let Some(geo_score) = objective.aggregate(geo) else {
                continue;
            };

            let time_score = sources
                .iter()
                .map(|source| self.matrix.known_transit(source, stop.id()))
                .collect::<Option<Vec<_>>>()
                .and_then(|times| objective.aggregate(times));

            scored.push((stop, geo_score, time_score));
        }

        let mut by_geo: Vec<_> = scored.iter().collect();
        by_geo.sort_by(|a, b| by_score((a.1, a.0.id()), (b.1, b.0.id())));

        let mut by_time: Vec<_> = scored.iter().filter(|s| s.2.is_some()).collect();
        by_time.sort_by(|a, b| {
            let ta = a.2.unwrap_or(f64::INFINITY);
            let tb = b.2.unwrap_or(f64::INFINITY);
            ta.total_cmp(&tb)
                .then_with(|| by_score((a.1, a.0.id()), (b.1, b.0.id())))
        });

        let mut selected: BTreeMap<&StopId, Candidate> = BTreeMap::new();
        let tagged = by_geo
            .into_iter()
            .take(top_n_geo)
            .map(|s| (s, Provenance::Geo))
            .chain(
                by_time
                    .into_iter()
                    .take(top_n_time)
                    .map(|s| (s, Provenance::Time)),
            );
        for ((stop, geo_score, time_score), provenance) in tagged {
            selected
                .entry(stop.id())
                .and_modify(|c| c.provenance = c.provenance.merge(provenance))
                .or_insert_with(|| Candidate {
                    stop: (*stop).clone(),
                    geo_score: *geo_score,
                    time_score: *time_score,
                    provenance,
                });
        }

        let mut candidates: Vec<Candidate> = selected.into_values().collect();
        candidates.sort_by(|a, b| by_score((a.geo_score, a.id()), (b.geo_score, b.id())));

        Ok(CandidatePool { candidates })
    }
}
