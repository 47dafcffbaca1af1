//! Final ranking of refined candidates.
//!
//! Scores each candidate with the objective over its transit durations from
//! every source, using only authoritative values for the query's time
//! bucket. Candidates with unresolved pairs are handled by the configured
//! [`UnresolvedPolicy`].

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{Objective, Stop, StopId};
use crate::matrix::DistanceMatrix;

use super::config::UnresolvedPolicy;
use super::filter::{Candidate, Provenance};
use super::search::PlannerError;

/// A scored meeting point.
#[derive(Debug, Clone)]
pub struct RankedStop {
    pub stop: Stop,
    /// Objective value over `per_source_minutes`.
    pub score: f64,
    pub geo_score: f64,
    /// Minutes from each source, in query order.
    pub per_source_minutes: Vec<f64>,
    pub worst_case_minutes: f64,
    pub total_minutes: f64,
    /// Pairs scored from geo distance instead of the oracle.
    pub fallback_pairs: usize,
    pub provenance: Provenance,
}

impl RankedStop {
    pub fn id(&self) -> &StopId {
        self.stop.id()
    }
}

/// Ranked meeting points, best first.
#[derive(Debug, Clone, Default)]
pub struct RankedResult {
    pub entries: Vec<RankedStop>,
    /// Candidates dropped for unresolved pairs.
    pub excluded: usize,
}

impl RankedResult {
    pub fn best(&self) -> Option<&RankedStop> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order by score, then geo score, then stop id.
fn compare(a: &RankedStop, b: &RankedStop) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.geo_score.total_cmp(&b.geo_score))
        .then_with(|| a.id().cmp(b.id()))
}

/// Score one candidate, or `None` if the policy drops it.
fn score_candidate(
    matrix: &DistanceMatrix,
    candidate: &Candidate,
    sources: &[StopId],
    objective: Objective,
    at: NaiveDateTime,
    policy: UnresolvedPolicy,
) -> Result<Option<RankedStop>, PlannerError> {
    let mut minutes = Vec::with_capacity(sources.len());
    let mut unresolved = 0usize;

    for source in sources {
        match matrix.transit_distance(source, candidate.id(), at) {
            Some(m) => minutes.push(m),
            None => {
                unresolved += 1;
                if let UnresolvedPolicy::GeoFallback { penalty, .. } = policy {
                    minutes.push(matrix.geo_distance(source, candidate.id())? * penalty);
                }
            }
        }
    }

    if policy.excludes(unresolved, sources.len()) {
        debug!(
            candidate = %candidate.id(),
            unresolved,
            "Dropping candidate with unresolved pairs"
        );
        return Ok(None);
    }

    let Some(score) = objective.aggregate(minutes.iter().copied()) else {
        return Ok(None);
    };

    Ok(Some(RankedStop {
        stop: candidate.stop.clone(),
        score,
        geo_score: candidate.geo_score,
        worst_case_minutes: Objective::Minimax
            .aggregate(minutes.iter().copied())
            .unwrap_or(score),
        total_minutes: Objective::Minisum
            .aggregate(minutes.iter().copied())
            .unwrap_or(score),
        per_source_minutes: minutes,
        fallback_pairs: unresolved,
        provenance: candidate.provenance,
    }))
}

/// Rank candidates by the objective over transit durations for `at`.
///
/// Returns at most `top_m` entries. Fails with `NoCandidates` when every
/// candidate was dropped (or there were none to begin with).
pub fn rank_candidates(
    matrix: &DistanceMatrix,
    candidates: &[Candidate],
    sources: &[StopId],
    objective: Objective,
    at: NaiveDateTime,
    policy: UnresolvedPolicy,
    top_m: usize,
) -> Result<RankedResult, PlannerError> {
    if candidates.is_empty() {
        return Err(PlannerError::NoCandidates {
            reason: "candidate pool is empty".to_string(),
        });
    }

    let mut entries = Vec::with_capacity(candidates.len());
    let mut excluded = 0usize;
    for candidate in candidates {
        match score_candidate(matrix, candidate, sources, objective, at, policy)? {
            Some(ranked) => entries.push(ranked),
            None => excluded += 1,
        }
    }

    if entries.is_empty() {
        return Err(PlannerError::NoCandidates {
            reason: format!(
                "all {} candidates have unresolved transit durations",
                candidates.len()
            ),
        });
    }

    entries.sort_by(compare);
    entries.truncate(top_m);

    Ok(RankedResult { entries, excluded })
}
