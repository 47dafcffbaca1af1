//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Objective, Stop, StopId};
use crate::planner::{MeetingOutcome, Provenance, RankedStop, RefinementReport};

/// Request to search stops by name.
#[derive(Debug, Deserialize)]
pub struct StopSearchRequest {
    /// Search query (name or id prefix)
    pub q: String,

    /// Max results (default 10, capped at 50)
    pub limit: Option<usize>,
}

/// A stop in API responses.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl StopResult {
    pub fn from_stop(stop: &Stop) -> Self {
        Self {
            id: stop.id().as_str().to_string(),
            name: stop.name().to_string(),
            lat: stop.lat(),
            lon: stop.lon(),
        }
    }
}

/// Response for stop search.
#[derive(Debug, Serialize)]
pub struct StopSearchResponse {
    pub stops: Vec<StopResult>,
}

/// Request for meeting points.
#[derive(Debug, Deserialize)]
pub struct MeetingPointsRequest {
    /// Stop ids where each person starts
    pub stops: Vec<String>,

    /// `minimax` or `minisum`
    pub objective: Objective,

    /// Meeting date in DD/MM/YYYY format
    pub date: Option<String>,

    /// Meeting time in HH:MM format
    pub time: Option<String>,

    pub top_n_geo: Option<usize>,
    pub top_n_time: Option<usize>,
    pub top_m_final: Option<usize>,
}

/// Travel time from one source to a meeting point.
#[derive(Debug, Serialize)]
pub struct SourceMinutes {
    pub from: String,
    pub minutes: f64,
}

/// A meeting point in the response.
#[derive(Debug, Serialize)]
pub struct MeetingPointResult {
    /// 1-based position in the ranking
    pub rank: usize,
    pub stop: StopResult,
    pub score: f64,
    pub worst_case_minutes: f64,
    pub total_minutes: f64,
    pub per_source: Vec<SourceMinutes>,
    /// Pairs estimated from geo distance rather than the routing service
    pub estimated_pairs: usize,
    pub provenance: Provenance,
}

impl MeetingPointResult {
    pub fn from_ranked(rank: usize, ranked: &RankedStop, sources: &[StopId]) -> Self {
        let per_source = sources
            .iter()
            .zip(&ranked.per_source_minutes)
            .map(|(from, minutes)| SourceMinutes {
                from: from.as_str().to_string(),
                minutes: *minutes,
            })
            .collect();

        Self {
            rank,
            stop: StopResult::from_stop(&ranked.stop),
            score: ranked.score,
            worst_case_minutes: ranked.worst_case_minutes,
            total_minutes: ranked.total_minutes,
            per_source,
            estimated_pairs: ranked.fallback_pairs,
            provenance: ranked.provenance,
        }
    }
}

/// Summary of the refinement pass.
#[derive(Debug, Serialize)]
pub struct RefinementSummary {
    pub attempted: usize,
    pub resolved: usize,
    pub already_known: usize,
    pub unresolved: usize,
    pub timed_out: usize,
    pub deadline_hit: bool,
}

impl From<&RefinementReport> for RefinementSummary {
    fn from(report: &RefinementReport) -> Self {
        Self {
            attempted: report.attempted,
            resolved: report.resolved,
            already_known: report.already_known,
            unresolved: report.unresolved.len(),
            timed_out: report.timed_out,
            deadline_hit: report.deadline_hit,
        }
    }
}

/// Response for meeting point search.
#[derive(Debug, Serialize)]
pub struct MeetingPointsResponse {
    /// Meeting time used, `YYYY-MM-DDTHH:MM`
    pub meeting_time: String,
    pub objective: Objective,
    pub results: Vec<MeetingPointResult>,
    pub pool_size: usize,
    pub refinement: RefinementSummary,
}

impl MeetingPointsResponse {
    pub fn from_outcome(
        outcome: &MeetingOutcome,
        sources: &[StopId],
        objective: Objective,
        meeting_time: chrono::NaiveDateTime,
    ) -> Self {
        let results = outcome
            .ranked
            .entries
            .iter()
            .enumerate()
            .map(|(i, ranked)| MeetingPointResult::from_ranked(i + 1, ranked, sources))
            .collect();

        Self {
            meeting_time: meeting_time.format("%Y-%m-%dT%H:%M").to_string(),
            objective,
            results,
            pool_size: outcome.pool_size,
            refinement: RefinementSummary::from(&outcome.refinement),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
