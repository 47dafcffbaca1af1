//! Meeting point search.
//!
//! Runs the three pipeline stages for one query:
//! filter candidates from what the matrix already knows, refine the
//! candidate pairs through the oracle, then rank on authoritative transit
//! durations. The matrix outlives queries, so refined durations are reused.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::catalogue::Catalogue;
use crate::domain::{Objective, Stop, StopId, UnknownStop};
use crate::matrix::DistanceMatrix;
use crate::oracle::TransitOracle;

use super::config::PlannerConfig;
use super::filter::CandidateFilter;
use super::rank::{RankedResult, rank_candidates};
use super::refine::{DistanceRefiner, RefinementReport};

/// Default size of the geo pre-selection.
pub const DEFAULT_TOP_N_GEO: usize = 10;

/// Default size of the known-transit pre-selection.
pub const DEFAULT_TOP_N_TIME: usize = 25;

/// Default number of ranked results.
pub const DEFAULT_TOP_M_FINAL: usize = 15;

/// Error from meeting point search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    /// A source stop is not in the catalogue
    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),

    /// Malformed query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Nothing left to rank
    #[error("no meeting point found: {reason}")]
    NoCandidates { reason: String },
}

/// A request for meeting points.
#[derive(Debug, Clone)]
pub struct MeetingQuery {
    /// Where each person starts, in a fixed order.
    pub sources: Vec<StopId>,

    pub objective: Objective,

    /// When the group wants to meet.
    pub at: NaiveDateTime,

    pub top_n_geo: usize,
    pub top_n_time: usize,
    pub top_m_final: usize,
}

impl MeetingQuery {
    /// Create a query with default pool and result sizes.
    pub fn new(sources: Vec<StopId>, objective: Objective, at: NaiveDateTime) -> Self {
        Self {
            sources,
            objective,
            at,
            top_n_geo: DEFAULT_TOP_N_GEO,
            top_n_time: DEFAULT_TOP_N_TIME,
            top_m_final: DEFAULT_TOP_M_FINAL,
        }
    }

    pub fn with_top_n_geo(mut self, n: usize) -> Self {
        self.top_n_geo = n;
        self
    }

    pub fn with_top_n_time(mut self, n: usize) -> Self {
        self.top_n_time = n;
        self
    }

    pub fn with_top_m_final(mut self, m: usize) -> Self {
        self.top_m_final = m;
        self
    }

    /// Validate the query shape.
    ///
    /// Stop existence is checked separately against the catalogue.
    pub fn validate(&self, max_sources: usize) -> Result<(), PlannerError> {
        if self.sources.len() < 2 {
            return Err(PlannerError::InvalidQuery(
                "at least two source stops are required".to_string(),
            ));
        }

        if self.sources.len() > max_sources {
            return Err(PlannerError::InvalidQuery(format!(
                "at most {max_sources} source stops are supported"
            )));
        }

        let mut seen = HashSet::new();
        for id in &self.sources {
            if !seen.insert(id) {
                return Err(PlannerError::InvalidQuery(format!(
                    "source stop {id} appears more than once"
                )));
            }
        }

        if self.top_m_final == 0 {
            return Err(PlannerError::InvalidQuery(
                "top_m_final must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Result of meeting point search.
#[derive(Debug, Clone)]
pub struct MeetingOutcome {
    /// Meeting points, best first.
    pub ranked: RankedResult,

    /// Number of candidates that went into refinement.
    pub pool_size: usize,

    pub refinement: RefinementReport,
}

/// Meeting point planner.
///
/// Holds the shared distance matrix and the oracle used to refine it.
/// Queries may run concurrently.
pub struct MeetingPlanner<O> {
    matrix: Arc<DistanceMatrix>,
    oracle: O,
    config: PlannerConfig,
}

impl<O: TransitOracle> MeetingPlanner<O> {
    pub fn new(matrix: Arc<DistanceMatrix>, oracle: O, config: PlannerConfig) -> Self {
        Self {
            matrix,
            oracle,
            config,
        }
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn catalogue(&self) -> &Catalogue {
        self.matrix.catalogue()
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Find the best meeting points for a group.
    pub async fn find_meeting_points(
        &self,
        query: &MeetingQuery,
    ) -> Result<MeetingOutcome, PlannerError> {
        query.validate(self.config.max_sources)?;

        let sources: Vec<Stop> = query
            .sources
            .iter()
            .map(|id| self.catalogue().require(id).cloned())
            .collect::<Result<_, _>>()?;

        let pool = CandidateFilter::new(&self.matrix)
            .with_allow_sources(self.config.allow_source_candidates)
            .select(
                &query.sources,
                query.objective,
                query.top_n_geo,
                query.top_n_time,
            )?;
        debug!(
            sources = query.sources.len(),
            pool = pool.len(),
            objective = %query.objective,
            "Selected candidates"
        );

        if pool.is_empty() {
            return Err(PlannerError::NoCandidates {
                reason: "no stops to consider besides the sources".to_string(),
            });
        }

        let refinement = DistanceRefiner::new(&self.matrix, &self.oracle, &self.config)
            .refine(pool.candidates(), &sources, query.at)
            .await;

        let ranked = rank_candidates(
            &self.matrix,
            pool.candidates(),
            &query.sources,
            query.objective,
            query.at,
            self.config.unresolved_policy,
            query.top_m_final,
        )?;

        info!(
            results = ranked.len(),
            excluded = ranked.excluded,
            best = ranked.best().map(|r| r.id().as_str()).unwrap_or(""),
            "Meeting point search complete"
        );

        Ok(MeetingOutcome {
            ranked,
            pool_size: pool.len(),
            refinement,
        })
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
