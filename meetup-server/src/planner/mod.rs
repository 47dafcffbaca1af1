//! Meeting point planner.
//!
//! This module implements the candidate selection pipeline that answers:
//! "We are starting from these stops - where should we meet?"
//!
//! Three stages run per query:
//! 1. [`CandidateFilter`] picks a small pool using cheap, already-known
//!    distances
//! 2. [`DistanceRefiner`] asks the routing oracle for authoritative transit
//!    times on every (source, candidate) pair that lacks one
//! 3. [`rank_candidates`] scores the pool on those transit times

mod config;
mod filter;
mod rank;
mod refine;
mod search;

pub use config::{DEFAULT_GEO_PENALTY, PlannerConfig, UnresolvedPolicy};
pub use filter::{Candidate, CandidateFilter, CandidatePool, Provenance};
pub use rank::{RankedResult, RankedStop, rank_candidates};
pub use refine::{DistanceRefiner, RefinementReport};
pub use search::{
    DEFAULT_TOP_M_FINAL, DEFAULT_TOP_N_GEO, DEFAULT_TOP_N_TIME, MeetingOutcome, MeetingPlanner,
    MeetingQuery, PlannerError,
};
