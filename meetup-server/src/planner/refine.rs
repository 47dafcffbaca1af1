//! Transit refinement.
//!
//! For every (source, candidate) pair without an authoritative duration in
//! the query's time bucket, ask the oracle and record the answer in the
//! matrix. Queries run on a bounded number of concurrent workers, each with
//! its own timeout, and the batch as a whole has a deadline. Failures become
//! unresolved pairs; they never abort the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{NaiveDateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{Stop, StopId};
use crate::matrix::DistanceMatrix;
use crate::oracle::{OracleError, TransitOracle};

use super::config::PlannerConfig;
use super::filter::Candidate;

/// Outcome of one refinement pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefinementReport {
    /// Pairs that needed an oracle query.
    pub attempted: usize,
    /// Pairs the oracle answered within the deadline.
    pub resolved: usize,
    /// Pairs already known for this time bucket.
    pub already_known: usize,
    /// Queries that exceeded the per-query timeout.
    pub timed_out: usize,
    /// Failed queries by error kind.
    pub failures: BTreeMap<&'static str, usize>,
    /// Pairs never answered because the batch deadline passed.
    pub cut_by_deadline: usize,
    pub deadline_hit: bool,
    /// Ordered (source, candidate) pairs still without a duration.
    pub unresolved: BTreeSet<(StopId, StopId)>,
}

impl RefinementReport {
    /// Whether every pair has an authoritative duration.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

enum PairOutcome {
    Resolved,
    Failed(OracleError),
}

/// Fills in missing transit durations for a candidate pool.
pub struct DistanceRefiner<'a, O> {
    matrix: &'a DistanceMatrix,
    oracle: &'a O,
    config: &'a PlannerConfig,
}

impl<'a, O: TransitOracle> DistanceRefiner<'a, O> {
    pub fn new(matrix: &'a DistanceMatrix, oracle: &'a O, config: &'a PlannerConfig) -> Self {
        Self {
            matrix,
            oracle,
            config,
        }
    }

    /// Refine every (source, candidate) pair for a meeting at `at`.
    ///
    /// Pairs already present in the matrix for this time bucket are not
    /// queried again, so repeating a pass costs no oracle calls.
    pub async fn refine(
        &self,
        candidates: &[Candidate],
        sources: &[Stop],
        at: NaiveDateTime,
    ) -> RefinementReport {
        let mut report = RefinementReport::default();

        let mut pending: Vec<(&Stop, &Stop)> = Vec::new();
        for candidate in candidates {
            for source in sources {
                if self
                    .matrix
                    .transit_distance(source.id(), candidate.id(), at)
                    .is_some()
                {
                    report.already_known += 1;
                } else {
                    pending.push((source, &candidate.stop));
                }
            }
        }
        report.attempted = pending.len();

        if pending.is_empty() {
            debug!(
                already_known = report.already_known,
                "Nothing to refine"
            );
            return report;
        }

        let deadline = Instant::now() + self.config.batch_deadline();
        let mut queue = pending.iter().copied();
        let mut in_flight = FuturesUnordered::new();
        for (from, to) in queue.by_ref().take(self.config.workers.max(1)) {
            in_flight.push(self.query_pair(from, to, at));
        }

        let mut finished: HashSet<(&StopId, &StopId)> = HashSet::new();
        loop {
            match tokio::time::timeout_at(deadline, in_flight.next()).await {
                Ok(Some((from, to, outcome))) => {
                    finished.insert((from, to));
                    if let Some((next_from, next_to)) = queue.next() {
                        in_flight.push(self.query_pair(next_from, next_to, at));
                    }
                    match outcome {
                        PairOutcome::Resolved => report.resolved += 1,
                        PairOutcome::Failed(e) => {
                            debug!(
                                from = %from,
                                to = %to,
                                error = %e,
                                "Oracle query failed, leaving pair unresolved"
                            );
                            if matches!(e, OracleError::Timeout) {
                                report.timed_out += 1;
                            }
                            *report.failures.entry(e.kind()).or_default() += 1;
                            report.unresolved.insert((from.clone(), to.clone()));
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    report.deadline_hit = true;
                    break;
                }
            }
        }
        drop(in_flight);

        for (from, to) in &pending {
            if !finished.contains(&(from.id(), to.id())) {
                report.cut_by_deadline += 1;
                report
                    .unresolved
                    .insert((from.id().clone(), to.id().clone()));
            }
        }

        if report.deadline_hit {
            warn!(
                cut = report.cut_by_deadline,
                resolved = report.resolved,
                "Refinement deadline passed with queries outstanding"
            );
        }
        info!(
            attempted = report.attempted,
            resolved = report.resolved,
            already_known = report.already_known,
            unresolved = report.unresolved.len(),
            "Refinement complete"
        );

        report
    }

    /// One oracle query under the per-query timeout, recorded on success.
    async fn query_pair<'s>(
        &self,
        from: &'s Stop,
        to: &'s Stop,
        at: NaiveDateTime,
    ) -> (&'s StopId, &'s StopId, PairOutcome) {
        let answer = tokio::time::timeout(
            self.config.query_timeout(),
            self.oracle.query_transit(from, to, at),
        )
        .await;

        let outcome = match answer {
            Ok(Ok(minutes)) if minutes.is_finite() && minutes >= 0.0 => {
                self.matrix
                    .update(from.id(), to.id(), at, minutes, Utc::now());
                PairOutcome::Resolved
            }
            Ok(Ok(minutes)) => PairOutcome::Failed(OracleError::InvalidDuration(minutes)),
            Ok(Err(e)) => PairOutcome::Failed(e),
            Err(_) => PairOutcome::Failed(OracleError::Timeout),
        };
        (from.id(), to.id(), outcome)
    }
}
