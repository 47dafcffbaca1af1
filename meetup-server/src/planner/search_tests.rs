//! End-to-end tests for the filter, refine and rank pipeline.

use super::*;
use crate::matrix::GeoMetric;
use crate::oracle::MockOracle;
use crate::planner::config::UnresolvedPolicy;
use crate::planner::Provenance;
use std::time::Duration;

fn id(s: &str) -> StopId {
    StopId::parse(s).unwrap()
}

fn ids(names: &[&str]) -> Vec<StopId> {
    names.iter().map(|n| id(n)).collect()
}

fn at() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

/// Five stops on a plane: A and B are the sources, D sits between them,
/// C is close, E is far away.
fn plane() -> DistanceMatrix {
    let stops = [
        ("A", 0.0, 0.0),
        ("B", 0.0, 1.0),
        ("C", 1.0, 0.0),
        ("D", 0.5, 0.5),
        ("E", 10.0, 10.0),
    ]
    .into_iter()
    .map(|(name, lat, lon)| Stop::new(id(name), name, lat, lon).unwrap());
    let catalogue = Catalogue::from_stops(stops).unwrap();
    DistanceMatrix::new(Arc::new(catalogue), GeoMetric::Euclidean)
}

fn matrix() -> Arc<DistanceMatrix> {
    Arc::new(plane())
}

/// Oracle whose transit times are ten minutes per unit of distance.
fn proportional_oracle() -> MockOracle {
    MockOracle::new().with_geo_fallback(GeoMetric::Euclidean, 10.0)
}

fn planner(oracle: MockOracle, config: PlannerConfig) -> MeetingPlanner<MockOracle> {
    MeetingPlanner::new(matrix(), oracle, config)
}

fn query(sources: &[&str], objective: Objective) -> MeetingQuery {
    MeetingQuery::new(ids(sources), objective, at())
}

fn ranked_ids(outcome: &MeetingOutcome) -> Vec<String> {
    outcome
        .ranked
        .entries
        .iter()
        .map(|r| r.id().as_str().to_string())
        .collect()
}

// ============================================================================
// Ranking
// ============================================================================

#[tokio::test]
async fn minisum_ranks_midpoint_first() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    assert_eq!(ranked_ids(&outcome), vec!["D", "C", "E"]);
    assert_eq!(outcome.pool_size, 3);
    assert!(outcome.refinement.is_complete());

    let d = outcome.ranked.best().unwrap();
    assert_eq!(d.fallback_pairs, 0);
    assert!((d.score - 20.0 * 0.5f64.hypot(0.5)).abs() < 1e-9);
}

#[tokio::test]
async fn geo_pool_is_limited_by_top_n_geo() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum).with_top_n_geo(2))
        .await
        .unwrap();

    assert_eq!(outcome.pool_size, 2);
    assert_eq!(ranked_ids(&outcome), vec!["D", "C"]);
}

#[test]
fn three_geo_candidates_ordered_by_summed_distance() {
    let m = plane();
    let pool = CandidateFilter::new(&m)
        .select(&ids(&["A", "B"]), Objective::Minisum, 3, 0)
        .unwrap();

    let pool_ids: Vec<&str> = pool.candidates().iter().map(|c| c.id().as_str()).collect();
    assert_eq!(pool_ids, vec!["D", "C", "E"]);
    assert!(pool.candidates().iter().all(|c| c.provenance == Provenance::Geo));
}

#[tokio::test]
async fn sources_never_appear_in_results() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let outcome = planner
        .find_meeting_points(&query(&["A", "B", "C"], Objective::Minimax))
        .await
        .unwrap();

    for source in ["A", "B", "C"] {
        assert!(!ranked_ids(&outcome).contains(&source.to_string()));
    }
    assert_eq!(ranked_ids(&outcome), vec!["D", "E"]);
}

#[tokio::test]
async fn source_candidates_when_allowed() {
    let config = PlannerConfig::default().with_allow_source_candidates(true);
    let planner = planner(proportional_oracle(), config);
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    // A and B are each one unit apart: sum 10, below D's 14.1
    assert_eq!(ranked_ids(&outcome)[..2], ["A", "B"]);
}

#[tokio::test]
async fn objective_changes_the_winner() {
    // C is quick for A and slow for B; D is moderate for both
    let oracle = MockOracle::new()
        .with_duration(&id("A"), &id("C"), 5.0)
        .with_duration(&id("B"), &id("C"), 40.0)
        .with_duration(&id("A"), &id("D"), 25.0)
        .with_duration(&id("B"), &id("D"), 25.0)
        .with_geo_fallback(GeoMetric::Euclidean, 100.0);
    let planner = planner(oracle, PlannerConfig::default());

    let minimax = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minimax))
        .await
        .unwrap();
    assert_eq!(ranked_ids(&minimax)[0], "D");

    let minisum = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();
    assert_eq!(ranked_ids(&minisum)[0], "C");
}

#[tokio::test]
async fn results_truncate_to_top_m_final() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum).with_top_m_final(1))
        .await
        .unwrap();

    assert_eq!(ranked_ids(&outcome), vec!["D"]);
}

// ============================================================================
// Refinement reuse
// ============================================================================

#[tokio::test]
async fn repeated_query_makes_no_oracle_calls() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let q = query(&["A", "B"], Objective::Minisum);

    let first = planner.find_meeting_points(&q).await.unwrap();
    assert_eq!(planner.oracle().call_count(), 6);

    planner.oracle().reset_calls();
    let second = planner.find_meeting_points(&q).await.unwrap();

    assert_eq!(planner.oracle().call_count(), 0);
    assert_eq!(second.refinement.already_known, 6);
    assert_eq!(ranked_ids(&first), ranked_ids(&second));
}

#[tokio::test]
async fn refined_durations_feed_time_preselection() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    // With no geo pre-selection, candidates come from known transit times
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum).with_top_n_geo(0))
        .await
        .unwrap();
    assert_eq!(outcome.pool_size, 3);
    assert_eq!(ranked_ids(&outcome), vec!["D", "C", "E"]);
}

#[tokio::test]
async fn refined_samples_stay_bounded_across_meeting_times() {
    let matrix = Arc::new(plane().with_max_buckets_per_pair(4));
    let planner = MeetingPlanner::new(
        Arc::clone(&matrix),
        proportional_oracle(),
        PlannerConfig::default(),
    );

    for step in 0..20 {
        let at = at() + chrono::Duration::minutes(5 * step);
        planner
            .find_meeting_points(&MeetingQuery::new(ids(&["A", "B"]), Objective::Minisum, at))
            .await
            .unwrap();
    }

    // Three candidates from two sources, four buckets each
    assert_eq!(matrix.transit_sample_count(), 6 * 4);

    // Everything before the last meeting time can be swept
    let last = at() + chrono::Duration::minutes(5 * 19);
    assert_eq!(matrix.evict_before(last), 6 * 3);
    assert_eq!(matrix.transit_sample_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn ranking_is_independent_of_completion_order() {
    let slow_first = MockOracle::new()
        .with_geo_fallback(GeoMetric::Euclidean, 10.0)
        .with_pair_latency(&id("A"), &id("D"), Duration::from_secs(3))
        .with_pair_latency(&id("B"), &id("C"), Duration::from_secs(2));
    let sequential = planner(proportional_oracle(), PlannerConfig::default().with_workers(1));
    let parallel = planner(slow_first, PlannerConfig::default().with_workers(8));

    let q = query(&["A", "B"], Objective::Minimax);
    let a = sequential.find_meeting_points(&q).await.unwrap();
    let b = parallel.find_meeting_points(&q).await.unwrap();

    assert_eq!(ranked_ids(&a), ranked_ids(&b));
    let scores = |o: &MeetingOutcome| o.ranked.entries.iter().map(|r| r.score).collect::<Vec<_>>();
    assert_eq!(scores(&a), scores(&b));
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn oracle_outage_with_exclude_policy_finds_nothing() {
    let planner = planner(MockOracle::new().failing_all(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap_err();

    assert!(matches!(err, PlannerError::NoCandidates { .. }));
}

#[tokio::test]
async fn oracle_outage_with_fallback_ranks_by_geo() {
    let config =
        PlannerConfig::default().with_unresolved_policy(UnresolvedPolicy::geo_fallback(4.0));
    let planner = planner(MockOracle::new().failing_all(), config);
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    assert_eq!(ranked_ids(&outcome), vec!["D", "C", "E"]);
    assert_eq!(outcome.refinement.unresolved.len(), 6);
    assert!(outcome.ranked.entries.iter().all(|r| r.fallback_pairs == 2));
}

#[tokio::test(start_paused = true)]
async fn timed_out_pair_with_exclude_policy_drops_candidate() {
    let oracle = proportional_oracle().with_pair_latency(&id("B"), &id("D"), Duration::from_secs(60));
    let config = PlannerConfig::default().with_query_timeout_secs(5);
    let planner = planner(oracle, config);

    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    assert_eq!(outcome.refinement.timed_out, 1);
    assert_eq!(ranked_ids(&outcome), vec!["C", "E"]);
    assert_eq!(outcome.ranked.excluded, 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_pair_with_fallback_keeps_candidate() {
    let oracle = proportional_oracle().with_pair_latency(&id("B"), &id("D"), Duration::from_secs(60));
    let config = PlannerConfig::default()
        .with_query_timeout_secs(5)
        .with_unresolved_policy(UnresolvedPolicy::geo_fallback(4.0));
    let planner = planner(oracle, config);

    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    assert_eq!(ranked_ids(&outcome), vec!["D", "C", "E"]);
    let d = outcome.ranked.best().unwrap();
    assert_eq!(d.fallback_pairs, 1);
    let half_diagonal = 0.5f64.hypot(0.5);
    assert!((d.score - (10.0 * half_diagonal + 4.0 * half_diagonal)).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn batch_deadline_bounds_query_time() {
    let oracle = proportional_oracle().with_latency(Duration::from_secs(10));
    let config = PlannerConfig::default()
        .with_workers(2)
        .with_batch_deadline_secs(15)
        .with_unresolved_policy(UnresolvedPolicy::geo_fallback(4.0));
    let planner = planner(oracle, config);

    let started = tokio::time::Instant::now();
    let outcome = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minisum))
        .await
        .unwrap();

    assert!(started.elapsed() <= Duration::from_secs(16));
    assert!(outcome.refinement.deadline_hit);
    assert_eq!(outcome.refinement.resolved, 2);
    assert_eq!(ranked_ids(&outcome).len(), 3);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn single_source_is_invalid() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(&query(&["A"], Objective::Minimax))
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::InvalidQuery(_)));
}

#[tokio::test]
async fn duplicate_sources_are_invalid() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(&query(&["A", "B", "A"], Objective::Minimax))
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::InvalidQuery(_)));
}

#[tokio::test]
async fn too_many_sources_are_invalid() {
    let planner = planner(
        proportional_oracle(),
        PlannerConfig::default().with_max_sources(2),
    );
    let err = planner
        .find_meeting_points(&query(&["A", "B", "C"], Objective::Minimax))
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::InvalidQuery(_)));
}

#[tokio::test]
async fn zero_results_requested_is_invalid() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(&query(&["A", "B"], Objective::Minimax).with_top_m_final(0))
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::InvalidQuery(_)));
}

#[tokio::test]
async fn unknown_source_fails_before_any_oracle_call() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(&query(&["A", "Z"], Objective::Minimax))
        .await
        .unwrap_err();

    assert_eq!(err, PlannerError::UnknownStop(UnknownStop(id("Z"))));
    assert_eq!(planner.oracle().call_count(), 0);
}

#[tokio::test]
async fn empty_pool_is_no_candidates() {
    let planner = planner(proportional_oracle(), PlannerConfig::default());
    let err = planner
        .find_meeting_points(
            &query(&["A", "B"], Objective::Minimax)
                .with_top_n_geo(0)
                .with_top_n_time(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::NoCandidates { .. }));
}

#[test]
fn query_defaults() {
    let q = query(&["A", "B"], Objective::Minimax);
    assert_eq!(q.top_n_geo, 10);
    assert_eq!(q.top_n_time, 25);
    assert_eq!(q.top_m_final, 15);
    assert!(q.validate(12).is_ok());
}
