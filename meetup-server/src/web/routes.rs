//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Local, NaiveDateTime};
use tracing::warn;

use crate::domain::{
    DEFAULT_MEETUP_HOUR, DEFAULT_MEETUP_WEEKDAY, InvalidStopId, MeetingTimeError, StopId,
    next_meetup_time, parse_meeting_time, validate_meeting_time,
};
use crate::oracle::TransitOracle;
use crate::planner::{MeetingQuery, PlannerError};

use super::dto::*;
use super::state::AppState;

/// Default and maximum stop search results.
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

/// Upper bound on each requested candidate or result limit.
const MAX_QUERY_LIMIT: usize = 100;

/// Create the application router.
pub fn create_router<O: TransitOracle + 'static>(state: AppState<O>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stops", get(search_stops::<O>))
        .route("/api/meeting-points", post(meeting_points::<O>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search stops by name or id.
async fn search_stops<O: TransitOracle + 'static>(
    State(state): State<AppState<O>>,
    Query(req): Query<StopSearchRequest>,
) -> Json<StopSearchResponse> {
    let limit = req
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);
    let stops = state
        .planner
        .catalogue()
        .search(&req.q, limit)
        .into_iter()
        .map(StopResult::from_stop)
        .collect();

    Json(StopSearchResponse { stops })
}

/// Work out the meeting time from optional date and time fields.
///
/// A missing date means today; a missing time means the default hour. With
/// neither, the meeting is the next default meetup slot.
fn resolve_meeting_time(
    date: Option<&str>,
    time: Option<&str>,
    now: NaiveDateTime,
    horizon_days: i64,
) -> Result<NaiveDateTime, MeetingTimeError> {
    let at = match (date, time) {
        (None, None) => next_meetup_time(now, DEFAULT_MEETUP_WEEKDAY, DEFAULT_MEETUP_HOUR),
        (date, time) => {
            let today = now.format("%d/%m/%Y").to_string();
            let default_time = format!("{DEFAULT_MEETUP_HOUR:02}:00");
            parse_meeting_time(
                date.unwrap_or(&today),
                time.unwrap_or(&default_time),
            )?
        }
    };
    validate_meeting_time(at, now, Duration::days(horizon_days))?;
    Ok(at)
}

/// Build a planner query from a request, capping the requested limits.
fn meeting_query(
    req: &MeetingPointsRequest,
    sources: Vec<StopId>,
    at: NaiveDateTime,
) -> MeetingQuery {
    let mut query = MeetingQuery::new(sources, req.objective, at);
    if let Some(n) = req.top_n_geo {
        query = query.with_top_n_geo(n.min(MAX_QUERY_LIMIT));
    }
    if let Some(n) = req.top_n_time {
        query = query.with_top_n_time(n.min(MAX_QUERY_LIMIT));
    }
    if let Some(m) = req.top_m_final {
        query = query.with_top_m_final(m.min(MAX_QUERY_LIMIT));
    }
    query
}

/// Find meeting points for a group.
async fn meeting_points<O: TransitOracle + 'static>(
    State(state): State<AppState<O>>,
    Json(req): Json<MeetingPointsRequest>,
) -> Result<Json<MeetingPointsResponse>, AppError> {
    let sources = req
        .stops
        .iter()
        .map(|s| StopId::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let now = Local::now().naive_local();
    let at = resolve_meeting_time(
        req.date.as_deref(),
        req.time.as_deref(),
        now,
        state.horizon_days,
    )?;

    let query = meeting_query(&req, sources, at);
    let outcome = state.planner.find_meeting_points(&query).await?;

    Ok(Json(MeetingPointsResponse::from_outcome(
        &outcome,
        &query.sources,
        query.objective,
        at,
    )))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl From<PlannerError> for AppError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::UnknownStop(_) | PlannerError::InvalidQuery(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            PlannerError::NoCandidates { .. } => AppError::NotFound {
                message: e.to_string(),
            },
        }
    }
}

impl From<MeetingTimeError> for AppError {
    fn from(e: MeetingTimeError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<InvalidStopId> for AppError {
    fn from(e: InvalidStopId) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "Request rejected");

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
