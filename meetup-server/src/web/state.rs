//! Application state for the web layer.

use std::sync::Arc;

use crate::domain::DEFAULT_HORIZON_DAYS;
use crate::planner::MeetingPlanner;

/// Shared application state.
///
/// Generic over the oracle so tests can serve a planner backed by a mock.
pub struct AppState<O> {
    /// Meeting point planner, including the shared distance matrix
    pub planner: Arc<MeetingPlanner<O>>,

    /// How many days ahead a meeting may be scheduled
    pub horizon_days: i64,
}

impl<O> AppState<O> {
    /// Create a new app state.
    pub fn new(planner: MeetingPlanner<O>) -> Self {
        Self {
            planner: Arc::new(planner),
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    pub fn with_horizon_days(mut self, days: i64) -> Self {
        self.horizon_days = days;
        self
    }
}

impl<O> Clone for AppState<O> {
    fn clone(&self) -> Self {
        Self {
            planner: Arc::clone(&self.planner),
            horizon_days: self.horizon_days,
        }
    }
}
