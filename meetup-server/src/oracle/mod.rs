//! Routing oracle: the authoritative, expensive source of transit durations.
//!
//! Key characteristics of the oracle:
//! - Answers are **directional** and **time-dependent** (A→B at 20:00 may
//!   differ from B→A, or from A→B at 07:30)
//! - Calls are slow, rate-limited and may fail; callers must never assume
//!   success or a particular latency
//! - The planner only talks to it through [`TransitOracle`], so tests can
//!   swap in [`MockOracle`]

mod client;
mod error;
mod mock;

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::Stop;

pub use client::{HttpOracle, HttpOracleConfig};
pub use error::OracleError;
pub use mock::{MockOracle, OfflineOracle};

/// Source of authoritative transit durations.
pub trait TransitOracle: Send + Sync {
    /// Travel time in minutes from `from` to `to` for a meeting at `at`.
    ///
    /// May be invoked concurrently.
    fn query_transit(
        &self,
        from: &Stop,
        to: &Stop,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<f64, OracleError>> + Send;
}

impl<O: TransitOracle> TransitOracle for Arc<O> {
    fn query_transit(
        &self,
        from: &Stop,
        to: &Stop,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<f64, OracleError>> + Send {
        (**self).query_transit(from, to, at)
    }
}
