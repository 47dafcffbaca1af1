//! Routing oracle error types.

use crate::domain::StopId;

/// Why a single transit query failed.
///
/// The refiner turns every one of these into an "unresolved pair" marker;
/// none of them is fatal to a meeting point query.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The query did not complete in time
    #[error("query timed out")]
    Timeout,

    /// The oracle is not reachable or not configured
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The oracle answered but found no connection
    #[error("no connection found from {from} to {to}")]
    NoConnection { from: StopId, to: StopId },

    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the oracle
    #[error("rate limited by routing oracle")]
    RateLimited,

    /// Invalid credentials or unauthorized
    #[error("unauthorized")]
    Unauthorized,

    /// Response body could not be parsed
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The oracle returned a negative or non-finite duration
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
}

impl OracleError {
    /// Whether repeating the same query later could succeed.
    ///
    /// Retrying is left to the caller; the refiner never retries within a
    /// single pass.
    pub fn retryable(&self) -> bool {
        match self {
            OracleError::Timeout
            | OracleError::Unavailable(_)
            | OracleError::Http(_)
            | OracleError::RateLimited => true,
            OracleError::Api { status, .. } => *status >= 500,
            OracleError::NoConnection { .. }
            | OracleError::Unauthorized
            | OracleError::Json { .. }
            | OracleError::InvalidDuration(_) => false,
        }
    }

    /// Short machine-readable label, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Timeout => "timeout",
            OracleError::Unavailable(_) => "unavailable",
            OracleError::NoConnection { .. } => "no_connection",
            OracleError::Http(_) => "http",
            OracleError::Api { .. } => "api",
            OracleError::RateLimited => "rate_limited",
            OracleError::Unauthorized => "unauthorized",
            OracleError::Json { .. } => "json",
            OracleError::InvalidDuration(_) => "invalid_duration",
        }
    }
}
