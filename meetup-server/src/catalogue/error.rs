//! Catalogue loading error types.

use crate::domain::{InvalidCoordinates, InvalidStopId, StopId, UnknownStop};

/// Errors that can occur when loading the stop catalogue or static distances.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse input JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stop id failed validation
    #[error(transparent)]
    InvalidStopId(#[from] InvalidStopId),

    /// A stop has out-of-range coordinates
    #[error(transparent)]
    InvalidCoordinates(#[from] InvalidCoordinates),

    /// The same stop id appears twice
    #[error("duplicate stop id: {0}")]
    DuplicateStop(StopId),

    /// A distance row references a stop that is not in the catalogue
    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),

    /// A distance row carries a negative or non-finite value
    #[error("invalid distance for {from} -> {to}: {value}")]
    InvalidDistance { from: StopId, to: StopId, value: f64 },
}
