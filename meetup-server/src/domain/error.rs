//! Domain error types.
//!
//! These errors represent references to data that does not exist in the
//! loaded catalogue. They are distinct from API/IO errors.

use super::StopId;

/// A referenced stop id is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stop: {0}")]
pub struct UnknownStop(pub StopId);
