//! Web layer for the meeting point finder.
//!
//! Provides JSON endpoints for stop search and meeting point queries.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
