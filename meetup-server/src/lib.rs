//! Meeting point server.
//!
//! A web service that answers: "We are starting from these transit stops,
//! where should we meet?"
//!
//! Candidates are pre-selected cheaply from geographic and already-known
//! transit distances, then refined through a slow, unreliable routing
//! oracle, and finally ranked on authoritative travel times.

pub mod cache;
pub mod catalogue;
pub mod domain;
pub mod matrix;
pub mod oracle;
pub mod planner;
pub mod web;
