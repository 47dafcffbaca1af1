//! Domain types for the meeting point finder.
//!
//! This module contains the core domain model types. All types enforce
//! their invariants at construction time, so code that receives these
//! types can trust their validity.

mod error;
mod meeting_time;
mod objective;
mod stop;

pub use error::UnknownStop;
pub use meeting_time::{
    DEFAULT_BUCKET_MINS, DEFAULT_HORIZON_DAYS, DEFAULT_MEETUP_HOUR, DEFAULT_MEETUP_WEEKDAY,
    MeetingTimeError, TimeBucket, next_meetup_time, parse_meeting_time, validate_meeting_time,
};
pub use objective::{Objective, UnknownObjective};
pub use stop::{InvalidCoordinates, InvalidStopId, Stop, StopId};
