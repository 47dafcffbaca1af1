//! Meeting time handling: bucketing, defaults and validation.
//!
//! Transit durations depend on when you travel. Refined values are stored
//! per time bucket so that two queries for 20:00 and 20:03 share results
//! while a query for 07:30 does not.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Default bucket size in minutes.
pub const DEFAULT_BUCKET_MINS: u32 = 5;

/// Default meeting weekday when the caller does not supply a time.
pub const DEFAULT_MEETUP_WEEKDAY: Weekday = Weekday::Fri;

/// Default meeting hour when the caller does not supply a time.
pub const DEFAULT_MEETUP_HOUR: u32 = 20;

/// How far ahead a meeting may be scheduled.
pub const DEFAULT_HORIZON_DAYS: i64 = 90;

/// A scheduling time bucket.
///
/// Two datetimes are compatible for transit lookups iff they fall into the
/// same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket(i64);

impl TimeBucket {
    /// Bucket a datetime using buckets of `bucket_mins` minutes.
    ///
    /// A zero bucket size is treated as one minute.
    pub fn of(at: NaiveDateTime, bucket_mins: u32) -> Self {
        let width = i64::from(bucket_mins.max(1)) * 60;
        TimeBucket(at.and_utc().timestamp().div_euclid(width))
    }

    pub fn index(self) -> i64 {
        self.0
    }
}

/// Errors from meeting time parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeetingTimeError {
    #[error("invalid date or time format; expected DD/MM/YYYY and HH:MM")]
    Format,

    #[error("the meeting time must be in the future")]
    NotInFuture,

    #[error("the meeting time must not be more than {horizon_days} days ahead")]
    TooFarAhead { horizon_days: i64 },
}

/// Parse a `DD/MM/YYYY` date and `HH:MM` time.
pub fn parse_meeting_time(date: &str, time: &str) -> Result<NaiveDateTime, MeetingTimeError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y")
        .map_err(|_| MeetingTimeError::Format)?;
    let time =
        NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| MeetingTimeError::Format)?;
    Ok(date.and_time(time))
}

/// Check that a meeting time is after `now` and within `horizon` of it.
pub fn validate_meeting_time(
    at: NaiveDateTime,
    now: NaiveDateTime,
    horizon: Duration,
) -> Result<(), MeetingTimeError> {
    if at <= now {
        return Err(MeetingTimeError::NotInFuture);
    }
    if at > now + horizon {
        return Err(MeetingTimeError::TooFarAhead {
            horizon_days: horizon.num_days(),
        });
    }
    Ok(())
}

/// The next occurrence of `weekday` at `hour`:00.
///
/// If `now` is already on that weekday at or past the hour, the meeting
/// moves to the following week. Hours above 23 are clamped to 23.
pub fn next_meetup_time(now: NaiveDateTime, weekday: Weekday, hour: u32) -> NaiveDateTime {
    let hour = hour.min(23);
    let target_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let current = i64::from(now.weekday().num_days_from_monday());
    let target = i64::from(weekday.num_days_from_monday());
    let mut days_ahead = (target - current).rem_euclid(7);
    if days_ahead == 0 && now.time() >= target_time {
        days_ahead = 7;
    }

    (now.date() + Duration::days(days_ahead)).and_time(target_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn bucket_groups_nearby_times() {
        assert_eq!(
            TimeBucket::of(dt("2024-03-15 20:00"), 5),
            TimeBucket::of(dt("2024-03-15 20:04"), 5)
        );
        assert_ne!(
            TimeBucket::of(dt("2024-03-15 20:04"), 5),
            TimeBucket::of(dt("2024-03-15 20:05"), 5)
        );
    }

    #[test]
    fn bucket_distinguishes_days() {
        assert_ne!(
            TimeBucket::of(dt("2024-03-15 20:00"), 5),
            TimeBucket::of(dt("2024-03-16 20:00"), 5)
        );
    }

    #[test]
    fn zero_bucket_is_one_minute() {
        assert_eq!(
            TimeBucket::of(dt("2024-03-15 20:00"), 0),
            TimeBucket::of(dt("2024-03-15 20:00"), 1)
        );
    }

    #[test]
    fn parse_valid() {
        assert_eq!(
            parse_meeting_time("15/03/2024", "20:00").unwrap(),
            dt("2024-03-15 20:00")
        );
    }

    #[test]
    fn parse_invalid() {
        assert_eq!(
            parse_meeting_time("2024-03-15", "20:00"),
            Err(MeetingTimeError::Format)
        );
        assert_eq!(
            parse_meeting_time("15/03/2024", "8pm"),
            Err(MeetingTimeError::Format)
        );
    }

    #[test]
    fn validate_rejects_past_and_far_future() {
        let now = dt("2024-03-15 12:00");
        let horizon = Duration::days(DEFAULT_HORIZON_DAYS);

        assert_eq!(
            validate_meeting_time(now, now, horizon),
            Err(MeetingTimeError::NotInFuture)
        );
        assert_eq!(
            validate_meeting_time(now + Duration::days(91), now, horizon),
            Err(MeetingTimeError::TooFarAhead { horizon_days: 90 })
        );
        assert!(validate_meeting_time(now + Duration::hours(1), now, horizon).is_ok());
    }

    #[test]
    fn next_meetup_later_same_week() {
        // 2024-03-13 is a Wednesday
        let next = next_meetup_time(dt("2024-03-13 09:00"), Weekday::Fri, 20);
        assert_eq!(next, dt("2024-03-15 20:00"));
    }

    #[test]
    fn next_meetup_same_day_before_hour() {
        let next = next_meetup_time(dt("2024-03-15 19:59"), Weekday::Fri, 20);
        assert_eq!(next, dt("2024-03-15 20:00"));
    }

    #[test]
    fn next_meetup_same_day_after_hour_rolls_to_next_week() {
        let next = next_meetup_time(dt("2024-03-15 20:00"), Weekday::Fri, 20);
        assert_eq!(next, dt("2024-03-22 20:00"));
    }

    #[test]
    fn next_meetup_wraps_week() {
        // Saturday -> next Friday
        let next = next_meetup_time(dt("2024-03-16 10:00"), Weekday::Fri, 20);
        assert_eq!(next, dt("2024-03-22 20:00"));
    }
}
