//! Conversions between calendar dates and backend timestamps.

use chrono::{Local, NaiveDate, NaiveTime, TimeZone, Utc};

use super::validation::ValidationError;
use crate::backend::types::Time;

/// Local midnight of `date` as a backend timestamp.
///
/// Falls back to UTC midnight when local midnight does not exist (DST gap).
pub fn to_nanos(date: NaiveDate) -> Time {
  let midnight = date.and_time(NaiveTime::MIN);
  let instant = Local
    .from_local_datetime(&midnight)
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
  instant.timestamp_nanos_opt().unwrap_or_default()
}

/// Local calendar date of a backend timestamp
pub fn from_nanos(time: Time) -> NaiveDate {
  Local.timestamp_nanos(time).date_naive()
}

/// Current instant as a backend timestamp
pub fn now_nanos() -> Time {
  Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

pub fn today() -> NaiveDate {
  Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
  NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
    .map_err(|_| ValidationError::InvalidDate(text.trim().to_string()))
}

/// Parse an `HH:MM` clock time
pub fn parse_clock(text: &str) -> Result<NaiveTime, ValidationError> {
  NaiveTime::parse_from_str(text.trim(), "%H:%M")
    .map_err(|_| ValidationError::InvalidClock(text.trim().to_string()))
}

/// Short display form, e.g. `19 Oct 2026`
pub fn format_date(time: Time) -> String {
  from_nanos(time).format("%-d %b %Y").to_string()
}

/// Local date and clock time of an audit entry
pub fn format_timestamp(time: Time) -> String {
  Local.timestamp_nanos(time).format("%-d %b %Y %H:%M").to_string()
}

/// Display form of a date range; a single day collapses to one date
pub fn format_range(start: Time, end: Time) -> String {
  let (start, end) = (from_nanos(start), from_nanos(end));
  if start == end {
    start.format("%-d %b %Y").to_string()
  } else {
    format!("{} - {}", start.format("%-d %b %Y"), end.format("%-d %b %Y"))
  }
}

/// Inclusive number of calendar days covered by a request
pub fn days_between(start: Time, end: Time) -> i64 {
  (from_nanos(end) - from_nanos(start)).num_days() + 1
}
