//! Client-side form validation, run before any remote call.

use chrono::NaiveDate;
use thiserror::Error;

use super::hours::hours_worked;
use super::time::{now_nanos, parse_clock, parse_date, to_nanos};
use crate::backend::types::{ActivityKind, AttendanceRecord, AttendanceStatus, Time};

/// Earliest date the backend accepts for attendance and requests
pub fn min_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("End date must be on or after the start date")]
  EndBeforeStart,

  #[error("The date must be on or after 1 January 2025")]
  BeforeMinimum,

  #[error("Describe the activity you worked on")]
  ActivityRequired,

  #[error("Invalid date '{0}', expected YYYY-MM-DD")]
  InvalidDate(String),

  #[error("Invalid time '{0}', expected HH:MM")]
  InvalidClock(String),

  #[error("Invalid number '{0}'")]
  InvalidNumber(String),
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
  let value = value.trim();
  if value.is_empty() {
    Err(ValidationError::MissingField(field))
  } else {
    Ok(value)
  }
}

fn checked_date(text: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
  let date = parse_date(required(text, field)?)?;
  if date < min_date() {
    return Err(ValidationError::BeforeMinimum);
  }
  Ok(date)
}

/// A validated holiday or permission request, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDraft {
  pub start: Time,
  pub end: Time,
  pub reason: String,
}

/// Validate the fields of a holiday or permission request form
pub fn validate_request(start: &str, end: &str, reason: &str) -> Result<RequestDraft, ValidationError> {
  let start_date = checked_date(start, "Start date")?;
  let end_date = checked_date(end, "End date")?;
  let reason = required(reason, "Reason")?;

  if end_date < start_date {
    return Err(ValidationError::EndBeforeStart);
  }

  Ok(RequestDraft {
    start: to_nanos(start_date),
    end: to_nanos(end_date),
    reason: reason.to_string(),
  })
}

/// Raw input of the attendance form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceDraft {
  pub date: String,
  pub status: AttendanceStatus,
  pub activity: Option<ActivityKind>,
  pub activity_value: String,
  pub start_time: String,
  pub end_time: String,
  /// Minutes
  pub break_duration: String,
  pub notes: String,
}

impl AttendanceDraft {
  /// Prefill the form from an existing record
  pub fn from_record(record: &AttendanceRecord) -> Self {
    Self {
      date: super::time::from_nanos(record.date)
        .format("%Y-%m-%d")
        .to_string(),
      status: record.status.clone(),
      activity: record.activity.kind(),
      activity_value: record.activity.value().to_string(),
      start_time: record.start_time.clone().unwrap_or_default(),
      end_time: record.end_time.clone().unwrap_or_default(),
      break_duration: record
        .break_duration
        .map(|b| b.to_string())
        .unwrap_or_default(),
      notes: record.notes.clone().unwrap_or_default(),
    }
  }

  /// Build the record to send; `id` is 0 for new records.
  ///
  /// Hours worked are computed only when both clock times are given.
  pub fn validate(&self, id: u64) -> Result<AttendanceRecord, ValidationError> {
    let date = checked_date(&self.date, "Date")?;

    let kind = self.activity.ok_or(ValidationError::MissingField("Activity"))?;
    let value = self.activity_value.trim();
    if kind.needs_value() && value.is_empty() {
      return Err(ValidationError::ActivityRequired);
    }

    let start_time = optional(&self.start_time);
    let end_time = optional(&self.end_time);
    if let Some(start) = &start_time {
      parse_clock(start)?;
    }
    if let Some(end) = &end_time {
      parse_clock(end)?;
    }

    let break_duration = match optional(&self.break_duration) {
      Some(text) => Some(
        text
          .parse::<u64>()
          .map_err(|_| ValidationError::InvalidNumber(text.clone()))?,
      ),
      None => None,
    };

    let hours = match (&start_time, &end_time) {
      (Some(start), Some(end)) => Some(hours_worked(start, end, break_duration.unwrap_or(0))?),
      _ => None,
    };

    Ok(AttendanceRecord {
      id,
      date: to_nanos(date),
      status: self.status.clone(),
      activity: kind.with_value(value),
      start_time,
      end_time,
      break_duration,
      hours_worked: hours,
      notes: optional(&self.notes),
      timestamp: now_nanos(),
    })
  }
}

fn optional(text: &str) -> Option<String> {
  let text = text.trim();
  (!text.is_empty()).then(|| text.to_string())
}

/// Holiday days granted to a newly created profile
pub const DEFAULT_HOLIDAY_BALANCE: u64 = 20;

/// Validate the profile form shared by onboarding and profile setup
pub fn validate_profile(name: &str, position: &str) -> Result<(String, String), ValidationError> {
  let name = required(name, "Name")?;
  let position = required(position, "Position")?;
  Ok((name.to_string(), position.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::ActivityType;

  fn draft() -> AttendanceDraft {
    AttendanceDraft {
      date: "2026-10-19".to_string(),
      activity: Some(ActivityKind::Project),
      activity_value: "Apollo".to_string(),
      start_time: "09:00".to_string(),
      end_time: "18:00".to_string(),
      break_duration: "60".to_string(),
      ..AttendanceDraft::default()
    }
  }

  #[test]
  fn test_end_before_start_rejected() {
    assert_eq!(
      validate_request("2026-08-14", "2026-08-10", "Summer"),
      Err(ValidationError::EndBeforeStart)
    );
  }

  #[test]
  fn test_same_day_request_accepted() {
    let draft = validate_request("2026-08-14", "2026-08-14", " Dentist ").unwrap();
    assert_eq!(draft.start, draft.end);
    assert_eq!(draft.reason, "Dentist");
  }

  #[test]
  fn test_request_requires_every_field() {
    assert_eq!(
      validate_request("", "2026-08-14", "x"),
      Err(ValidationError::MissingField("Start date"))
    );
    assert_eq!(
      validate_request("2026-08-10", "2026-08-14", "  "),
      Err(ValidationError::MissingField("Reason"))
    );
  }

  #[test]
  fn test_date_before_minimum_rejected() {
    assert_eq!(
      validate_request("2024-12-31", "2025-01-02", "x"),
      Err(ValidationError::BeforeMinimum)
    );
    let mut early = draft();
    early.date = "2024-06-01".to_string();
    assert_eq!(early.validate(0), Err(ValidationError::BeforeMinimum));
  }

  #[test]
  fn test_attendance_computes_hours() {
    let record = draft().validate(0).unwrap();
    assert_eq!(record.hours_worked, Some(8));
    assert_eq!(record.break_duration, Some(60));
    assert_eq!(record.activity, ActivityType::Project("Apollo".to_string()));
    assert_eq!(record.id, 0);
  }

  #[test]
  fn test_activity_text_required_unless_tag_only() {
    let mut missing = draft();
    missing.activity_value = " ".to_string();
    assert_eq!(missing.validate(0), Err(ValidationError::ActivityRequired));

    let mut weekend = missing.clone();
    weekend.activity = Some(ActivityKind::Weekend);
    assert_eq!(weekend.validate(0).unwrap().activity, ActivityType::Weekend);
  }

  #[test]
  fn test_malformed_clock_rejected() {
    let mut bad = draft();
    bad.end_time = "6pm".to_string();
    assert_eq!(
      bad.validate(0),
      Err(ValidationError::InvalidClock("6pm".to_string()))
    );
  }

  #[test]
  fn test_draft_from_record_round_trips_fields() {
    let record = draft().validate(4).unwrap();
    let again = AttendanceDraft::from_record(&record);
    assert_eq!(again.date, "2026-10-19");
    assert_eq!(again.activity, Some(ActivityKind::Project));
    assert_eq!(again.break_duration, "60");
  }

  #[test]
  fn test_validate_profile() {
    assert!(validate_profile("Ada", "Engineer").is_ok());
    assert_eq!(
      validate_profile("Ada", ""),
      Err(ValidationError::MissingField("Position"))
    );
  }
}
