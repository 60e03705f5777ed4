use super::time::parse_clock;
use super::validation::ValidationError;
use crate::backend::types::AttendanceRecord;

/// Whole hours worked between two `HH:MM` clock times.
///
/// The break (minutes) is subtracted, the result rounded half up and
/// clamped at zero.
pub fn hours_worked(start: &str, end: &str, break_minutes: u64) -> Result<u64, ValidationError> {
  let start = parse_clock(start)?;
  let end = parse_clock(end)?;

  let break_minutes = i64::try_from(break_minutes).unwrap_or(i64::MAX);
  let worked = (end - start).num_minutes().saturating_sub(break_minutes);
  if worked <= 0 {
    return Ok(0);
  }
  Ok(((worked + 30) / 60) as u64)
}

/// Sum of `hours_worked`, missing values counting as zero
pub fn total_hours<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> u64 {
  records
    .into_iter()
    .map(|r| r.hours_worked.unwrap_or(0))
    .sum()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_full_day_with_lunch() {
    assert_eq!(hours_worked("09:00", "18:00", 60), Ok(8));
  }

  #[test]
  fn test_break_longer_than_shift_clamps_to_zero() {
    assert_eq!(hours_worked("09:00", "10:00", 90), Ok(0));
  }

  #[test]
  fn test_half_hour_rounds_up() {
    assert_eq!(hours_worked("09:00", "10:30", 0), Ok(2));
    assert_eq!(hours_worked("09:00", "10:29", 0), Ok(1));
  }

  #[test]
  fn test_end_before_start_is_zero() {
    assert_eq!(hours_worked("18:00", "09:00", 0), Ok(0));
  }

  #[test]
  fn test_total_hours_treats_missing_as_zero() {
    let records = vec![
      AttendanceRecord {
        hours_worked: Some(8),
        ..AttendanceRecord::default()
      },
      AttendanceRecord::default(),
      AttendanceRecord {
        hours_worked: Some(4),
        ..AttendanceRecord::default()
      },
    ];
    assert_eq!(total_hours(&records), 12);
  }
}
