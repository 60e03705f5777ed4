use ratatui::prelude::Color;

use crate::backend::types::{AttendanceStatus, RequestStatus};

/// Truncate a string to a maximum length in characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", head)
  }
}

/// Display color for an attendance status
pub fn attendance_color(status: &AttendanceStatus) -> Color {
  match status {
    AttendanceStatus::Present => Color::Green,
    AttendanceStatus::RemoteWork => Color::Cyan,
    AttendanceStatus::Holiday | AttendanceStatus::TimeBank => Color::Blue,
    AttendanceStatus::Sickness | AttendanceStatus::Law104Leave => Color::Yellow,
    AttendanceStatus::Absent => Color::Red,
    AttendanceStatus::Unknown(_) => Color::White,
  }
}

/// Human label for an attendance status
pub fn attendance_label(status: &AttendanceStatus) -> &str {
  match status {
    AttendanceStatus::Present => "Present",
    AttendanceStatus::Sickness => "Sickness",
    AttendanceStatus::Absent => "Absent",
    AttendanceStatus::Holiday => "Holiday",
    AttendanceStatus::Law104Leave => "Law 104 leave",
    AttendanceStatus::TimeBank => "Time bank",
    AttendanceStatus::RemoteWork => "Remote work",
    AttendanceStatus::Unknown(tag) => tag,
  }
}

/// Display color for a request status
pub fn request_color(status: &RequestStatus) -> Color {
  match status {
    RequestStatus::Approved => Color::Green,
    RequestStatus::Pending => Color::Yellow,
    RequestStatus::Rejected => Color::Red,
    RequestStatus::Unknown(_) => Color::White,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("attività svolta", 11), "attività...");
  }

  #[test]
  fn test_request_colors() {
    assert_eq!(request_color(&RequestStatus::Approved), Color::Green);
    assert_eq!(request_color(&RequestStatus::Pending), Color::Yellow);
    assert_eq!(request_color(&RequestStatus::Rejected), Color::Red);
  }

  #[test]
  fn test_attendance_colors() {
    assert_eq!(attendance_color(&AttendanceStatus::Present), Color::Green);
    assert_eq!(attendance_color(&AttendanceStatus::Absent), Color::Red);
    assert_eq!(
      attendance_color(&AttendanceStatus::Unknown("x".into())),
      Color::White
    );
  }

  #[test]
  fn test_unknown_status_label_is_its_tag() {
    assert_eq!(attendance_label(&AttendanceStatus::Unknown("onCall".into())), "onCall");
    assert_eq!(attendance_label(&AttendanceStatus::Law104Leave), "Law 104 leave");
  }
}
