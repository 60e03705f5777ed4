//! User-facing notices for completed and failed operations.

use crate::backend::BackendError;

/// Operations that report a notice when they settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  RecordAttendance,
  UpdateAttendance,
  DeleteAttendance,
  SubmitHoliday,
  ApproveHoliday,
  RejectHoliday,
  SubmitPermission,
  ApprovePermission,
  RejectPermission,
  GenerateInvite,
  Onboarding,
  SaveProfile,
  AssignRole,
  ExportAttendance,
  ExportHolidays,
  ExportPermissions,
}

impl Operation {
  pub fn success(&self) -> &'static str {
    match self {
      Self::RecordAttendance => "Attendance recorded",
      Self::UpdateAttendance => "Attendance updated",
      Self::DeleteAttendance => "Attendance deleted",
      Self::SubmitHoliday => "Holiday request submitted",
      Self::ApproveHoliday => "Holiday request approved",
      Self::RejectHoliday => "Holiday request rejected",
      Self::SubmitPermission => "Permission request submitted",
      Self::ApprovePermission => "Permission request approved",
      Self::RejectPermission => "Permission request rejected",
      Self::GenerateInvite => "Invite code generated",
      Self::Onboarding => "Welcome to the team!",
      Self::SaveProfile => "Profile saved",
      Self::AssignRole => "Role assigned",
      Self::ExportAttendance => "Attendance report exported",
      Self::ExportHolidays => "Holiday report exported",
      Self::ExportPermissions => "Permission report exported",
    }
  }

  /// Fallback when the failure is not recognized
  pub fn failure(&self) -> &'static str {
    match self {
      Self::RecordAttendance => "Unable to record attendance",
      Self::UpdateAttendance => "Unable to update attendance",
      Self::DeleteAttendance => "Unable to delete attendance",
      Self::SubmitHoliday => "Unable to submit holiday request",
      Self::ApproveHoliday | Self::ApprovePermission => "Unable to approve request",
      Self::RejectHoliday | Self::RejectPermission => "Unable to reject request",
      Self::SubmitPermission => "Unable to submit permission request",
      Self::GenerateInvite => "Unable to generate invite code",
      Self::Onboarding => "Unable to complete onboarding",
      Self::SaveProfile => "Unable to save profile",
      Self::AssignRole => "Unable to assign role",
      Self::ExportAttendance => "Error exporting attendance report",
      Self::ExportHolidays => "Error exporting holiday report",
      Self::ExportPermissions => "Error exporting permission report",
    }
  }
}

/// Notice for a failed operation.
///
/// Backend rejections are matched by substring, since the backend only
/// returns free text.
pub fn error_message(operation: Operation, error: &BackendError) -> String {
  if *error == BackendError::ConnectionUnavailable {
    return "Not connected to the backend".to_string();
  }

  let Some(message) = error.rejection() else {
    return operation.failure().to_string();
  };
  let lower = message.to_lowercase();

  if lower.contains("already used") {
    "This invite code has already been used".to_string()
  } else if lower.contains("not found") {
    match operation {
      Operation::Onboarding => "Invalid invite code".to_string(),
      _ => format!("{}: not found", operation.failure()),
    }
  } else if lower.contains("january 2025") || lower.contains("gennaio 2025") {
    "The date must be on or after 1 January 2025".to_string()
  } else if lower.contains("unauthorized") {
    "You are not allowed to do that".to_string()
  } else {
    operation.failure().to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rejected(message: &str) -> BackendError {
    BackendError::Rejected(message.to_string())
  }

  #[test]
  fn test_invite_code_messages() {
    assert_eq!(
      error_message(Operation::Onboarding, &rejected("Invite code already used")),
      "This invite code has already been used"
    );
    assert_eq!(
      error_message(Operation::Onboarding, &rejected("Invite code not found")),
      "Invalid invite code"
    );
  }

  #[test]
  fn test_minimum_date_message_in_either_language() {
    let expected = "The date must be on or after 1 January 2025";
    assert_eq!(
      error_message(
        Operation::RecordAttendance,
        &rejected("Date must be after January 2025")
      ),
      expected
    );
    assert_eq!(
      error_message(
        Operation::UpdateAttendance,
        &rejected("La data deve essere successiva a gennaio 2025")
      ),
      expected
    );
  }

  #[test]
  fn test_unrecognized_falls_back_per_operation() {
    assert_eq!(
      error_message(Operation::ApproveHoliday, &rejected("boom")),
      "Unable to approve request"
    );
    assert_eq!(
      error_message(
        Operation::SubmitHoliday,
        &BackendError::Transport("timeout".to_string())
      ),
      "Unable to submit holiday request"
    );
  }

  #[test]
  fn test_disconnected() {
    assert_eq!(
      error_message(Operation::GenerateInvite, &BackendError::ConnectionUnavailable),
      "Not connected to the backend"
    );
  }
}
