//! Cache keys and invalidation rules for backend reads.

use std::fmt;

use super::types::{Principal, Time};

// ============================================================================
// Query families
// ============================================================================

/// One read operation, regardless of its parameters.
///
/// Families are the unit of invalidation: a write marks every key of a
/// family stale, whatever parameters it was fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
  CurrentUserProfile,
  IsAdmin,
  CallerRole,
  UserProfile,
  MyAttendanceRecords,
  AllAttendanceRecords,
  UserAttendanceRecords,
  AttendanceByDay,
  AttendanceByWeek,
  AttendanceByMonth,
  MyAttendanceModifications,
  UserAttendanceModifications,
  AttendanceModificationsByPeriod,
  MyHolidayRequests,
  AllHolidayRequests,
  HolidayRequestsByPeriod,
  MyPermissionRequests,
  AllPermissionRequests,
  InviteCodes,
  Rsvps,
  TotalHours,
  TotalHoursAllUsers,
}

impl QueryFamily {
  pub fn name(&self) -> &'static str {
    match self {
      Self::CurrentUserProfile => "currentUserProfile",
      Self::IsAdmin => "isAdmin",
      Self::CallerRole => "callerRole",
      Self::UserProfile => "userProfile",
      Self::MyAttendanceRecords => "myAttendanceRecords",
      Self::AllAttendanceRecords => "allAttendanceRecords",
      Self::UserAttendanceRecords => "userAttendanceRecords",
      Self::AttendanceByDay => "attendanceByDay",
      Self::AttendanceByWeek => "attendanceByWeek",
      Self::AttendanceByMonth => "attendanceByMonth",
      Self::MyAttendanceModifications => "myAttendanceModifications",
      Self::UserAttendanceModifications => "userAttendanceModifications",
      Self::AttendanceModificationsByPeriod => "attendanceModificationsByPeriod",
      Self::MyHolidayRequests => "myHolidayRequests",
      Self::AllHolidayRequests => "allHolidayRequests",
      Self::HolidayRequestsByPeriod => "holidayRequestsByPeriod",
      Self::MyPermissionRequests => "myPermissionRequests",
      Self::AllPermissionRequests => "allPermissionRequests",
      Self::InviteCodes => "inviteCodes",
      Self::Rsvps => "rsvps",
      Self::TotalHours => "totalHours",
      Self::TotalHoursAllUsers => "totalHoursAllUsers",
    }
  }

  /// Key for an unparameterized read
  pub fn key(self) -> QueryKey {
    QueryKey {
      family: self,
      params: Vec::new(),
    }
  }

  pub fn key_for_principal(self, user: &Principal) -> QueryKey {
    QueryKey {
      family: self,
      params: vec![user.as_str().to_string()],
    }
  }

  pub fn key_for_time(self, time: Time) -> QueryKey {
    QueryKey {
      family: self,
      params: vec![time.to_string()],
    }
  }

  pub fn key_for_period(self, start: Time, end: Time) -> QueryKey {
    QueryKey {
      family: self,
      params: vec![start.to_string(), end.to_string()],
    }
  }
}

impl fmt::Display for QueryFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Composite cache key: family plus canonical parameter encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  pub family: QueryFamily,
  pub params: Vec<String>,
}

impl QueryKey {
  /// Stable text form, e.g. `attendanceByWeek:1735516800000000000`
  pub fn encode(&self) -> String {
    let mut out = self.family.name().to_string();
    for param in &self.params {
      out.push(':');
      out.push_str(param);
    }
    out
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}

// ============================================================================
// Mutations
// ============================================================================

/// Write operations, by the read families they make stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  RecordAttendance,
  UpdateAttendance,
  DeleteAttendance,
  SubmitHolidayRequest,
  ApproveHolidayRequest,
  RejectHolidayRequest,
  SubmitPermissionRequest,
  ApprovePermissionRequest,
  RejectPermissionRequest,
  SaveProfile,
  GenerateInviteCode,
  SubmitRsvp,
  ExportAttendance,
  ExportHolidays,
  ExportPermissions,
  AssignRole,
}

const ATTENDANCE: &[QueryFamily] = &[
  QueryFamily::MyAttendanceRecords,
  QueryFamily::AllAttendanceRecords,
  QueryFamily::AttendanceByDay,
  QueryFamily::AttendanceByWeek,
  QueryFamily::AttendanceByMonth,
];

const HOLIDAYS: &[QueryFamily] = &[
  QueryFamily::MyHolidayRequests,
  QueryFamily::AllHolidayRequests,
  QueryFamily::HolidayRequestsByPeriod,
];

const PERMISSIONS: &[QueryFamily] = &[
  QueryFamily::MyPermissionRequests,
  QueryFamily::AllPermissionRequests,
];

impl Mutation {
  /// Families invalidated when this write succeeds
  pub fn invalidates(&self) -> &'static [QueryFamily] {
    match self {
      Self::RecordAttendance | Self::UpdateAttendance | Self::DeleteAttendance => ATTENDANCE,
      Self::SubmitHolidayRequest | Self::ApproveHolidayRequest | Self::RejectHolidayRequest => {
        HOLIDAYS
      }
      Self::SubmitPermissionRequest
      | Self::ApprovePermissionRequest
      | Self::RejectPermissionRequest => PERMISSIONS,
      Self::SaveProfile => &[QueryFamily::CurrentUserProfile],
      Self::GenerateInviteCode => &[QueryFamily::InviteCodes],
      Self::SubmitRsvp => &[QueryFamily::Rsvps, QueryFamily::InviteCodes],
      Self::ExportAttendance | Self::ExportHolidays | Self::ExportPermissions | Self::AssignRole => {
        &[]
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_encoding() {
    assert_eq!(
      QueryFamily::AttendanceByWeek
        .key_for_time(1_735_516_800_000_000_000)
        .encode(),
      "attendanceByWeek:1735516800000000000"
    );
    assert_eq!(QueryFamily::InviteCodes.key().encode(), "inviteCodes");
    assert_eq!(
      QueryFamily::HolidayRequestsByPeriod.key_for_period(1, 2).to_string(),
      "holidayRequestsByPeriod:1:2"
    );
    assert_eq!(
      QueryFamily::UserProfile
        .key_for_principal(&Principal::new("aaaaa-bbb"))
        .encode(),
      "userProfile:aaaaa-bbb"
    );
  }

  #[test]
  fn test_keys_with_different_params_differ() {
    assert_ne!(
      QueryFamily::AttendanceByDay.key_for_time(1),
      QueryFamily::AttendanceByDay.key_for_time(2)
    );
  }

  fn sorted(families: &[QueryFamily]) -> Vec<String> {
    let mut names: Vec<String> = families.iter().map(|f| f.to_string()).collect();
    names.sort();
    names
  }

  #[test]
  fn test_invalidation_table() {
    use QueryFamily::*;

    let attendance = vec![
      MyAttendanceRecords,
      AllAttendanceRecords,
      AttendanceByDay,
      AttendanceByWeek,
      AttendanceByMonth,
    ];
    let holidays = vec![MyHolidayRequests, AllHolidayRequests, HolidayRequestsByPeriod];
    let permissions = vec![MyPermissionRequests, AllPermissionRequests];

    let table: Vec<(Mutation, Vec<QueryFamily>)> = vec![
      (Mutation::RecordAttendance, attendance.clone()),
      (Mutation::UpdateAttendance, attendance.clone()),
      (Mutation::DeleteAttendance, attendance),
      (Mutation::SubmitHolidayRequest, holidays.clone()),
      (Mutation::ApproveHolidayRequest, holidays.clone()),
      (Mutation::RejectHolidayRequest, holidays),
      (Mutation::SubmitPermissionRequest, permissions.clone()),
      (Mutation::ApprovePermissionRequest, permissions.clone()),
      (Mutation::RejectPermissionRequest, permissions),
      (Mutation::SaveProfile, vec![CurrentUserProfile]),
      (Mutation::GenerateInviteCode, vec![InviteCodes]),
      (Mutation::SubmitRsvp, vec![Rsvps, InviteCodes]),
      (Mutation::ExportAttendance, vec![]),
      (Mutation::ExportHolidays, vec![]),
      (Mutation::ExportPermissions, vec![]),
      (Mutation::AssignRole, vec![]),
    ];

    for (mutation, expected) in &table {
      assert_eq!(
        sorted(mutation.invalidates()),
        sorted(expected),
        "{:?} invalidates the wrong families",
        mutation
      );
    }

    // Adding a write without a row here fails to compile
    for (mutation, _) in &table {
      match mutation {
        Mutation::RecordAttendance
        | Mutation::UpdateAttendance
        | Mutation::DeleteAttendance
        | Mutation::SubmitHolidayRequest
        | Mutation::ApproveHolidayRequest
        | Mutation::RejectHolidayRequest
        | Mutation::SubmitPermissionRequest
        | Mutation::ApprovePermissionRequest
        | Mutation::RejectPermissionRequest
        | Mutation::SaveProfile
        | Mutation::GenerateInviteCode
        | Mutation::SubmitRsvp
        | Mutation::ExportAttendance
        | Mutation::ExportHolidays
        | Mutation::ExportPermissions
        | Mutation::AssignRole => {}
      }
    }
    assert_eq!(table.len(), 16);
  }
}
