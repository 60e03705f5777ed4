use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::BackendError;
use super::transport::Transport;
use super::types::{
  AttendanceModification, AttendanceRecord, HolidayRequest, InviteCode, PermissionRequest,
  PermissionType, Principal, Rsvp, Time, UserProfile, UserRecords, UserRole,
};

/// Typed binding of the backend's remote procedures.
///
/// One method per backend operation, named after it. Calls are passed
/// straight through: no retries, no reshaping of results.
#[derive(Clone)]
pub struct Actor {
  transport: Arc<dyn Transport>,
}

impl Actor {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  async fn invoke<T: DeserializeOwned>(&self, method: &str, args: Value) -> Result<T, BackendError> {
    let value = self.transport.call(method, args).await?;
    serde_json::from_value(value).map_err(|e| BackendError::Decode {
      method: method.to_string(),
      message: e.to_string(),
    })
  }

  /// Invoke a procedure whose result is ignored
  async fn invoke_unit(&self, method: &str, args: Value) -> Result<(), BackendError> {
    self.transport.call(method, args).await.map(|_| ())
  }

  // ==========================================================================
  // Access control and profiles
  // ==========================================================================

  pub async fn initialize_access_control(&self) -> Result<(), BackendError> {
    self.invoke_unit("initializeAccessControl", json!([])).await
  }

  pub async fn is_caller_admin(&self) -> Result<bool, BackendError> {
    self.invoke("isCallerAdmin", json!([])).await
  }

  pub async fn get_caller_user_role(&self) -> Result<UserRole, BackendError> {
    self.invoke("getCallerUserRole", json!([])).await
  }

  pub async fn assign_caller_user_role(
    &self,
    user: &Principal,
    role: &UserRole,
  ) -> Result<(), BackendError> {
    self
      .invoke_unit("assignCallerUserRole", json!([user, role]))
      .await
  }

  pub async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError> {
    self.invoke("getCallerUserProfile", json!([])).await
  }

  pub async fn get_user_profile(&self, user: &Principal) -> Result<Option<UserProfile>, BackendError> {
    self.invoke("getUserProfile", json!([user])).await
  }

  pub async fn save_caller_user_profile(&self, profile: &UserProfile) -> Result<(), BackendError> {
    self
      .invoke_unit("saveCallerUserProfile", json!([profile]))
      .await
  }

  // ==========================================================================
  // Attendance
  // ==========================================================================

  pub async fn record_attendance(&self, record: &AttendanceRecord) -> Result<(), BackendError> {
    self.invoke_unit("recordAttendance", json!([record])).await
  }

  pub async fn update_attendance_record(
    &self,
    record_id: u64,
    updated_record: &AttendanceRecord,
  ) -> Result<(), BackendError> {
    self
      .invoke_unit("updateAttendanceRecord", json!([record_id, updated_record]))
      .await
  }

  pub async fn delete_attendance_record(&self, record_id: u64) -> Result<(), BackendError> {
    self
      .invoke_unit("deleteAttendanceRecord", json!([record_id]))
      .await
  }

  pub async fn get_my_attendance_records(&self) -> Result<Vec<AttendanceRecord>, BackendError> {
    self.invoke("getMyAttendanceRecords", json!([])).await
  }

  pub async fn get_all_attendance_records(&self) -> Result<UserRecords, BackendError> {
    self.invoke("getAllAttendanceRecords", json!([])).await
  }

  pub async fn get_user_attendance_records(
    &self,
    user: &Principal,
  ) -> Result<Vec<AttendanceRecord>, BackendError> {
    self.invoke("getUserAttendanceRecords", json!([user])).await
  }

  pub async fn get_attendance_by_day(
    &self,
    date: Time,
  ) -> Result<Vec<(Principal, AttendanceRecord)>, BackendError> {
    self.invoke("getAttendanceByDay", json!([date])).await
  }

  pub async fn get_attendance_by_week(&self, start_date: Time) -> Result<UserRecords, BackendError> {
    self.invoke("getAttendanceByWeek", json!([start_date])).await
  }

  pub async fn get_attendance_by_month(&self, start_date: Time) -> Result<UserRecords, BackendError> {
    self.invoke("getAttendanceByMonth", json!([start_date])).await
  }

  pub async fn get_my_attendance_modifications(
    &self,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    self.invoke("getMyAttendanceModifications", json!([])).await
  }

  pub async fn get_user_attendance_modifications(
    &self,
    user: &Principal,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    self
      .invoke("getUserAttendanceModifications", json!([user]))
      .await
  }

  pub async fn get_attendance_modifications_by_period(
    &self,
    start_date: Time,
    end_date: Time,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    self
      .invoke(
        "getAttendanceModificationsByPeriod",
        json!([start_date, end_date]),
      )
      .await
  }

  pub async fn calculate_total_hours(&self, start_date: Time, end_date: Time) -> Result<u64, BackendError> {
    self
      .invoke("calculateTotalHours", json!([start_date, end_date]))
      .await
  }

  pub async fn calculate_total_hours_for_all_users(
    &self,
    start_date: Time,
    end_date: Time,
  ) -> Result<Vec<(Principal, u64)>, BackendError> {
    self
      .invoke(
        "calculateTotalHoursForAllUsers",
        json!([start_date, end_date]),
      )
      .await
  }

  pub async fn export_attendance_records_as_csv(&self) -> Result<String, BackendError> {
    self.invoke("exportAttendanceRecordsAsCSV", json!([])).await
  }

  // ==========================================================================
  // Holiday requests
  // ==========================================================================

  pub async fn submit_holiday_request(
    &self,
    start_date: Time,
    end_date: Time,
    reason: &str,
  ) -> Result<u64, BackendError> {
    self
      .invoke(
        "submitHolidayRequest",
        json!([start_date, end_date, reason]),
      )
      .await
  }

  pub async fn get_my_holiday_requests(&self) -> Result<Vec<HolidayRequest>, BackendError> {
    self.invoke("getMyHolidayRequests", json!([])).await
  }

  pub async fn get_all_holiday_requests(&self) -> Result<Vec<HolidayRequest>, BackendError> {
    self.invoke("getAllHolidayRequests", json!([])).await
  }

  pub async fn get_holiday_requests_by_period(
    &self,
    start_date: Time,
    end_date: Time,
  ) -> Result<Vec<HolidayRequest>, BackendError> {
    self
      .invoke("getHolidayRequestsByPeriod", json!([start_date, end_date]))
      .await
  }

  pub async fn approve_holiday_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .invoke_unit("approveHolidayRequest", json!([request_id]))
      .await
  }

  pub async fn reject_holiday_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .invoke_unit("rejectHolidayRequest", json!([request_id]))
      .await
  }

  pub async fn export_holiday_requests_as_csv(&self) -> Result<String, BackendError> {
    self.invoke("exportHolidayRequestsAsCSV", json!([])).await
  }

  // ==========================================================================
  // Permission requests
  // ==========================================================================

  pub async fn submit_permission_request(
    &self,
    start_date: Time,
    end_date: Time,
    reason: &str,
    request_type: &PermissionType,
  ) -> Result<u64, BackendError> {
    self
      .invoke(
        "submitPermissionRequest",
        json!([start_date, end_date, reason, request_type]),
      )
      .await
  }

  pub async fn get_my_permission_requests(&self) -> Result<Vec<PermissionRequest>, BackendError> {
    self.invoke("getMyPermissionRequests", json!([])).await
  }

  pub async fn get_all_permission_requests(&self) -> Result<Vec<PermissionRequest>, BackendError> {
    self.invoke("getAllPermissionRequests", json!([])).await
  }

  pub async fn approve_permission_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .invoke_unit("approvePermissionRequest", json!([request_id]))
      .await
  }

  pub async fn reject_permission_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .invoke_unit("rejectPermissionRequest", json!([request_id]))
      .await
  }

  pub async fn export_permission_requests_as_csv(&self) -> Result<String, BackendError> {
    self.invoke("exportPermissionRequestsAsCSV", json!([])).await
  }

  // ==========================================================================
  // Invites and onboarding
  // ==========================================================================

  pub async fn generate_invite_code(&self) -> Result<String, BackendError> {
    self.invoke("generateInviteCode", json!([])).await
  }

  pub async fn generate_invite_code_with_role(&self, role: &UserRole) -> Result<String, BackendError> {
    self
      .invoke("generateInviteCodeWithRole", json!([role]))
      .await
  }

  pub async fn get_invite_codes(&self) -> Result<Vec<InviteCode>, BackendError> {
    self.invoke("getInviteCodes", json!([])).await
  }

  pub async fn submit_rsvp(
    &self,
    name: &str,
    attending: bool,
    invite_code: &str,
  ) -> Result<(), BackendError> {
    self
      .invoke_unit("submitRSVP", json!([name, attending, invite_code]))
      .await
  }

  pub async fn get_all_rsvps(&self) -> Result<Vec<Rsvp>, BackendError> {
    self.invoke("getAllRSVPs", json!([])).await
  }
}
