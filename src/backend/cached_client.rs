//! Backend client with transparent caching.

use std::future::Future;
use std::sync::Arc;

use crate::cache::QueryClient;

use super::actor::Actor;
use super::cache::{Mutation, QueryFamily, QueryKey};
use super::connection::Connection;
use super::error::BackendError;
use super::transport::Transport;
use super::types::{
  AttendanceModification, AttendanceRecord, HolidayRequest, InviteCode, PermissionRequest,
  PermissionType, Principal, Rsvp, Time, UserProfile, UserRecords, UserRole,
};

/// Backend client shared by every screen.
///
/// Reads go through the query cache and degrade to the type's default while
/// the connection is not ready. Writes fail fast when disconnected and, on
/// success, invalidate the read families they affect.
#[derive(Clone)]
pub struct CachedBackend {
  connection: Connection,
  cache: QueryClient,
  /// Reads bypass fresh cache entries
  bypass: bool,
}

impl CachedBackend {
  pub fn new(connection: Connection, cache: QueryClient) -> Self {
    Self {
      connection,
      cache,
      bypass: false,
    }
  }

  /// Handle whose reads always go to the backend and store what they get,
  /// for manual refreshes
  pub fn fresh(&self) -> Self {
    Self {
      bypass: true,
      ..self.clone()
    }
  }

  pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<(), BackendError> {
    self.connection.connect(transport).await
  }

  pub fn connection(&self) -> &Connection {
    &self.connection
  }

  pub fn cache(&self) -> &QueryClient {
    &self.cache
  }

  /// Drop the connection and every cached value
  pub fn logout(&self) {
    self.connection.disconnect();
    self.cache.clear();
  }

  async fn read<T, F, Fut>(&self, key: QueryKey, call: F) -> Result<T, BackendError>
  where
    T: Default + Clone + Send + Sync + 'static,
    F: FnOnce(Actor) -> Fut,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    let Some(actor) = self.connection.ready_actor() else {
      return Ok(T::default());
    };
    if self.bypass {
      self.cache.refetch(key, move || call(actor)).await
    } else {
      self.cache.fetch(key, move || call(actor)).await
    }
  }

  async fn write<T, F, Fut>(&self, mutation: Mutation, call: F) -> Result<T, BackendError>
  where
    F: FnOnce(Actor) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
  {
    let actor = self.connection.actor()?;
    let result = call(actor).await?;
    self.cache.invalidate(mutation.invalidates());
    Ok(result)
  }

  // ==========================================================================
  // Profiles and roles
  // ==========================================================================

  pub async fn current_user_profile(&self) -> Result<Option<UserProfile>, BackendError> {
    self
      .read(QueryFamily::CurrentUserProfile.key(), |actor| async move {
        actor.get_caller_user_profile().await
      })
      .await
  }

  pub async fn is_admin(&self) -> Result<bool, BackendError> {
    self
      .read(QueryFamily::IsAdmin.key(), |actor| async move {
        actor.is_caller_admin().await
      })
      .await
  }

  pub async fn caller_role(&self) -> Result<UserRole, BackendError> {
    self
      .read(QueryFamily::CallerRole.key(), |actor| async move {
        actor.get_caller_user_role().await
      })
      .await
  }

  pub async fn user_profile(&self, user: &Principal) -> Result<Option<UserProfile>, BackendError> {
    let user = user.clone();
    self
      .read(
        QueryFamily::UserProfile.key_for_principal(&user),
        |actor| async move { actor.get_user_profile(&user).await },
      )
      .await
  }

  pub async fn save_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
    self
      .write(Mutation::SaveProfile, |actor| async move {
        actor.save_caller_user_profile(&profile).await
      })
      .await
  }

  pub async fn assign_role(&self, user: Principal, role: UserRole) -> Result<(), BackendError> {
    self
      .write(Mutation::AssignRole, |actor| async move {
        actor.assign_caller_user_role(&user, &role).await
      })
      .await
  }

  // ==========================================================================
  // Attendance reads
  // ==========================================================================

  pub async fn my_attendance_records(&self) -> Result<Vec<AttendanceRecord>, BackendError> {
    self
      .read(QueryFamily::MyAttendanceRecords.key(), |actor| async move {
        actor.get_my_attendance_records().await
      })
      .await
  }

  pub async fn all_attendance_records(&self) -> Result<UserRecords, BackendError> {
    self
      .read(QueryFamily::AllAttendanceRecords.key(), |actor| async move {
        actor.get_all_attendance_records().await
      })
      .await
  }

  pub async fn user_attendance_records(
    &self,
    user: &Principal,
  ) -> Result<Vec<AttendanceRecord>, BackendError> {
    let user = user.clone();
    self
      .read(
        QueryFamily::UserAttendanceRecords.key_for_principal(&user),
        |actor| async move { actor.get_user_attendance_records(&user).await },
      )
      .await
  }

  pub async fn attendance_by_day(
    &self,
    day: Time,
  ) -> Result<Vec<(Principal, AttendanceRecord)>, BackendError> {
    self
      .read(
        QueryFamily::AttendanceByDay.key_for_time(day),
        |actor| async move { actor.get_attendance_by_day(day).await },
      )
      .await
  }

  pub async fn attendance_by_week(&self, week_start: Time) -> Result<UserRecords, BackendError> {
    self
      .read(
        QueryFamily::AttendanceByWeek.key_for_time(week_start),
        |actor| async move { actor.get_attendance_by_week(week_start).await },
      )
      .await
  }

  pub async fn attendance_by_month(&self, month_start: Time) -> Result<UserRecords, BackendError> {
    self
      .read(
        QueryFamily::AttendanceByMonth.key_for_time(month_start),
        |actor| async move { actor.get_attendance_by_month(month_start).await },
      )
      .await
  }

  pub async fn my_attendance_modifications(
    &self,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    self
      .read(
        QueryFamily::MyAttendanceModifications.key(),
        |actor| async move { actor.get_my_attendance_modifications().await },
      )
      .await
  }

  pub async fn user_attendance_modifications(
    &self,
    user: &Principal,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    let user = user.clone();
    self
      .read(
        QueryFamily::UserAttendanceModifications.key_for_principal(&user),
        |actor| async move { actor.get_user_attendance_modifications(&user).await },
      )
      .await
  }

  pub async fn attendance_modifications_by_period(
    &self,
    start: Time,
    end: Time,
  ) -> Result<Vec<AttendanceModification>, BackendError> {
    self
      .read(
        QueryFamily::AttendanceModificationsByPeriod.key_for_period(start, end),
        |actor| async move { actor.get_attendance_modifications_by_period(start, end).await },
      )
      .await
  }

  pub async fn total_hours(&self, start: Time, end: Time) -> Result<u64, BackendError> {
    self
      .read(
        QueryFamily::TotalHours.key_for_period(start, end),
        |actor| async move { actor.calculate_total_hours(start, end).await },
      )
      .await
  }

  pub async fn total_hours_all_users(
    &self,
    start: Time,
    end: Time,
  ) -> Result<Vec<(Principal, u64)>, BackendError> {
    self
      .read(
        QueryFamily::TotalHoursAllUsers.key_for_period(start, end),
        |actor| async move { actor.calculate_total_hours_for_all_users(start, end).await },
      )
      .await
  }

  // ==========================================================================
  // Attendance writes
  // ==========================================================================

  pub async fn record_attendance(&self, record: AttendanceRecord) -> Result<(), BackendError> {
    self
      .write(Mutation::RecordAttendance, |actor| async move {
        actor.record_attendance(&record).await
      })
      .await
  }

  pub async fn update_attendance(
    &self,
    record_id: u64,
    record: AttendanceRecord,
  ) -> Result<(), BackendError> {
    self
      .write(Mutation::UpdateAttendance, |actor| async move {
        actor.update_attendance_record(record_id, &record).await
      })
      .await
  }

  pub async fn delete_attendance(&self, record_id: u64) -> Result<(), BackendError> {
    self
      .write(Mutation::DeleteAttendance, |actor| async move {
        actor.delete_attendance_record(record_id).await
      })
      .await
  }

  pub async fn export_attendance_csv(&self) -> Result<String, BackendError> {
    self
      .write(Mutation::ExportAttendance, |actor| async move {
        actor.export_attendance_records_as_csv().await
      })
      .await
  }

  // ==========================================================================
  // Holiday requests
  // ==========================================================================

  pub async fn my_holiday_requests(&self) -> Result<Vec<HolidayRequest>, BackendError> {
    self
      .read(QueryFamily::MyHolidayRequests.key(), |actor| async move {
        actor.get_my_holiday_requests().await
      })
      .await
  }

  pub async fn all_holiday_requests(&self) -> Result<Vec<HolidayRequest>, BackendError> {
    self
      .read(QueryFamily::AllHolidayRequests.key(), |actor| async move {
        actor.get_all_holiday_requests().await
      })
      .await
  }

  pub async fn holiday_requests_by_period(
    &self,
    start: Time,
    end: Time,
  ) -> Result<Vec<HolidayRequest>, BackendError> {
    self
      .read(
        QueryFamily::HolidayRequestsByPeriod.key_for_period(start, end),
        |actor| async move { actor.get_holiday_requests_by_period(start, end).await },
      )
      .await
  }

  pub async fn submit_holiday_request(
    &self,
    start: Time,
    end: Time,
    reason: String,
  ) -> Result<u64, BackendError> {
    self
      .write(Mutation::SubmitHolidayRequest, |actor| async move {
        actor.submit_holiday_request(start, end, &reason).await
      })
      .await
  }

  pub async fn approve_holiday_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .write(Mutation::ApproveHolidayRequest, |actor| async move {
        actor.approve_holiday_request(request_id).await
      })
      .await
  }

  pub async fn reject_holiday_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .write(Mutation::RejectHolidayRequest, |actor| async move {
        actor.reject_holiday_request(request_id).await
      })
      .await
  }

  pub async fn export_holiday_csv(&self) -> Result<String, BackendError> {
    self
      .write(Mutation::ExportHolidays, |actor| async move {
        actor.export_holiday_requests_as_csv().await
      })
      .await
  }

  // ==========================================================================
  // Permission requests
  // ==========================================================================

  pub async fn my_permission_requests(&self) -> Result<Vec<PermissionRequest>, BackendError> {
    self
      .read(QueryFamily::MyPermissionRequests.key(), |actor| async move {
        actor.get_my_permission_requests().await
      })
      .await
  }

  pub async fn all_permission_requests(&self) -> Result<Vec<PermissionRequest>, BackendError> {
    self
      .read(QueryFamily::AllPermissionRequests.key(), |actor| async move {
        actor.get_all_permission_requests().await
      })
      .await
  }

  pub async fn submit_permission_request(
    &self,
    start: Time,
    end: Time,
    reason: String,
    request_type: PermissionType,
  ) -> Result<u64, BackendError> {
    self
      .write(Mutation::SubmitPermissionRequest, |actor| async move {
        actor
          .submit_permission_request(start, end, &reason, &request_type)
          .await
      })
      .await
  }

  pub async fn approve_permission_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .write(Mutation::ApprovePermissionRequest, |actor| async move {
        actor.approve_permission_request(request_id).await
      })
      .await
  }

  pub async fn reject_permission_request(&self, request_id: u64) -> Result<(), BackendError> {
    self
      .write(Mutation::RejectPermissionRequest, |actor| async move {
        actor.reject_permission_request(request_id).await
      })
      .await
  }

  pub async fn export_permission_csv(&self) -> Result<String, BackendError> {
    self
      .write(Mutation::ExportPermissions, |actor| async move {
        actor.export_permission_requests_as_csv().await
      })
      .await
  }

  // ==========================================================================
  // Invites and onboarding
  // ==========================================================================

  pub async fn invite_codes(&self) -> Result<Vec<InviteCode>, BackendError> {
    self
      .read(QueryFamily::InviteCodes.key(), |actor| async move {
        actor.get_invite_codes().await
      })
      .await
  }

  pub async fn rsvps(&self) -> Result<Vec<Rsvp>, BackendError> {
    self
      .read(QueryFamily::Rsvps.key(), |actor| async move {
        actor.get_all_rsvps().await
      })
      .await
  }

  /// Generate an invite code, bound to `role` when given
  pub async fn generate_invite_code(&self, role: Option<UserRole>) -> Result<String, BackendError> {
    self
      .write(Mutation::GenerateInviteCode, |actor| async move {
        match role {
          Some(role) => actor.generate_invite_code_with_role(&role).await,
          None => actor.generate_invite_code().await,
        }
      })
      .await
  }

  pub async fn submit_rsvp(
    &self,
    name: String,
    attending: bool,
    invite_code: String,
  ) -> Result<(), BackendError> {
    self
      .write(Mutation::SubmitRsvp, |actor| async move {
        actor.submit_rsvp(&name, attending, &invite_code).await
      })
      .await
  }
}
