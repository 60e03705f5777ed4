//! In-memory backend used by tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::error::BackendError;
use super::transport::Transport;
use super::types::{
  AttendanceRecord, HolidayRequest, InviteCode, PermissionRequest, PermissionType, Principal,
  RequestStatus, Rsvp, Time, UserProfile,
};

const DAY_NANOS: Time = 86_400_000_000_000;

#[derive(Default)]
struct FakeState {
  calls: HashMap<String, usize>,
  failures: HashMap<String, String>,
  delay: Option<Duration>,
  profile: Option<UserProfile>,
  /// Caller holds the plain user role instead of admin
  regular_user: bool,
  records: Vec<AttendanceRecord>,
  holidays: Vec<HolidayRequest>,
  permissions: Vec<PermissionRequest>,
  invites: Vec<InviteCode>,
  rsvps: Vec<Rsvp>,
  next_id: u64,
}

/// Single-caller backend kept in memory, counting calls per procedure.
pub struct FakeBackend {
  caller: Principal,
  state: Mutex<FakeState>,
}

impl FakeBackend {
  pub fn new() -> Self {
    Self {
      caller: Principal::new("caller-principal-0001"),
      state: Mutex::new(FakeState {
        next_id: 1,
        ..FakeState::default()
      }),
    }
  }

  pub fn caller(&self) -> &Principal {
    &self.caller
  }

  /// Number of calls made to `method`
  pub fn calls(&self, method: &str) -> usize {
    self.lock().calls.get(method).copied().unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self.lock().calls.values().sum()
  }

  /// Make the next call to `method` fail with a rejection
  pub fn fail_next(&self, method: &str, message: &str) {
    self
      .lock()
      .failures
      .insert(method.to_string(), message.to_string());
  }

  /// Delay every reply, so concurrent calls overlap
  pub fn set_delay(&self, delay: Duration) {
    self.lock().delay = Some(delay);
  }

  pub fn with_profile(self, profile: UserProfile) -> Self {
    self.lock().profile = Some(profile);
    self
  }

  pub fn as_regular_user(self) -> Self {
    self.lock().regular_user = true;
    self
  }

  pub fn add_invite(&self, code: &str) {
    self.lock().invites.push(InviteCode {
      code: code.to_string(),
      created: 0,
      used: false,
    });
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  fn dispatch(&self, method: &str, args: &Value) -> Result<Value, BackendError> {
    let mut state = self.lock();
    let caller = self.caller.clone();

    let reply = match method {
      "initializeAccessControl" => Value::Null,
      "isCallerAdmin" => json!(!state.regular_user),
      "getCallerUserRole" => json!(if state.regular_user { "user" } else { "admin" }),
      "assignCallerUserRole" => Value::Null,
      "getCallerUserProfile" => json!(state.profile),
      "getUserProfile" => {
        let user: Principal = arg(args, 0)?;
        if user == caller {
          json!(state.profile)
        } else {
          Value::Null
        }
      }
      "saveCallerUserProfile" => {
        state.profile = Some(arg(args, 0)?);
        Value::Null
      }

      "recordAttendance" => {
        let mut record: AttendanceRecord = arg(args, 0)?;
        record.id = state.next_id;
        state.next_id += 1;
        state.records.push(record);
        Value::Null
      }
      "updateAttendanceRecord" => {
        let id: u64 = arg(args, 0)?;
        let mut updated: AttendanceRecord = arg(args, 1)?;
        let slot = state
          .records
          .iter_mut()
          .find(|r| r.id == id)
          .ok_or_else(|| BackendError::Rejected("Record not found".to_string()))?;
        updated.id = id;
        *slot = updated;
        Value::Null
      }
      "deleteAttendanceRecord" => {
        let id: u64 = arg(args, 0)?;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
          return Err(BackendError::Rejected("Record not found".to_string()));
        }
        Value::Null
      }
      "getMyAttendanceRecords" => json!(state.records),
      "getUserAttendanceRecords" => {
        let user: Principal = arg(args, 0)?;
        if user == caller {
          json!(state.records)
        } else {
          json!([])
        }
      }
      "getAllAttendanceRecords" => json!([[caller, state.records]]),
      "getAttendanceByDay" => {
        let day: Time = arg(args, 0)?;
        let rows: Vec<_> = state
          .records
          .iter()
          .filter(|r| r.date >= day && r.date < day + DAY_NANOS)
          .map(|r| json!([caller, r]))
          .collect();
        json!(rows)
      }
      "getAttendanceByWeek" | "getAttendanceByMonth" => {
        let start: Time = arg(args, 0)?;
        let span = if method == "getAttendanceByWeek" { 7 } else { 31 };
        let records: Vec<_> = state
          .records
          .iter()
          .filter(|r| r.date >= start && r.date < start + span * DAY_NANOS)
          .cloned()
          .collect();
        json!([[caller, records]])
      }
      "getMyAttendanceModifications"
      | "getUserAttendanceModifications"
      | "getAttendanceModificationsByPeriod" => json!([]),
      "calculateTotalHours" => json!(total_hours(&state.records)),
      "calculateTotalHoursForAllUsers" => json!([[caller, total_hours(&state.records)]]),
      "exportAttendanceRecordsAsCSV" => {
        let mut csv = "date,status,hours\n".to_string();
        for record in &state.records {
          csv.push_str(&format!(
            "{},{},{}\n",
            record.date,
            record.status,
            record.hours_worked.unwrap_or(0)
          ));
        }
        json!(csv)
      }

      "submitHolidayRequest" => {
        let id = state.next_id;
        state.next_id += 1;
        state.holidays.push(HolidayRequest {
          id,
          user: caller,
          start_date: arg(args, 0)?,
          end_date: arg(args, 1)?,
          reason: arg(args, 2)?,
          status: RequestStatus::Pending,
        });
        json!(id)
      }
      "getMyHolidayRequests" | "getAllHolidayRequests" => json!(state.holidays),
      "getHolidayRequestsByPeriod" => {
        let start: Time = arg(args, 0)?;
        let end: Time = arg(args, 1)?;
        let rows: Vec<_> = state
          .holidays
          .iter()
          .filter(|h| h.start_date <= end && h.end_date >= start)
          .cloned()
          .collect();
        json!(rows)
      }
      "approveHolidayRequest" | "rejectHolidayRequest" => {
        let id: u64 = arg(args, 0)?;
        let status = if method.starts_with("approve") {
          RequestStatus::Approved
        } else {
          RequestStatus::Rejected
        };
        let request = state
          .holidays
          .iter_mut()
          .find(|h| h.id == id)
          .ok_or_else(|| BackendError::Rejected("Request not found".to_string()))?;
        request.status = status;
        Value::Null
      }
      "exportHolidayRequestsAsCSV" => {
        json!(format!("id,status\n{}", rows_csv(state.holidays.iter().map(|h| (h.id, &h.status)))))
      }

      "submitPermissionRequest" => {
        let id = state.next_id;
        state.next_id += 1;
        let request_type: PermissionType = arg(args, 3)?;
        state.permissions.push(PermissionRequest {
          id,
          user: caller,
          start_date: arg(args, 0)?,
          end_date: arg(args, 1)?,
          reason: arg(args, 2)?,
          status: RequestStatus::Pending,
          request_type,
        });
        json!(id)
      }
      "getMyPermissionRequests" | "getAllPermissionRequests" => json!(state.permissions),
      "approvePermissionRequest" | "rejectPermissionRequest" => {
        let id: u64 = arg(args, 0)?;
        let status = if method.starts_with("approve") {
          RequestStatus::Approved
        } else {
          RequestStatus::Rejected
        };
        let request = state
          .permissions
          .iter_mut()
          .find(|p| p.id == id)
          .ok_or_else(|| BackendError::Rejected("Request not found".to_string()))?;
        request.status = status;
        Value::Null
      }
      "exportPermissionRequestsAsCSV" => json!(format!(
        "id,status\n{}",
        rows_csv(state.permissions.iter().map(|p| (p.id, &p.status)))
      )),

      "generateInviteCode" | "generateInviteCodeWithRole" => {
        let code = format!("INVITE{}", state.next_id);
        state.next_id += 1;
        state.invites.push(InviteCode {
          code: code.clone(),
          created: 0,
          used: false,
        });
        json!(code)
      }
      "getInviteCodes" => json!(state.invites),
      "submitRSVP" => {
        let name: String = arg(args, 0)?;
        let attending: bool = arg(args, 1)?;
        let code: String = arg(args, 2)?;
        let invite = state
          .invites
          .iter_mut()
          .find(|i| i.code == code)
          .ok_or_else(|| BackendError::Rejected("Invite code not found".to_string()))?;
        if invite.used {
          return Err(BackendError::Rejected("Invite code already used".to_string()));
        }
        invite.used = true;
        state.rsvps.push(Rsvp {
          name,
          invite_code: code,
          timestamp: 0,
          attending,
        });
        Value::Null
      }
      "getAllRSVPs" => json!(state.rsvps),

      other => return Err(BackendError::Rejected(format!("unknown method {}", other))),
    };

    Ok(reply)
  }
}

#[async_trait]
impl Transport for FakeBackend {
  async fn call(&self, method: &str, args: Value) -> Result<Value, BackendError> {
    let (failure, delay) = {
      let mut state = self.lock();
      *state.calls.entry(method.to_string()).or_insert(0) += 1;
      (state.failures.remove(method), state.delay)
    };

    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if let Some(message) = failure {
      return Err(BackendError::Rejected(message));
    }

    self.dispatch(method, &args)
  }
}

fn arg<T: DeserializeOwned>(args: &Value, index: usize) -> Result<T, BackendError> {
  serde_json::from_value(args.get(index).cloned().unwrap_or(Value::Null)).map_err(|e| {
    BackendError::Decode {
      method: format!("argument {}", index),
      message: e.to_string(),
    }
  })
}

fn total_hours(records: &[AttendanceRecord]) -> u64 {
  records.iter().filter_map(|r| r.hours_worked).sum()
}

fn rows_csv<'a>(rows: impl Iterator<Item = (u64, &'a RequestStatus)>) -> String {
  rows
    .map(|(id, status)| format!("{},{}\n", id, status))
    .collect()
}
