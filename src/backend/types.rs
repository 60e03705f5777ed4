//! Payload types exchanged with the attendance backend.
//!
//! Field names follow the backend's camelCase wire format. Enumerated fields
//! are closed sum types with an `Unknown` fallback so that a newer backend
//! never crashes an older client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds since the Unix epoch.
pub type Time = i64;

/// Opaque identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
  pub fn new(text: impl Into<String>) -> Self {
    Self(text.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Shortened form used when no profile name is known
  pub fn short(&self) -> String {
    if self.0.chars().count() <= 10 {
      self.0.clone()
    } else {
      let head: String = self.0.chars().take(10).collect();
      format!("{}...", head)
    }
  }
}

impl fmt::Display for Principal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Declares a string-keyed backend enum with an `Unknown` fallback variant.
macro_rules! closed_enum {
  (
    $(#[$meta:meta])*
    $name:ident, default = $default:ident {
      $($variant:ident => $wire:literal),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "String", into = "String")]
    pub enum $name {
      $(
        #[doc = concat!("`", $wire, "`")]
        $variant,
      )+
      /// Tag not known to this client
      Unknown(String),
    }

    impl $name {
      /// All known variants, in display order
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      /// Wire tag for this value
      pub fn as_str(&self) -> &str {
        match self {
          $($name::$variant => $wire,)+
          $name::Unknown(tag) => tag,
        }
      }
    }

    impl Default for $name {
      fn default() -> Self {
        $name::$default
      }
    }

    impl From<String> for $name {
      fn from(tag: String) -> Self {
        match tag.as_str() {
          $($wire => $name::$variant,)+
          _ => {
            tracing::warn!(kind = stringify!($name), %tag, "unknown variant tag");
            $name::Unknown(tag)
          }
        }
      }
    }

    impl From<$name> for String {
      fn from(value: $name) -> Self {
        value.as_str().to_string()
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

closed_enum! {
  /// Attendance status of a single working day
  AttendanceStatus, default = Present {
    Present => "present",
    Sickness => "sickness",
    Absent => "absent",
    Holiday => "holiday",
    Law104Leave => "law104Leave",
    TimeBank => "timeBank",
    RemoteWork => "remoteWork",
  }
}

closed_enum! {
  /// Lifecycle state of a holiday or permission request
  RequestStatus, default = Pending {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
  }
}

closed_enum! {
  /// Kind of permission being requested
  PermissionType, default = Generic {
    Generic => "generic",
    FamilyEmergency => "familyEmergency",
    Medical => "medical",
  }
}

closed_enum! {
  /// Access role assigned by the backend
  UserRole, default = Guest {
    Admin => "admin",
    User => "user",
    Guest => "guest",
  }
}

closed_enum! {
  /// Kind of change recorded in the attendance audit trail
  ModificationType, default = Updated {
    Created => "created",
    Updated => "updated",
    Deleted => "deleted",
  }
}

/// What the employee worked on.
///
/// Encoded on the wire as a single-key object, e.g. `{"project": "Apollo"}`
/// or `{"weekend": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum ActivityType {
  Project(String),
  Service(String),
  GenericActivity(String),
  Weekend,
  Workshops,
  /// Tag not known to this client
  Unknown(String),
}

impl Default for ActivityType {
  fn default() -> Self {
    ActivityType::GenericActivity(String::new())
  }
}

/// Tag-only view of an activity, used by forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
  Project,
  Service,
  GenericActivity,
  Weekend,
  Workshops,
}

impl ActivityKind {
  pub const ALL: &'static [ActivityKind] = &[
    ActivityKind::Project,
    ActivityKind::Service,
    ActivityKind::GenericActivity,
    ActivityKind::Weekend,
    ActivityKind::Workshops,
  ];

  /// Whether this kind carries a free-text description
  pub fn needs_value(&self) -> bool {
    !matches!(self, ActivityKind::Weekend | ActivityKind::Workshops)
  }

  pub fn label(&self) -> &'static str {
    match self {
      ActivityKind::Project => "Project",
      ActivityKind::Service => "Service",
      ActivityKind::GenericActivity => "Activity",
      ActivityKind::Weekend => "Weekend",
      ActivityKind::Workshops => "Workshops",
    }
  }

  /// Build the activity payload for this kind
  pub fn with_value(&self, value: &str) -> ActivityType {
    match self {
      ActivityKind::Project => ActivityType::Project(value.to_string()),
      ActivityKind::Service => ActivityType::Service(value.to_string()),
      ActivityKind::GenericActivity => ActivityType::GenericActivity(value.to_string()),
      ActivityKind::Weekend => ActivityType::Weekend,
      ActivityKind::Workshops => ActivityType::Workshops,
    }
  }
}

impl ActivityType {
  /// The kind of this activity, `None` for unknown tags
  pub fn kind(&self) -> Option<ActivityKind> {
    match self {
      ActivityType::Project(_) => Some(ActivityKind::Project),
      ActivityType::Service(_) => Some(ActivityKind::Service),
      ActivityType::GenericActivity(_) => Some(ActivityKind::GenericActivity),
      ActivityType::Weekend => Some(ActivityKind::Weekend),
      ActivityType::Workshops => Some(ActivityKind::Workshops),
      ActivityType::Unknown(_) => None,
    }
  }

  /// Free-text description, empty for tag-only activities
  pub fn value(&self) -> &str {
    match self {
      ActivityType::Project(v) | ActivityType::Service(v) | ActivityType::GenericActivity(v) => v,
      ActivityType::Weekend | ActivityType::Workshops | ActivityType::Unknown(_) => "",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub name: String,
  pub position: String,
  pub is_employee: bool,
  pub holiday_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
  pub id: u64,
  pub date: Time,
  pub status: AttendanceStatus,
  pub activity: ActivityType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_time: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_time: Option<String>,
  /// Minutes
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub break_duration: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hours_worked: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  pub timestamp: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceModification {
  pub record_id: u64,
  pub modified_by: Principal,
  pub modification_type: ModificationType,
  pub timestamp: Time,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub old_record: Option<AttendanceRecord>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub new_record: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayRequest {
  pub id: u64,
  pub user: Principal,
  pub start_date: Time,
  pub end_date: Time,
  pub reason: String,
  pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
  pub id: u64,
  pub user: Principal,
  pub start_date: Time,
  pub end_date: Time,
  pub reason: String,
  pub status: RequestStatus,
  pub request_type: PermissionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCode {
  pub code: String,
  pub created: Time,
  pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
  pub name: String,
  pub invite_code: String,
  pub timestamp: Time,
  pub attending: bool,
}

/// Records of one user, as returned by the team-wide reads
pub type UserRecords = Vec<(Principal, Vec<AttendanceRecord>)>;

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_status_round_trips_wire_tag() {
    let status: AttendanceStatus = serde_json::from_value(json!("law104Leave")).unwrap();
    assert_eq!(status, AttendanceStatus::Law104Leave);
    assert_eq!(serde_json::to_value(&status).unwrap(), json!("law104Leave"));
  }

  #[test]
  fn test_unknown_status_falls_back() {
    let status: AttendanceStatus = serde_json::from_value(json!("sabbatical")).unwrap();
    assert_eq!(status, AttendanceStatus::Unknown("sabbatical".to_string()));
    assert_eq!(status.to_string(), "sabbatical");
  }

  #[test]
  fn test_record_decodes_with_missing_optionals() {
    let record: AttendanceRecord = serde_json::from_value(json!({
      "id": 7,
      "date": 1_735_689_600_000_000_000i64,
      "status": "remoteWork",
      "activity": {"project": "Apollo"},
      "timestamp": 1_735_689_600_000_000_000i64,
    }))
    .unwrap();

    assert_eq!(record.id, 7);
    assert_eq!(record.status, AttendanceStatus::RemoteWork);
    assert_eq!(record.activity, ActivityType::Project("Apollo".to_string()));
    assert_eq!(record.hours_worked, None);
    assert_eq!(record.start_time, None);
  }

  #[test]
  fn test_user_records_decode_from_pairs() {
    let rows: UserRecords = serde_json::from_value(json!([
      ["aaaaa-bbbbb", [{
        "id": 1,
        "date": 0,
        "status": "present",
        "activity": {"weekend": null},
        "timestamp": 0,
      }]]
    ]))
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, Principal::new("aaaaa-bbbbb"));
    assert_eq!(rows[0].1[0].activity, ActivityType::Weekend);
  }

  #[test]
  fn test_principal_short() {
    assert_eq!(Principal::new("abc").short(), "abc");
    assert_eq!(
      Principal::new("rrkah-fqaaa-aaaaa-aaaaq-cai").short(),
      "rrkah-fqaa..."
    );
  }

  #[test]
  fn test_activity_kind_builds_payload() {
    assert_eq!(
      ActivityKind::Service.with_value("Helpdesk"),
      ActivityType::Service("Helpdesk".to_string())
    );
    assert_eq!(ActivityKind::Workshops.with_value("ignored"), ActivityType::Workshops);
    assert!(!ActivityKind::Weekend.needs_value());
    assert!(ActivityKind::Project.needs_value());
  }
}
