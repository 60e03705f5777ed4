//! Team-wide statistics shown on the admin overview.

use std::collections::HashMap;

use url::Url;

use crate::backend::types::{
  AttendanceRecord, AttendanceStatus, InviteCode, Principal, Rsvp, UserRecords,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamStats {
  pub total_users: usize,
  pub total_records: usize,
  pub present: usize,
  pub remote: usize,
  pub absent: usize,
  pub total_hours: u64,
}

impl TeamStats {
  /// Aggregate `records`; `total_users` comes from the all-records read.
  pub fn collect<'a>(
    total_users: usize,
    records: impl IntoIterator<Item = &'a AttendanceRecord>,
  ) -> Self {
    let mut stats = Self {
      total_users,
      ..Self::default()
    };

    for record in records {
      stats.total_records += 1;
      match record.status {
        AttendanceStatus::Present => stats.present += 1,
        AttendanceStatus::RemoteWork => stats.remote += 1,
        AttendanceStatus::Absent => stats.absent += 1,
        _ => {}
      }
      stats.total_hours += record.hours_worked.unwrap_or(0);
    }

    stats
  }

  /// Present and remote days as a percentage of all records
  pub fn attendance_rate(&self) -> f64 {
    if self.total_records == 0 {
      return 0.0;
    }
    (self.present + self.remote) as f64 / self.total_records as f64 * 100.0
  }
}

/// Rows of a single day read, one record per user
pub fn day_rows(rows: &[(Principal, AttendanceRecord)]) -> UserRecords {
  rows
    .iter()
    .map(|(user, record)| (user.clone(), vec![record.clone()]))
    .collect()
}

/// Hours per user, highest first
pub fn hours_by_user(rows: &UserRecords) -> Vec<(Principal, u64)> {
  let mut totals: HashMap<&Principal, u64> = HashMap::new();
  for (user, records) in rows {
    let hours: u64 = records.iter().map(|r| r.hours_worked.unwrap_or(0)).sum();
    *totals.entry(user).or_insert(0) += hours;
  }

  let mut sorted: Vec<(Principal, u64)> = totals
    .into_iter()
    .map(|(user, hours)| (user.clone(), hours))
    .collect();
  sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InviteStats {
  pub unused: usize,
  pub used: usize,
  pub accepted: usize,
}

impl InviteStats {
  pub fn collect(codes: &[InviteCode], rsvps: &[Rsvp]) -> Self {
    let used = codes.iter().filter(|c| c.used).count();
    Self {
      unused: codes.len() - used,
      used,
      accepted: rsvps.iter().filter(|r| r.attending).count(),
    }
  }
}

/// Link that opens the onboarding flow for `code`
pub fn invite_link(base: &str, code: &str) -> Result<String, url::ParseError> {
  let mut url = Url::parse(base)?;
  url.query_pairs_mut().append_pair("invite", code);
  Ok(url.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(status: AttendanceStatus, hours: Option<u64>) -> AttendanceRecord {
    AttendanceRecord {
      status,
      hours_worked: hours,
      ..AttendanceRecord::default()
    }
  }

  #[test]
  fn test_team_stats() {
    let records = vec![
      record(AttendanceStatus::Present, Some(8)),
      record(AttendanceStatus::RemoteWork, Some(7)),
      record(AttendanceStatus::Absent, None),
      record(AttendanceStatus::Sickness, None),
    ];

    let stats = TeamStats::collect(3, &records);

    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.present, 1);
    assert_eq!(stats.remote, 1);
    assert_eq!(stats.absent, 1);
    assert_eq!(stats.total_hours, 15);
    assert_eq!(stats.attendance_rate(), 50.0);
  }

  #[test]
  fn test_rate_without_records_is_zero() {
    let empty: Vec<AttendanceRecord> = Vec::new();
    assert_eq!(TeamStats::collect(0, &empty).attendance_rate(), 0.0);
  }

  #[test]
  fn test_hours_by_user_sorted() {
    let rows: UserRecords = vec![
      (
        Principal::new("a"),
        vec![record(AttendanceStatus::Present, Some(4))],
      ),
      (
        Principal::new("b"),
        vec![
          record(AttendanceStatus::Present, Some(8)),
          record(AttendanceStatus::Present, Some(8)),
        ],
      ),
    ];

    assert_eq!(
      hours_by_user(&rows),
      vec![(Principal::new("b"), 16), (Principal::new("a"), 4)]
    );
  }

  #[test]
  fn test_invite_stats() {
    let codes = vec![
      InviteCode {
        code: "A".to_string(),
        created: 0,
        used: true,
      },
      InviteCode {
        code: "B".to_string(),
        created: 0,
        used: false,
      },
    ];
    let rsvps = vec![Rsvp {
      name: "Ada".to_string(),
      invite_code: "A".to_string(),
      timestamp: 0,
      attending: true,
    }];

    assert_eq!(
      InviteStats::collect(&codes, &rsvps),
      InviteStats {
        unused: 1,
        used: 1,
        accepted: 1
      }
    );
  }

  #[test]
  fn test_invite_link() {
    assert_eq!(
      invite_link("https://hr.example.com/", "AB12").unwrap(),
      "https://hr.example.com/?invite=AB12"
    );
  }
}
