//! Day, week and month windows used to browse attendance.

use chrono::{Datelike, Days, Months, NaiveDate};

use super::time::{from_nanos, to_nanos, today};
use crate::backend::types::{AttendanceRecord, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
  Day,
  #[default]
  Week,
  Month,
}

impl WindowKind {
  pub fn label(&self) -> &'static str {
    match self {
      WindowKind::Day => "Day",
      WindowKind::Week => "Week",
      WindowKind::Month => "Month",
    }
  }
}

/// A calendar window anchored at some date.
///
/// Weeks run Monday to Sunday; months cover the first to the last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
  pub kind: WindowKind,
  anchor: NaiveDate,
}

impl TimeWindow {
  pub fn new(kind: WindowKind, anchor: NaiveDate) -> Self {
    Self { kind, anchor }
  }

  /// Window of `kind` containing today
  pub fn current(kind: WindowKind) -> Self {
    Self::new(kind, today())
  }

  pub fn anchor(&self) -> NaiveDate {
    self.anchor
  }

  /// First day of the window
  pub fn start(&self) -> NaiveDate {
    match self.kind {
      WindowKind::Day => self.anchor,
      WindowKind::Week => {
        let offset = u64::from(self.anchor.weekday().num_days_from_monday());
        self.anchor - Days::new(offset)
      }
      WindowKind::Month => self.anchor.with_day(1).unwrap_or(self.anchor),
    }
  }

  /// Last day of the window, inclusive
  pub fn end(&self) -> NaiveDate {
    let start = self.start();
    match self.kind {
      WindowKind::Day => start,
      WindowKind::Week => start + Days::new(6),
      WindowKind::Month => start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start),
    }
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    date >= self.start() && date <= self.end()
  }

  /// Timestamp the backend's by-day/by-week/by-month reads are keyed on
  pub fn query_anchor(&self) -> Time {
    to_nanos(self.start())
  }

  /// Start of the first day and start of the last day, as timestamps
  pub fn bounds(&self) -> (Time, Time) {
    (to_nanos(self.start()), to_nanos(self.end()))
  }

  pub fn with_kind(&self, kind: WindowKind) -> Self {
    Self::new(kind, self.anchor)
  }

  pub fn previous(&self) -> Self {
    self.shift(false)
  }

  pub fn next(&self) -> Self {
    self.shift(true)
  }

  /// Same kind of window, moved to today
  pub fn today(&self) -> Self {
    Self::current(self.kind)
  }

  fn shift(&self, forward: bool) -> Self {
    let anchor = match (self.kind, forward) {
      (WindowKind::Day, true) => self.anchor.checked_add_days(Days::new(1)),
      (WindowKind::Day, false) => self.anchor.checked_sub_days(Days::new(1)),
      (WindowKind::Week, true) => self.anchor.checked_add_days(Days::new(7)),
      (WindowKind::Week, false) => self.anchor.checked_sub_days(Days::new(7)),
      (WindowKind::Month, true) => self.start().checked_add_months(Months::new(1)),
      (WindowKind::Month, false) => self.start().checked_sub_months(Months::new(1)),
    };
    Self::new(self.kind, anchor.unwrap_or(self.anchor))
  }

  /// Human label, e.g. `Monday, 19 October 2026`, `19 Oct - 25 Oct 2026`
  /// or `October 2026`
  pub fn label(&self) -> String {
    match self.kind {
      WindowKind::Day => self.anchor.format("%A, %-d %B %Y").to_string(),
      WindowKind::Week => format!(
        "{} - {}",
        self.start().format("%-d %b"),
        self.end().format("%-d %b %Y")
      ),
      WindowKind::Month => self.anchor.format("%B %Y").to_string(),
    }
  }

  /// Records whose date falls inside the window
  pub fn filter<'a>(&self, records: &'a [AttendanceRecord]) -> Vec<&'a AttendanceRecord> {
    records
      .iter()
      .filter(|r| self.contains(from_nanos(r.date)))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_week_on_wednesday_spans_monday_to_sunday() {
    let window = TimeWindow::new(WindowKind::Week, date(2026, 10, 21));
    assert_eq!(window.start(), date(2026, 10, 19));
    assert_eq!(window.end(), date(2026, 10, 25));
  }

  #[test]
  fn test_week_on_sunday_belongs_to_preceding_monday() {
    let window = TimeWindow::new(WindowKind::Week, date(2026, 10, 25));
    assert_eq!(window.start(), date(2026, 10, 19));
  }

  #[test]
  fn test_month_bounds() {
    let window = TimeWindow::new(WindowKind::Month, date(2028, 2, 14));
    assert_eq!(window.start(), date(2028, 2, 1));
    assert_eq!(window.end(), date(2028, 2, 29));
  }

  #[test]
  fn test_labels() {
    let anchor = date(2026, 10, 19);
    assert_eq!(
      TimeWindow::new(WindowKind::Day, anchor).label(),
      "Monday, 19 October 2026"
    );
    assert_eq!(
      TimeWindow::new(WindowKind::Week, anchor).label(),
      "19 Oct - 25 Oct 2026"
    );
    assert_eq!(
      TimeWindow::new(WindowKind::Month, anchor).label(),
      "October 2026"
    );
  }

  #[test]
  fn test_navigation() {
    let day = TimeWindow::new(WindowKind::Day, date(2026, 3, 1));
    assert_eq!(day.previous().start(), date(2026, 2, 28));

    let month = TimeWindow::new(WindowKind::Month, date(2026, 1, 31));
    assert_eq!(month.next().start(), date(2026, 2, 1));
    assert_eq!(month.previous().start(), date(2025, 12, 1));

    let week = TimeWindow::new(WindowKind::Week, date(2026, 10, 21));
    assert_eq!(week.next().start(), date(2026, 10, 26));
  }

  #[test]
  fn test_filter_records_by_window() {
    let window = TimeWindow::new(WindowKind::Week, date(2026, 10, 21));
    let records = vec![
      AttendanceRecord {
        id: 1,
        date: to_nanos(date(2026, 10, 19)),
        ..AttendanceRecord::default()
      },
      AttendanceRecord {
        id: 2,
        date: to_nanos(date(2026, 10, 26)),
        ..AttendanceRecord::default()
      },
    ];

    let inside: Vec<u64> = window.filter(&records).iter().map(|r| r.id).collect();
    assert_eq!(inside, vec![1]);
  }
}
