//! Packaging of backend-generated CSV reports.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};

/// Content type of every exported report
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
  Attendance,
  Holidays,
  Permissions,
}

impl ExportKind {
  pub fn prefix(&self) -> &'static str {
    match self {
      ExportKind::Attendance => "attendance",
      ExportKind::Holidays => "holidays",
      ExportKind::Permissions => "permissions",
    }
  }

  /// File name for a report produced on `date`
  pub fn file_name(&self, date: NaiveDate) -> String {
    format!("{}_{}.csv", self.prefix(), date.format("%Y-%m-%d"))
  }
}

/// A report written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
  pub path: PathBuf,
  /// Data rows, excluding the header
  pub rows: usize,
  pub mime: &'static str,
}

/// Number of data rows in a CSV document with a header line
pub fn count_rows(document: &str) -> Result<usize> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_reader(document.as_bytes());

  let mut rows = 0;
  for record in reader.records() {
    record.map_err(|e| eyre!("Failed to parse exported CSV: {}", e))?;
    rows += 1;
  }
  Ok(rows)
}

/// Write the document verbatim into `dir`
pub fn write_export(
  dir: &Path,
  kind: ExportKind,
  document: &str,
  date: NaiveDate,
) -> Result<ExportSummary> {
  let rows = count_rows(document)?;

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create export directory {}: {}", dir.display(), e))?;

  let path = dir.join(kind.file_name(date));
  std::fs::write(&path, document)
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

  tracing::info!(path = %path.display(), rows, mime = CSV_MIME, "exported report");
  Ok(ExportSummary {
    path,
    rows,
    mime: CSV_MIME,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
  }

  #[test]
  fn test_file_names() {
    assert_eq!(
      ExportKind::Attendance.file_name(date()),
      "attendance_2026-10-19.csv"
    );
    assert_eq!(ExportKind::Holidays.file_name(date()), "holidays_2026-10-19.csv");
    assert_eq!(
      ExportKind::Permissions.file_name(date()),
      "permissions_2026-10-19.csv"
    );
  }

  #[test]
  fn test_count_rows_handles_quoted_newlines() {
    let document = "name,notes\nAda,\"line one\nline two\"\nGrace,ok\n";
    assert_eq!(count_rows(document).unwrap(), 2);
    assert_eq!(count_rows("name,notes\n").unwrap(), 0);
  }

  #[test]
  fn test_write_export() {
    let dir = tempfile::tempdir().unwrap();
    let document = "id,status\n1,approved\n2,pending\n";

    let summary = write_export(dir.path(), ExportKind::Holidays, document, date()).unwrap();

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.mime, "text/csv;charset=utf-8");
    assert_eq!(summary.path, dir.path().join("holidays_2026-10-19.csv"));
    assert_eq!(std::fs::read_to_string(&summary.path).unwrap(), document);
  }

  #[test]
  fn test_write_export_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("reports").join("2026");

    let summary = write_export(&nested, ExportKind::Attendance, "a\n1\n", date()).unwrap();

    assert!(summary.path.exists());
  }
}
