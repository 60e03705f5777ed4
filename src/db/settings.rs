use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::Database;

const VIEW_MODE_KEY: &str = "dashboard.view_mode";

/// Which dashboard the caller sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardMode {
  #[default]
  Personal,
  Admin,
}

impl DashboardMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      DashboardMode::Personal => "personal",
      DashboardMode::Admin => "admin",
    }
  }

  /// Parse a stored value; anything unrecognized is `Personal`
  pub fn parse(value: &str) -> Self {
    match value {
      "admin" => DashboardMode::Admin,
      _ => DashboardMode::Personal,
    }
  }

  pub fn toggled(&self) -> Self {
    match self {
      DashboardMode::Personal => DashboardMode::Admin,
      DashboardMode::Admin => DashboardMode::Personal,
    }
  }
}

/// Persisted user settings backed by the `settings` table.
pub struct SettingsStore {
  db: Database,
}

impl SettingsStore {
  pub fn new(db: Database) -> Self {
    Self { db }
  }

  pub fn get(&self, key: &str) -> Result<Option<String>> {
    self
      .db
      .conn()
      .query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read setting {}: {}", key, e))
  }

  pub fn set(&self, key: &str, value: &str) -> Result<()> {
    self
      .db
      .conn()
      .execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to save setting {}: {}", key, e))?;
    Ok(())
  }

  /// Stored dashboard mode, `Personal` when unset
  pub fn view_mode(&self) -> Result<DashboardMode> {
    Ok(
      self
        .get(VIEW_MODE_KEY)?
        .map(|v| DashboardMode::parse(&v))
        .unwrap_or_default(),
    )
  }

  pub fn set_view_mode(&self, mode: DashboardMode) -> Result<()> {
    self.set(VIEW_MODE_KEY, mode.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> SettingsStore {
    SettingsStore::new(Database::open_in_memory().unwrap())
  }

  #[test]
  fn test_view_mode_defaults_to_personal() {
    assert_eq!(store().view_mode().unwrap(), DashboardMode::Personal);
  }

  #[test]
  fn test_unrecognized_value_is_personal() {
    let store = store();
    store.set(VIEW_MODE_KEY, "supervisor").unwrap();
    assert_eq!(store.view_mode().unwrap(), DashboardMode::Personal);
  }

  #[test]
  fn test_set_overwrites() {
    let store = store();
    store.set("k", "one").unwrap();
    store.set("k", "two").unwrap();
    assert_eq!(store.get("k").unwrap(), Some("two".to_string()));
    assert_eq!(store.get("missing").unwrap(), None);
  }

  #[test]
  fn test_view_mode_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
      let store = SettingsStore::new(Database::open(&path).unwrap());
      store.set_view_mode(DashboardMode::Admin).unwrap();
    }

    let reopened = SettingsStore::new(Database::open(&path).unwrap());
    assert_eq!(reopened.view_mode().unwrap(), DashboardMode::Admin);
  }
}
