/// Schema for local client state
pub const SCHEMA: &str = r#"
-- Key/value settings persisted across sessions
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
