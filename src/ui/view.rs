use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::backend::cache::QueryFamily;
use crate::backend::{BackendError, CachedBackend};
use crate::domain::export::{write_export, ExportKind};
use crate::domain::messages::{error_message, Operation};
use crate::domain::time::today;
use crate::event::{Event, Notice};
use crate::query::{FetchMode, Query};

/// When a shortcut should be shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutVisibility {
  #[default]
  Always, // Always shown
  WhenActive, // Only when component is active/focused
}

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub visibility: ShortcutVisibility,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      visibility: ShortcutVisibility::Always,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }

  pub const fn when_active(mut self) -> Self {
    self.visibility = ShortcutVisibility::WhenActive;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (forms, confirmations, pickers) and
/// return actions for the App to execute. This creates a clean delegation
/// chain: App → View → Components
///
/// Views that load data asynchronously should use Query<T> internally and
/// poll it in the tick() method.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// True while a modal (form, prompt, picker) owns the keyboard, so the
  /// App must not intercept `:` or `q`
  fn captures_input(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  /// Override this to provide view-specific shortcuts
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

/// Services every view needs, cloned into each one on creation
#[derive(Clone)]
pub struct ViewContext {
  pub backend: CachedBackend,
  events: mpsc::UnboundedSender<Event>,
  pub export_dir: PathBuf,
  /// Base URL invite links point at
  pub invite_base: String,
  /// Caller holds the admin role
  pub admin: bool,
}

impl ViewContext {
  pub fn new(
    backend: CachedBackend,
    events: mpsc::UnboundedSender<Event>,
    export_dir: PathBuf,
    invite_base: String,
  ) -> Self {
    Self {
      backend,
      events,
      export_dir,
      invite_base,
      admin: false,
    }
  }

  pub fn notify(&self, notice: Notice) {
    // The UI loop may already be gone on shutdown
    let _ = self.events.send(Event::Notice(notice));
  }

  /// Report a settled operation in the status line
  pub fn report<T>(&self, operation: Operation, result: &Result<T, String>) {
    match result {
      Ok(_) => self.notify(Notice::success(operation.success())),
      Err(message) => self.notify(Notice::error(message.clone())),
    }
  }

  /// Started read query, refetched when any of `families` is invalidated.
  /// A manual `refetch()` bypasses fresh cache entries.
  pub fn query<T, F, Fut>(&self, families: &[QueryFamily], fetch: F) -> Query<T>
  where
    T: Send + 'static,
    F: Fn(CachedBackend) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    let backend = self.backend.clone();
    let mut query = Query::with_mode(move |mode| {
      let backend = match mode {
        FetchMode::Cached => backend.clone(),
        FetchMode::Fresh => backend.fresh(),
      };
      let pending = fetch(backend);
      async move { pending.await.map_err(|e| e.to_string()) }
    })
    .watching(self.backend.cache().subscribe(), families);
    query.fetch();
    query
  }

  /// Started one-shot write; errors are already user-facing messages
  pub fn mutation<T, F, Fut>(&self, operation: Operation, call: F) -> Query<T>
  where
    T: Send + 'static,
    F: Fn(CachedBackend) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
  {
    let backend = self.backend.clone();
    let mut query = Query::new(move || {
      let pending = call(backend.clone());
      async move {
        pending.await.map_err(|e| {
          tracing::warn!(?operation, error = %e, "operation failed");
          error_message(operation, &e)
        })
      }
    });
    query.fetch();
    query
  }

  /// Fire-and-forget write reported through a notice
  pub fn run<Fut>(&self, operation: Operation, call: Fut)
  where
    Fut: Future<Output = Result<(), BackendError>> + Send + 'static,
  {
    let ctx = self.clone();
    tokio::spawn(async move {
      let result = call.await.map_err(|e| {
        tracing::warn!(?operation, error = %e, "operation failed");
        error_message(operation, &e)
      });
      ctx.report(operation, &result);
    });
  }

  /// Fetch a CSV report and write it into the export directory
  pub fn export<Fut>(&self, kind: ExportKind, operation: Operation, document: Fut)
  where
    Fut: Future<Output = Result<String, BackendError>> + Send + 'static,
  {
    let ctx = self.clone();
    tokio::spawn(async move {
      let notice = match document.await {
        Ok(document) => match write_export(&ctx.export_dir, kind, &document, today()) {
          Ok(summary) => Notice::success(format!(
            "{}: {} ({} rows, {})",
            operation.success(),
            summary.path.display(),
            summary.rows,
            summary.mime
          )),
          Err(e) => {
            tracing::error!(error = %e, "failed to write export");
            Notice::error(operation.failure())
          }
        },
        Err(e) => {
          tracing::warn!(?operation, error = %e, "export failed");
          Notice::error(error_message(operation, &e))
        }
      };
      ctx.notify(notice);
    });
  }
}

/// One-shot write tracked by a view until it settles
pub struct Submission<T> {
  operation: Operation,
  query: Option<Query<T>>,
}

impl<T: Clone + Send + 'static> Submission<T> {
  pub fn new(operation: Operation) -> Self {
    Self {
      operation,
      query: None,
    }
  }

  pub fn operation(&self) -> Operation {
    self.operation
  }

  pub fn is_pending(&self) -> bool {
    self.query.is_some()
  }

  pub fn start(&mut self, query: Query<T>) {
    self.query = Some(query);
  }

  /// Outcome once the write settles, exactly once
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let query = self.query.as_mut()?;
    query.poll();
    let outcome = match (query.data(), query.error()) {
      (Some(data), _) => Ok(data.clone()),
      (None, Some(error)) => Err(error.to_string()),
      (None, None) => return None,
    };
    self.query = None;
    Some(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::connection::Connection;
  use crate::backend::fake::FakeBackend;
  use crate::cache::QueryClient;
  use crate::event::NoticeLevel;
  use std::sync::Arc;
  use std::time::Duration;

  fn context(dir: PathBuf) -> (ViewContext, mpsc::UnboundedReceiver<Event>) {
    let backend = CachedBackend::new(Connection::new(), QueryClient::new(chrono::Duration::minutes(5)));
    let (tx, rx) = mpsc::unbounded_channel();
    (
      ViewContext::new(backend, tx, dir, "https://hr.example.com".to_string()),
      rx,
    )
  }

  async fn next_notice(rx: &mut mpsc::UnboundedReceiver<Event>) -> Notice {
    match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
      Ok(Some(Event::Notice(notice))) => notice,
      other => panic!("expected a notice, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_submission_while_disconnected() {
    let (ctx, _rx) = context(PathBuf::from("."));
    let mut submission = Submission::new(Operation::SubmitHoliday);
    submission.start(ctx.mutation(Operation::SubmitHoliday, |backend| async move {
      backend.submit_holiday_request(0, 0, "Trip".to_string()).await
    }));
    assert!(submission.is_pending());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
      submission.poll(),
      Some(Err("Not connected to the backend".to_string()))
    );
    assert!(!submission.is_pending());
    assert_eq!(submission.poll(), None);
  }

  #[tokio::test]
  async fn test_manual_refetch_reaches_backend() {
    let (ctx, _rx) = context(PathBuf::from("."));
    let fake = Arc::new(FakeBackend::new());
    ctx.backend.connect(fake.clone()).await.unwrap();

    let mut codes = ctx.query(&[QueryFamily::InviteCodes], |backend| async move {
      backend.invite_codes().await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    codes.poll();
    assert_eq!(codes.data().map(Vec::len), Some(0));

    fake.add_invite("OTHER1");
    codes.refetch();
    tokio::time::sleep(Duration::from_millis(20)).await;
    codes.poll();

    assert_eq!(codes.data().map(Vec::len), Some(1));
    assert_eq!(fake.calls("getInviteCodes"), 2);
  }

  #[tokio::test]
  async fn test_run_reports_success() {
    let (ctx, mut rx) = context(PathBuf::from("."));
    ctx.backend.connect(Arc::new(FakeBackend::new())).await.unwrap();

    let backend = ctx.backend.clone();
    ctx.run(Operation::GenerateInvite, async move {
      backend.generate_invite_code(None).await.map(|_| ())
    });

    let notice = next_notice(&mut rx).await;
    assert_eq!(notice, Notice::success("Invite code generated"));
  }

  #[tokio::test]
  async fn test_export_writes_file_and_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, mut rx) = context(dir.path().to_path_buf());
    ctx.backend.connect(Arc::new(FakeBackend::new())).await.unwrap();

    let backend = ctx.backend.clone();
    ctx.export(ExportKind::Attendance, Operation::ExportAttendance, async move {
      backend.export_attendance_csv().await
    });

    let notice = next_notice(&mut rx).await;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert!(notice.text.contains("attendance_"));
    assert!(notice.text.ends_with("text/csv;charset=utf-8)"));

    let written = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(written, 1);
  }

  #[tokio::test]
  async fn test_export_while_disconnected_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, mut rx) = context(dir.path().to_path_buf());

    let backend = ctx.backend.clone();
    ctx.export(ExportKind::Holidays, Operation::ExportHolidays, async move {
      backend.export_holiday_csv().await
    });

    let notice = next_notice(&mut rx).await;
    assert_eq!(notice, Notice::error("Not connected to the backend"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }
}
