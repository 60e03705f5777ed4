//! Admin approval queue, shared by holiday and permission requests.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::backend::cache::QueryFamily;
use crate::backend::types::{HolidayRequest, PermissionRequest, RequestStatus};
use crate::backend::{BackendError, CachedBackend};
use crate::domain::export::ExportKind;
use crate::domain::messages::Operation;
use crate::domain::requests::{count_statuses, filter_requests, Request, RequestFilter};
use crate::domain::time::{days_between, format_range};
use crate::query::{Query, QueryState};
use crate::ui::components::{Confirm, KeyResult, NameResolver};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{request_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::permissions::permission_label;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// A request kind an admin can approve or reject
pub trait Approvable: Request + Clone + Send + Sync + 'static {
  const TITLE: &'static str;
  const FAMILY: QueryFamily;
  const EXPORT: ExportKind;
  const APPROVE: Operation;
  const REJECT: Operation;
  const EXPORT_OPERATION: Operation;

  fn fetch_all(backend: CachedBackend) -> BoxFuture<'static, Result<Vec<Self>, BackendError>>;
  fn approve(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>>;
  fn reject(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>>;
  fn export(backend: CachedBackend) -> BoxFuture<'static, Result<String, BackendError>>;

  /// Extra column, e.g. the permission type
  fn detail(&self) -> Option<&str> {
    None
  }
}

impl Approvable for HolidayRequest {
  const TITLE: &'static str = "Holiday approvals";
  const FAMILY: QueryFamily = QueryFamily::AllHolidayRequests;
  const EXPORT: ExportKind = ExportKind::Holidays;
  const APPROVE: Operation = Operation::ApproveHoliday;
  const REJECT: Operation = Operation::RejectHoliday;
  const EXPORT_OPERATION: Operation = Operation::ExportHolidays;

  fn fetch_all(backend: CachedBackend) -> BoxFuture<'static, Result<Vec<Self>, BackendError>> {
    async move { backend.all_holiday_requests().await }.boxed()
  }

  fn approve(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>> {
    async move { backend.approve_holiday_request(id).await }.boxed()
  }

  fn reject(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>> {
    async move { backend.reject_holiday_request(id).await }.boxed()
  }

  fn export(backend: CachedBackend) -> BoxFuture<'static, Result<String, BackendError>> {
    async move { backend.export_holiday_csv().await }.boxed()
  }
}

impl Approvable for PermissionRequest {
  const TITLE: &'static str = "Permission approvals";
  const FAMILY: QueryFamily = QueryFamily::AllPermissionRequests;
  const EXPORT: ExportKind = ExportKind::Permissions;
  const APPROVE: Operation = Operation::ApprovePermission;
  const REJECT: Operation = Operation::RejectPermission;
  const EXPORT_OPERATION: Operation = Operation::ExportPermissions;

  fn fetch_all(backend: CachedBackend) -> BoxFuture<'static, Result<Vec<Self>, BackendError>> {
    async move { backend.all_permission_requests().await }.boxed()
  }

  fn approve(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>> {
    async move { backend.approve_permission_request(id).await }.boxed()
  }

  fn reject(backend: CachedBackend, id: u64) -> BoxFuture<'static, Result<(), BackendError>> {
    async move { backend.reject_permission_request(id).await }.boxed()
  }

  fn export(backend: CachedBackend) -> BoxFuture<'static, Result<String, BackendError>> {
    async move { backend.export_permission_csv().await }.boxed()
  }

  fn detail(&self) -> Option<&str> {
    Some(permission_label(&self.request_type))
  }
}

pub struct ApprovalsView<R: Approvable> {
  ctx: ViewContext,
  requests: Query<Vec<R>>,
  names: NameResolver,
  filter: RequestFilter,
  list_state: ListState,
  confirm: Confirm,
  pending_reject: Option<u64>,
}

impl<R: Approvable> ApprovalsView<R> {
  pub fn new(ctx: ViewContext) -> Self {
    let requests = ctx.query(&[R::FAMILY], R::fetch_all);
    let names = NameResolver::new(ctx.backend.clone());

    Self {
      ctx,
      requests,
      names,
      filter: RequestFilter::Pending,
      list_state: ListState::default(),
      confirm: Confirm::new(),
      pending_reject: None,
    }
  }

  fn all(&self) -> &[R] {
    self.requests.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn visible(&self) -> Vec<&R> {
    let mut rows = filter_requests(self.all(), self.filter);
    rows.sort_by_key(|r| std::cmp::Reverse(r.start_date()));
    rows
  }

  /// Selected request, only while it can still be decided
  fn selected_pending(&self) -> Option<(u64, String)> {
    let index = self.list_state.selected()?;
    let request = *self.visible().get(index)?;
    (*request.status() == RequestStatus::Pending).then(|| (request.id(), self.names.name(request.user())))
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let counts = count_statuses(self.all());
    let mut spans = vec![
      Span::styled("Pending: ", Style::default().fg(Color::DarkGray)),
      Span::styled(counts.pending.to_string(), Style::default().fg(Color::Yellow)),
      Span::raw("   "),
      Span::styled("Approved: ", Style::default().fg(Color::DarkGray)),
      Span::styled(counts.approved.to_string(), Style::default().fg(Color::Green)),
      Span::raw("   "),
      Span::styled("Rejected: ", Style::default().fg(Color::DarkGray)),
      Span::styled(counts.rejected.to_string(), Style::default().fg(Color::Red)),
      Span::raw("   "),
    ];
    for filter in RequestFilter::ALL {
      let style = if *filter == self.filter {
        Style::default().fg(Color::Black).bg(Color::Cyan)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      spans.push(Span::styled(format!(" {} ", filter.label()), style));
      spans.push(Span::raw(" "));
    }

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta))
      .title(format!(" {} ", R::TITLE));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows: Vec<ListItem> = self
      .visible()
      .into_iter()
      .map(|request| {
        let mut spans = vec![
          Span::styled(
            format!("{:<20}", truncate(&self.names.name(request.user()), 18)),
            Style::default().fg(Color::Yellow),
          ),
          Span::styled(
            format!("{:<28}", format_range(request.start_date(), request.end_date())),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!(
            "{:>3}d  ",
            days_between(request.start_date(), request.end_date())
          )),
        ];
        if let Some(detail) = request.detail() {
          spans.push(Span::raw(format!("{:<18}", detail)));
        }
        spans.push(Span::styled(
          format!("{:<10}", request.status().as_str()),
          Style::default().fg(request_color(request.status())),
        ));
        spans.push(Span::raw(truncate(request.reason(), 40)));
        ListItem::new(Line::from(spans))
      })
      .collect();
    let len = rows.len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.requests.state() {
      QueryState::Loading => " Requests (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Requests (error: {}) ", e),
      _ => format!(" {} requests ({}) ", self.filter.label(), len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.requests.is_loading() {
      let content = if self.requests.is_error() {
        "Failed to load requests. Press 'r' to retry."
      } else {
        "Nothing to show."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let list = List::new(rows)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl<R: Approvable> View for ApprovalsView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(true) => {
        if let Some(id) = self.pending_reject.take() {
          self.ctx.run(R::REJECT, R::reject(self.ctx.backend.clone(), id));
        }
        return ViewAction::None;
      }
      KeyResult::Event(false) => {
        self.pending_reject = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('f') | KeyCode::Tab => {
        self.filter = self.filter.cycle();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('a') => {
        if let Some((id, _)) = self.selected_pending() {
          self.ctx.run(R::APPROVE, R::approve(self.ctx.backend.clone(), id));
        }
      }
      KeyCode::Char('x') => {
        if let Some((id, name)) = self.selected_pending() {
          self.pending_reject = Some(id);
          self.confirm.ask(format!("Reject the request of {}?", name));
        }
      }
      KeyCode::Char('e') => {
        self
          .ctx
          .export(R::EXPORT, R::EXPORT_OPERATION, R::export(self.ctx.backend.clone()));
      }
      KeyCode::Char('r') => self.requests.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(1)])
      .split(area);

    self.render_summary(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::TITLE.to_string()
  }

  fn tick(&mut self) {
    self.requests.poll();
    let users: Vec<_> = self.all().iter().map(|r| r.user().clone()).collect();
    self.names.request(&users);
    self.names.poll();
  }

  fn captures_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "approve").with_priority(20),
      ShortcutInfo::new("x", "reject").with_priority(30),
      ShortcutInfo::new("f", "filter").with_priority(40),
      ShortcutInfo::new("e", "export csv").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
