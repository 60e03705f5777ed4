use crate::backend::cache::QueryFamily;
use crate::backend::types::{PermissionRequest, PermissionType};
use crate::domain::messages::Operation;
use crate::domain::requests::{count_statuses, filter_requests, RequestFilter};
use crate::domain::time::{format_range, today};
use crate::domain::validation::validate_request;
use crate::query::{Query, QueryState};
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{request_color, truncate};
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub(crate) fn permission_label(kind: &PermissionType) -> &str {
  match kind {
    PermissionType::Generic => "Generic",
    PermissionType::FamilyEmergency => "Family emergency",
    PermissionType::Medical => "Medical",
    PermissionType::Unknown(tag) => tag,
  }
}

/// The caller's permission requests
pub struct PermissionsView {
  ctx: ViewContext,
  requests: Query<Vec<PermissionRequest>>,
  filter: RequestFilter,
  list_state: ListState,
  form: Form,
  submit: Submission<u64>,
}

impl PermissionsView {
  pub fn new(ctx: ViewContext) -> Self {
    let requests = ctx.query(&[QueryFamily::MyPermissionRequests], |backend| async move {
      backend.my_permission_requests().await
    });

    Self {
      ctx,
      requests,
      filter: RequestFilter::All,
      list_state: ListState::default(),
      form: Form::default(),
      submit: Submission::new(Operation::SubmitPermission),
    }
  }

  fn all(&self) -> &[PermissionRequest] {
    self.requests.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn open_form(&mut self) {
    let day = today().format("%Y-%m-%d").to_string();
    self.form = Form::new("Request permission")
      .choice("Type", PermissionType::ALL.iter().map(permission_label), 0)
      .text_with_hint("Start date", "YYYY-MM-DD", day.clone())
      .text_with_hint("End date", "YYYY-MM-DD", day)
      .text("Reason", "");
    self.form.open();
  }

  fn submit_form(&mut self) {
    let draft = match validate_request(self.form.value(1), self.form.value(2), self.form.value(3)) {
      Ok(draft) => draft,
      Err(e) => {
        self.form.set_error(e.to_string());
        return;
      }
    };
    let kind = PermissionType::ALL
      .get(self.form.selected(0))
      .cloned()
      .unwrap_or_default();

    self.form.set_busy();
    self.submit.start(self.ctx.mutation(Operation::SubmitPermission, move |backend| {
      let draft = draft.clone();
      let kind = kind.clone();
      async move {
        backend
          .submit_permission_request(draft.start, draft.end, draft.reason, kind)
          .await
      }
    }));
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
      .border_style(Style::default().fg(Color::Blue))
      .title(" My permissions ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows: Vec<ListItem> = filter_requests(self.all(), self.filter)
      .into_iter()
      .map(|request| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<28}", format_range(request.start_date, request.end_date)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<18}", permission_label(&request.request_type))),
          Span::styled(
            format!("{:<10}", request.status.as_str()),
            Style::default().fg(request_color(&request.status)),
          ),
          Span::raw(truncate(&request.reason, 50)),
        ]))
      })
      .collect();
    let len = rows.len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.requests.state() {
      QueryState::Loading => " Requests (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Requests (error: {}) ", e),
      _ => format!(" Requests ({}) ", len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.requests.is_loading() {
      let paragraph = Paragraph::new("No permission requests. Press 'n' to request one.")
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

impl View for PermissionsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => {
        self.submit_form();
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('f') | KeyCode::Tab => {
        self.filter = self.filter.cycle();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('n') => self.open_form(),
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
    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Permissions".to_string()
  }

  fn tick(&mut self) {
    self.requests.poll();
    if let Some(result) = self.submit.poll() {
      match &result {
        Ok(_) => self.form.close(),
        Err(message) => self.form.set_error(message.clone()),
      }
      self.ctx.report(self.submit.operation(), &result);
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n", "request").with_priority(20),
      ShortcutInfo::new("f", "filter").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
    ]
  }
}
