use crate::backend::cache::QueryFamily;
use crate::backend::types::{HolidayRequest, UserProfile};
use crate::domain::messages::Operation;
use crate::domain::requests::{count_statuses, in_month};
use crate::domain::time::{days_between, format_range, today};
use crate::domain::validation::validate_request;
use crate::domain::window::{TimeWindow, WindowKind};
use crate::query::{Query, QueryState};
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{request_color, truncate};
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// The caller's holiday requests, one month at a time
pub struct HolidaysView {
  ctx: ViewContext,
  month: TimeWindow,
  profile: Query<Option<UserProfile>>,
  requests: Query<Vec<HolidayRequest>>,
  list_state: ListState,
  form: Form,
  submit: Submission<u64>,
}

impl HolidaysView {
  pub fn new(ctx: ViewContext) -> Self {
    let profile = ctx.query(&[QueryFamily::CurrentUserProfile], |backend| async move {
      backend.current_user_profile().await
    });
    let requests = ctx.query(&[QueryFamily::MyHolidayRequests], |backend| async move {
      backend.my_holiday_requests().await
    });

    Self {
      ctx,
      month: TimeWindow::current(WindowKind::Month),
      profile,
      requests,
      list_state: ListState::default(),
      form: Form::default(),
      submit: Submission::new(Operation::SubmitHoliday),
    }
  }

  fn all(&self) -> &[HolidayRequest] {
    self.requests.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn open_form(&mut self) {
    let day = today().format("%Y-%m-%d").to_string();
    self.form = Form::new("Request holidays")
      .text_with_hint("Start date", "YYYY-MM-DD", day.clone())
      .text_with_hint("End date", "YYYY-MM-DD", day)
      .text("Reason", "");
    self.form.open();
  }

  fn submit_form(&mut self) {
    let draft = match validate_request(self.form.value(0), self.form.value(1), self.form.value(2)) {
      Ok(draft) => draft,
      Err(e) => {
        self.form.set_error(e.to_string());
        return;
      }
    };

    self.form.set_busy();
    self.submit.start(self.ctx.mutation(Operation::SubmitHoliday, move |backend| {
      let draft = draft.clone();
      async move {
        backend
          .submit_holiday_request(draft.start, draft.end, draft.reason)
          .await
      }
    }));
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let balance = match self.profile.data() {
      Some(Some(profile)) => format!("{} days", profile.holiday_balance),
      _ => "-".to_string(),
    };
    let counts = count_statuses(self.all());

    let line = Line::from(vec![
      Span::styled("Balance: ", Style::default().fg(Color::DarkGray)),
      Span::styled(balance, Style::default().fg(Color::Green).bold()),
      Span::raw("   "),
      Span::styled("Pending: ", Style::default().fg(Color::DarkGray)),
      Span::styled(counts.pending.to_string(), Style::default().fg(Color::Yellow)),
      Span::raw("   "),
      Span::styled("Month: ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.month.label(), Style::default().fg(Color::White).bold()),
    ]);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(" My holidays ");
    frame.render_widget(Paragraph::new(line).block(block), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let rows: Vec<ListItem> = in_month(self.all(), &self.month)
      .into_iter()
      .map(|request| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<28}", format_range(request.start_date, request.end_date)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:>3}d  ", days_between(request.start_date, request.end_date))),
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
      _ => format!(" Requests this month ({}) ", len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.requests.is_loading() {
      let paragraph = Paragraph::new("No holiday requests this month. Press 'n' to request holidays.")
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

impl View for HolidaysView {
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
      KeyCode::Left | KeyCode::Char('h') => self.month = self.month.previous(),
      KeyCode::Right | KeyCode::Char('l') => self.month = self.month.next(),
      KeyCode::Char('t') => self.month = self.month.today(),
      KeyCode::Char('n') => self.open_form(),
      KeyCode::Char('r') => {
        self.profile.refetch();
        self.requests.refetch();
      }
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
    "Holidays".to_string()
  }

  fn tick(&mut self) {
    self.profile.poll();
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
      ShortcutInfo::new("←/→", "month").with_priority(30),
      ShortcutInfo::new("t", "this month").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ]
  }
}
