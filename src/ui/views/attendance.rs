use crate::backend::cache::QueryFamily;
use crate::backend::types::{ActivityKind, AttendanceRecord, AttendanceStatus};
use crate::domain::hours::total_hours;
use crate::domain::messages::Operation;
use crate::domain::time::{format_date, today};
use crate::domain::validation::AttendanceDraft;
use crate::domain::window::{TimeWindow, WindowKind};
use crate::query::{Query, QueryState};
use crate::ui::components::{Confirm, Form, FormEvent, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{attendance_color, attendance_label, truncate};
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

// Form field positions
const DATE: usize = 0;
const STATUS: usize = 1;
const ACTIVITY: usize = 2;
const DETAIL: usize = 3;
const START: usize = 4;
const END: usize = 5;
const BREAK: usize = 6;
const NOTES: usize = 7;

/// The caller's attendance records in a day/week/month window
pub struct AttendanceView {
  ctx: ViewContext,
  window: TimeWindow,
  records: Query<Vec<AttendanceRecord>>,
  server_total: Query<u64>,
  list_state: ListState,
  form: Form,
  /// Record being edited, `None` when creating
  editing: Option<u64>,
  confirm: Confirm,
  pending_delete: Option<u64>,
  submit: Submission<()>,
}

impl AttendanceView {
  pub fn new(ctx: ViewContext) -> Self {
    let window = TimeWindow::current(WindowKind::Week);
    let records = ctx.query(&[QueryFamily::MyAttendanceRecords], |backend| async move {
      backend.my_attendance_records().await
    });
    let server_total = Self::total_query(&ctx, &window);

    Self {
      ctx,
      window,
      records,
      server_total,
      list_state: ListState::default(),
      form: Form::default(),
      editing: None,
      confirm: Confirm::new(),
      pending_delete: None,
      submit: Submission::new(Operation::RecordAttendance),
    }
  }

  fn total_query(ctx: &ViewContext, window: &TimeWindow) -> Query<u64> {
    let (start, end) = window.bounds();
    ctx.query(&[QueryFamily::TotalHours], move |backend| async move {
      backend.total_hours(start, end).await
    })
  }

  fn set_window(&mut self, window: TimeWindow) {
    self.window = window;
    self.server_total = Self::total_query(&self.ctx, &self.window);
    self.list_state.select(Some(0));
  }

  /// Records inside the window, newest first
  fn visible(&self) -> Vec<&AttendanceRecord> {
    let records = self.records.data().map(|v| v.as_slice()).unwrap_or(&[]);
    let mut visible = self.window.filter(records);
    visible.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    visible
  }

  fn selected(&self) -> Option<&AttendanceRecord> {
    let index = self.list_state.selected()?;
    self.visible().get(index).copied()
  }

  fn open_form(&mut self, record: Option<&AttendanceRecord>) {
    let draft = match record {
      Some(record) => AttendanceDraft::from_record(record),
      None => AttendanceDraft {
        date: today().format("%Y-%m-%d").to_string(),
        activity: Some(ActivityKind::Project),
        ..AttendanceDraft::default()
      },
    };
    self.editing = record.map(|r| r.id);

    let status = AttendanceStatus::ALL
      .iter()
      .position(|s| *s == draft.status)
      .unwrap_or(0);
    let activity = draft
      .activity
      .and_then(|kind| ActivityKind::ALL.iter().position(|k| *k == kind))
      .unwrap_or(0);
    let title = if self.editing.is_some() {
      "Edit attendance"
    } else {
      "Record attendance"
    };

    self.form = Form::new(title)
      .text_with_hint("Date", "YYYY-MM-DD", draft.date)
      .choice("Status", AttendanceStatus::ALL.iter().map(attendance_label), status)
      .choice("Activity", ActivityKind::ALL.iter().map(|k| k.label()), activity)
      .text_with_hint("Description", "not needed for weekend/workshops", draft.activity_value)
      .text_with_hint("Start", "HH:MM", draft.start_time)
      .text_with_hint("End", "HH:MM", draft.end_time)
      .text_with_hint("Break", "minutes", draft.break_duration)
      .text("Notes", draft.notes);
    self.form.open();
  }

  fn draft(&self) -> AttendanceDraft {
    AttendanceDraft {
      date: self.form.value(DATE).to_string(),
      status: AttendanceStatus::ALL
        .get(self.form.selected(STATUS))
        .cloned()
        .unwrap_or_default(),
      activity: ActivityKind::ALL.get(self.form.selected(ACTIVITY)).copied(),
      activity_value: self.form.value(DETAIL).to_string(),
      start_time: self.form.value(START).to_string(),
      end_time: self.form.value(END).to_string(),
      break_duration: self.form.value(BREAK).to_string(),
      notes: self.form.value(NOTES).to_string(),
    }
  }

  fn submit_form(&mut self) {
    let record = match self.draft().validate(self.editing.unwrap_or(0)) {
      Ok(record) => record,
      Err(e) => {
        self.form.set_error(e.to_string());
        return;
      }
    };

    self.form.set_busy();
    let query = match self.editing {
      Some(id) => {
        self.submit = Submission::new(Operation::UpdateAttendance);
        self.ctx.mutation(Operation::UpdateAttendance, move |backend| {
          let record = record.clone();
          async move { backend.update_attendance(id, record).await }
        })
      }
      None => {
        self.submit = Submission::new(Operation::RecordAttendance);
        self.ctx.mutation(Operation::RecordAttendance, move |backend| {
          let record = record.clone();
          async move { backend.record_attendance(record).await }
        })
      }
    };
    self.submit.start(query);
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let visible = self.visible();
    let server = match self.server_total.data() {
      Some(hours) => format!("{} h", hours),
      None => "-".to_string(),
    };

    let kinds = [WindowKind::Day, WindowKind::Week, WindowKind::Month];
    let mut tabs = Vec::new();
    for kind in kinds {
      let style = if kind == self.window.kind {
        Style::default().fg(Color::Black).bg(Color::Cyan)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      tabs.push(Span::styled(format!(" {} ", kind.label()), style));
      tabs.push(Span::raw(" "));
    }

    let lines = vec![
      Line::from(tabs),
      Line::from(vec![
        Span::styled(self.window.label(), Style::default().fg(Color::White).bold()),
        Span::raw("   "),
        Span::styled("Records: ", Style::default().fg(Color::DarkGray)),
        Span::raw(visible.len().to_string()),
        Span::raw("   "),
        Span::styled("Hours: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          format!("{} h", total_hours(visible.iter().copied())),
          Style::default().fg(Color::Green),
        ),
        Span::styled(format!("  (server {})", server), Style::default().fg(Color::DarkGray)),
      ]),
    ];

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(" My attendance ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.records.state() {
      QueryState::Loading => " Records (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Records (error: {}) ", e),
      _ => format!(" Records ({}) ", len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.records.is_loading() {
      let content = if self.records.is_error() {
        "Failed to load records. Press 'r' to retry."
      } else {
        "No records in this period. Press 'n' to record attendance."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .visible()
      .into_iter()
      .map(|record| {
        let clock = match (&record.start_time, &record.end_time) {
          (Some(start), Some(end)) => format!("{}-{}", start, end),
          _ => String::new(),
        };
        let activity = match record.activity.kind() {
          Some(kind) if kind.needs_value() => format!("{}: {}", kind.label(), record.activity.value()),
          Some(kind) => kind.label().to_string(),
          None => "?".to_string(),
        };
        let line = Line::from(vec![
          Span::styled(format!("{:<12}", format_date(record.date)), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<14}", attendance_label(&record.status)),
            Style::default().fg(attendance_color(&record.status)),
          ),
          Span::raw(format!("{:<28}", truncate(&activity, 26))),
          Span::styled(format!("{:<12}", clock), Style::default().fg(Color::White)),
          Span::styled(
            format!("{:>4} h  ", record.hours_worked.unwrap_or(0)),
            Style::default().fg(Color::Green),
          ),
          Span::styled(
            truncate(record.notes.as_deref().unwrap_or(""), 30),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => {
        self.submit_form();
        return Some(ViewAction::None);
      }
      KeyResult::Event(FormEvent::Cancelled) | KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(true) => {
        if let Some(id) = self.pending_delete.take() {
          let backend = self.ctx.backend.clone();
          self
            .ctx
            .run(Operation::DeleteAttendance, async move { backend.delete_attendance(id).await });
        }
        Some(ViewAction::None)
      }
      KeyResult::Event(false) => {
        self.pending_delete = None;
        Some(ViewAction::None)
      }
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let window = match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        return Some(ViewAction::None);
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        return Some(ViewAction::None);
      }
      KeyCode::Char('d') => self.window.with_kind(WindowKind::Day),
      KeyCode::Char('w') => self.window.with_kind(WindowKind::Week),
      KeyCode::Char('m') => self.window.with_kind(WindowKind::Month),
      KeyCode::Left | KeyCode::Char('h') => self.window.previous(),
      KeyCode::Right | KeyCode::Char('l') => self.window.next(),
      KeyCode::Char('t') => self.window.today(),
      _ => return None,
    };
    self.set_window(window);
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.records.refetch();
        self.server_total.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('n') => {
        self.open_form(None);
        Some(ViewAction::None)
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        let record = self.selected().cloned();
        if let Some(record) = record {
          self.open_form(Some(&record));
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('x') => {
        let target = self.selected().map(|r| (r.id, format_date(r.date)));
        if let Some((id, date)) = target {
          self.pending_delete = Some(id);
          self.confirm.ask(format!("Delete the record of {}?", date));
        }
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for AttendanceView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(4), Constraint::Min(1)])
      .split(area);

    self.render_summary(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.form.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Attendance".to_string()
  }

  fn tick(&mut self) {
    self.records.poll();
    self.server_total.poll();
    if let Some(result) = self.submit.poll() {
      match &result {
        Ok(()) => self.form.close(),
        Err(message) => self.form.set_error(message.clone()),
      }
      self.ctx.report(self.submit.operation(), &result);
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n", "record").with_priority(20),
      ShortcutInfo::new("e", "edit").with_priority(30),
      ShortcutInfo::new("x", "delete").with_priority(40),
      ShortcutInfo::new("d/w/m", "period").with_priority(50),
      ShortcutInfo::new("←/→", "move").with_priority(60),
      ShortcutInfo::new("t", "today").with_priority(70),
      ShortcutInfo::new("Esc", "close").when_active(),
    ]
  }
}
