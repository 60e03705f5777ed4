use crate::backend::cache::QueryFamily;
use crate::backend::types::{AttendanceModification, AttendanceRecord, Principal, UserProfile, UserRole};
use crate::domain::hours::total_hours;
use crate::domain::messages::Operation;
use crate::domain::time::{format_date, format_timestamp};
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, Picker, PickerEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{attendance_color, attendance_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::history::{describe_change, modification_color};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
  Records,
  Changes,
}

/// Admin view of a single team member
pub struct UserDetailView {
  ctx: ViewContext,
  user: Principal,
  profile: Query<Option<UserProfile>>,
  records: Query<Vec<AttendanceRecord>>,
  changes: Query<Vec<AttendanceModification>>,
  pane: Pane,
  list_state: ListState,
  role_picker: Picker,
}

impl UserDetailView {
  pub fn new(ctx: ViewContext, user: Principal) -> Self {
    let profile = {
      let user = user.clone();
      ctx.query(&[QueryFamily::UserProfile], move |backend| {
        let user = user.clone();
        async move { backend.user_profile(&user).await }
      })
    };
    let records = {
      let user = user.clone();
      ctx.query(&[QueryFamily::UserAttendanceRecords], move |backend| {
        let user = user.clone();
        async move { backend.user_attendance_records(&user).await }
      })
    };
    let changes = {
      let user = user.clone();
      ctx.query(&[QueryFamily::UserAttendanceModifications], move |backend| {
        let user = user.clone();
        async move { backend.user_attendance_modifications(&user).await }
      })
    };

    Self {
      ctx,
      user,
      profile,
      records,
      changes,
      pane: Pane::Records,
      list_state: ListState::default(),
      role_picker: Picker::new(),
    }
  }

  fn display_name(&self) -> String {
    match self.profile.data() {
      Some(Some(profile)) if !profile.name.trim().is_empty() => profile.name.clone(),
      _ => self.user.short(),
    }
  }

  fn assign_role(&mut self, role: UserRole) {
    let backend = self.ctx.backend.clone();
    let user = self.user.clone();
    self
      .ctx
      .run(Operation::AssignRole, async move { backend.assign_role(user, role).await });
  }

  fn render_profile(&self, frame: &mut Frame, area: Rect) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let records = self.records.data().map(|v| v.as_slice()).unwrap_or(&[]);

    let lines = match self.profile.state() {
      QueryState::Loading | QueryState::Idle => vec![Line::from("Loading profile...")],
      QueryState::Error(e) => vec![Line::from(Span::styled(
        format!("Failed to load profile: {}", e),
        Style::default().fg(Color::Red),
      ))],
      QueryState::Success(None) => vec![
        Line::from(vec![label("Principal: "), Span::raw(self.user.as_str().to_string())]),
        Line::from(Span::styled("No profile yet", Style::default().fg(Color::Yellow))),
      ],
      QueryState::Success(Some(profile)) => vec![
        Line::from(vec![
          label("Name: "),
          Span::styled(profile.name.clone(), Style::default().fg(Color::White).bold()),
          Span::raw("   "),
          label("Position: "),
          Span::raw(profile.position.clone()),
          Span::raw("   "),
          label("Contract: "),
          Span::raw(if profile.is_employee { "employee" } else { "collaborator" }),
        ]),
        Line::from(vec![
          label("Holiday balance: "),
          Span::styled(format!("{} days", profile.holiday_balance), Style::default().fg(Color::Green)),
          Span::raw("   "),
          label("Records: "),
          Span::raw(records.len().to_string()),
          Span::raw("   "),
          label("Hours: "),
          Span::styled(format!("{} h", total_hours(records)), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![label("Principal: "), Span::raw(self.user.as_str().to_string())]),
      ],
    };

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta))
      .title(format!(" {} ", self.display_name()));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
  }

  fn record_items(&self) -> Vec<ListItem<'static>> {
    let mut records: Vec<&AttendanceRecord> = self.records.data().into_iter().flatten().collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));
    records
      .into_iter()
      .map(|record| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<12}", format_date(record.date)), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<14}", attendance_label(&record.status)),
            Style::default().fg(attendance_color(&record.status)),
          ),
          Span::styled(
            format!("{:>4} h  ", record.hours_worked.unwrap_or(0)),
            Style::default().fg(Color::Green),
          ),
          Span::styled(
            truncate(record.notes.as_deref().unwrap_or(""), 40),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect()
  }

  fn change_items(&self) -> Vec<ListItem<'static>> {
    let mut changes: Vec<&AttendanceModification> = self.changes.data().into_iter().flatten().collect();
    changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    changes
      .into_iter()
      .map(|change| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<20}", format_timestamp(change.timestamp)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<9}", change.modification_type.as_str()),
            Style::default().fg(modification_color(&change.modification_type)),
          ),
          Span::raw(truncate(&describe_change(change), 60)),
        ]))
      })
      .collect()
  }

  fn render_pane(&mut self, frame: &mut Frame, area: Rect) {
    let (items, loading, name) = match self.pane {
      Pane::Records => (self.record_items(), self.records.is_loading(), "Records"),
      Pane::Changes => (self.change_items(), self.changes.is_loading(), "Changes"),
    };
    let len = items.len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if loading {
      format!(" {} (loading...) ", name)
    } else {
      format!(" {} ({}) ", name, len)
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for UserDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.role_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(index)) => {
        if let Some(role) = UserRole::ALL.get(index).cloned() {
          self.assign_role(role);
        }
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Tab => {
        self.pane = match self.pane {
          Pane::Records => Pane::Changes,
          Pane::Changes => Pane::Records,
        };
        self.list_state.select(Some(0));
      }
      KeyCode::Char('R') => {
        let options = UserRole::ALL.iter().map(|r| r.as_str().to_string()).collect();
        self
          .role_picker
          .show(format!("Role for {}", self.display_name()), options);
      }
      KeyCode::Char('r') => {
        self.profile.refetch();
        self.records.refetch();
        self.changes.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(1)])
      .split(area);

    self.render_profile(frame, chunks[0]);
    self.render_pane(frame, chunks[1]);
    self.role_picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.display_name()
  }

  fn tick(&mut self) {
    self.profile.poll();
    self.records.poll();
    self.changes.poll();
  }

  fn captures_input(&self) -> bool {
    self.role_picker.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("Tab", "records/changes").with_priority(20),
      ShortcutInfo::new("R", "assign role").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
