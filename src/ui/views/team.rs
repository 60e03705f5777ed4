use crate::backend::cache::QueryFamily;
use crate::backend::types::{HolidayRequest, Principal, UserRecords};
use crate::domain::export::ExportKind;
use crate::domain::messages::Operation;
use crate::domain::stats::{day_rows, hours_by_user, TeamStats};
use crate::domain::time::format_range;
use crate::domain::window::{TimeWindow, WindowKind};
use crate::query::{Query, QueryState};
use crate::ui::components::NameResolver;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{request_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crate::ui::views::UserDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// One line of the member table
#[derive(Debug, Clone, PartialEq)]
struct MemberRow {
  user: Principal,
  records: usize,
  hours: u64,
}

/// Merge the window's records with the server's hour totals. Members with
/// server hours but no records still get a row.
fn member_rows(rows: &UserRecords, server_hours: &[(Principal, u64)]) -> Vec<MemberRow> {
  let mut members: Vec<MemberRow> = hours_by_user(rows)
    .into_iter()
    .map(|(user, hours)| {
      let records = rows
        .iter()
        .filter(|(u, _)| *u == user)
        .map(|(_, records)| records.len())
        .sum();
      MemberRow { user, records, hours }
    })
    .collect();

  for (user, hours) in server_hours {
    match members.iter_mut().find(|m| m.user == *user) {
      Some(member) => member.hours = member.hours.max(*hours),
      None => members.push(MemberRow {
        user: user.clone(),
        records: 0,
        hours: *hours,
      }),
    }
  }

  members.sort_by(|a, b| b.hours.cmp(&a.hours).then_with(|| a.user.cmp(&b.user)));
  members
}

/// Admin overview of the whole team for a day, week or month
pub struct TeamView {
  ctx: ViewContext,
  window: TimeWindow,
  rows: Query<UserRecords>,
  all_records: Query<UserRecords>,
  server_hours: Query<Vec<(Principal, u64)>>,
  holidays: Query<Vec<HolidayRequest>>,
  names: NameResolver,
  list_state: ListState,
}

impl TeamView {
  pub fn new(ctx: ViewContext) -> Self {
    let window = TimeWindow::current(WindowKind::Week);
    let all_records = ctx.query(&[QueryFamily::AllAttendanceRecords], |backend| async move {
      backend.all_attendance_records().await
    });
    let names = NameResolver::new(ctx.backend.clone());

    Self {
      rows: Self::rows_query(&ctx, &window),
      server_hours: Self::hours_query(&ctx, &window),
      holidays: Self::holidays_query(&ctx, &window),
      ctx,
      window,
      all_records,
      names,
      list_state: ListState::default(),
    }
  }

  fn rows_query(ctx: &ViewContext, window: &TimeWindow) -> Query<UserRecords> {
    let anchor = window.query_anchor();
    match window.kind {
      WindowKind::Day => ctx.query(&[QueryFamily::AttendanceByDay], move |backend| async move {
        backend.attendance_by_day(anchor).await.map(|rows| day_rows(&rows))
      }),
      WindowKind::Week => ctx.query(&[QueryFamily::AttendanceByWeek], move |backend| async move {
        backend.attendance_by_week(anchor).await
      }),
      WindowKind::Month => ctx.query(&[QueryFamily::AttendanceByMonth], move |backend| async move {
        backend.attendance_by_month(anchor).await
      }),
    }
  }

  fn hours_query(ctx: &ViewContext, window: &TimeWindow) -> Query<Vec<(Principal, u64)>> {
    let (start, end) = window.bounds();
    ctx.query(&[QueryFamily::TotalHoursAllUsers], move |backend| async move {
      backend.total_hours_all_users(start, end).await
    })
  }

  fn holidays_query(ctx: &ViewContext, window: &TimeWindow) -> Query<Vec<HolidayRequest>> {
    let (start, end) = window.bounds();
    ctx.query(&[QueryFamily::HolidayRequestsByPeriod], move |backend| async move {
      backend.holiday_requests_by_period(start, end).await
    })
  }

  fn set_window(&mut self, window: TimeWindow) {
    self.window = window;
    self.rows = Self::rows_query(&self.ctx, &self.window);
    self.server_hours = Self::hours_query(&self.ctx, &self.window);
    self.holidays = Self::holidays_query(&self.ctx, &self.window);
    self.list_state.select(Some(0));
  }

  fn members(&self) -> Vec<MemberRow> {
    let empty = Vec::new();
    let rows = self.rows.data().unwrap_or(&empty);
    let hours = self.server_hours.data().map(|v| v.as_slice()).unwrap_or(&[]);
    member_rows(rows, hours)
  }

  fn stats(&self) -> TeamStats {
    let total_users = self.all_records.data().map(|rows| rows.len()).unwrap_or(0);
    let records = self
      .rows
      .data()
      .into_iter()
      .flatten()
      .flat_map(|(_, records)| records.iter());
    TeamStats::collect(total_users, records)
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let stats = self.stats();

    let mut tabs = Vec::new();
    for kind in [WindowKind::Day, WindowKind::Week, WindowKind::Month] {
      let style = if kind == self.window.kind {
        Style::default().fg(Color::Black).bg(Color::Cyan)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      tabs.push(Span::styled(format!(" {} ", kind.label()), style));
      tabs.push(Span::raw(" "));
    }
    tabs.push(Span::styled(self.window.label(), Style::default().fg(Color::White).bold()));

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let lines = vec![
      Line::from(tabs),
      Line::from(vec![
        label("Users: "),
        Span::raw(stats.total_users.to_string()),
        Span::raw("   "),
        label("Records: "),
        Span::raw(stats.total_records.to_string()),
        Span::raw("   "),
        label("Present: "),
        Span::styled(stats.present.to_string(), Style::default().fg(Color::Green)),
        Span::raw("   "),
        label("Remote: "),
        Span::styled(stats.remote.to_string(), Style::default().fg(Color::Cyan)),
        Span::raw("   "),
        label("Absent: "),
        Span::styled(stats.absent.to_string(), Style::default().fg(Color::Red)),
        Span::raw("   "),
        label("Rate: "),
        Span::styled(
          format!("{:.1}%", stats.attendance_rate()),
          Style::default().fg(Color::Yellow).bold(),
        ),
        Span::raw("   "),
        label("Hours: "),
        Span::styled(format!("{} h", stats.total_hours), Style::default().fg(Color::Green)),
      ]),
    ];

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta))
      .title(" Team overview ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_members(&mut self, frame: &mut Frame, area: Rect) {
    let members = self.members();
    let len = members.len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.rows.state() {
      QueryState::Loading => " Members (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Members (error: {}) ", e),
      _ => format!(" Members ({}) ", len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.rows.is_loading() {
      let content = if self.rows.is_error() {
        "Failed to load attendance. Press 'r' to retry."
      } else {
        "No attendance recorded in this period."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = members
      .iter()
      .map(|member| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&self.names.name(&member.user), 22)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(format!("{:>4} records  ", member.records)),
          Span::styled(format!("{:>5} h", member.hours), Style::default().fg(Color::Green)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_holidays(&self, frame: &mut Frame, area: Rect) {
    let requests = self.holidays.data().map(|v| v.as_slice()).unwrap_or(&[]);
    let title = match self.holidays.state() {
      QueryState::Loading => " Holidays (loading...) ".to_string(),
      _ => format!(" Holidays ({}) ", requests.len()),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let lines: Vec<Line> = requests
      .iter()
      .map(|request| {
        Line::from(vec![
          Span::styled(
            format!("{:<18}", truncate(&self.names.name(&request.user), 16)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(format!("{:<28}", format_range(request.start_date, request.end_date))),
          Span::styled(
            request.status.as_str().to_string(),
            Style::default().fg(request_color(&request.status)),
          ),
        ])
      })
      .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
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
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|i| self.members().get(i).map(|m| m.user.clone()));
        selected.map(|user| ViewAction::Push(Box::new(UserDetailView::new(self.ctx.clone(), user))))
      }
      KeyCode::Char('e') => {
        let backend = self.ctx.backend.clone();
        self.ctx.export(ExportKind::Attendance, Operation::ExportAttendance, async move {
          backend.export_attendance_csv().await
        });
        Some(ViewAction::None)
      }
      KeyCode::Char('E') => {
        let backend = self.ctx.backend.clone();
        self.ctx.export(ExportKind::Holidays, Operation::ExportHolidays, async move {
          backend.export_holiday_csv().await
        });
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.rows.refetch();
        self.all_records.refetch();
        self.server_hours.refetch();
        self.holidays.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for TeamView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_navigation(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(4), Constraint::Min(1)])
      .split(area);
    let body = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(chunks[1]);

    self.render_summary(frame, chunks[0]);
    self.render_members(frame, body[0]);
    self.render_holidays(frame, body[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Team".to_string()
  }

  fn tick(&mut self) {
    self.rows.poll();
    self.all_records.poll();
    self.server_hours.poll();
    self.holidays.poll();

    let mut users: Vec<Principal> = self.members().into_iter().map(|m| m.user).collect();
    if let Some(requests) = self.holidays.data() {
      users.extend(requests.iter().map(|r| r.user.clone()));
    }
    self.names.request(&users);
    self.names.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("Enter", "member").with_priority(20),
      ShortcutInfo::new("d/w/m", "period").with_priority(30),
      ShortcutInfo::new("←/→", "move").with_priority(40),
      ShortcutInfo::new("e", "export attendance").with_priority(50),
      ShortcutInfo::new("E", "export holidays").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::AttendanceRecord;

  fn record(hours: u64) -> AttendanceRecord {
    AttendanceRecord {
      hours_worked: Some(hours),
      ..AttendanceRecord::default()
    }
  }

  #[test]
  fn test_member_rows_sorted_by_hours() {
    let rows: UserRecords = vec![
      (Principal::new("aaaa-1"), vec![record(4)]),
      (Principal::new("bbbb-2"), vec![record(8), record(8)]),
    ];
    let members = member_rows(&rows, &[]);
    assert_eq!(members[0].user, Principal::new("bbbb-2"));
    assert_eq!(members[0].records, 2);
    assert_eq!(members[0].hours, 16);
    assert_eq!(members[1].hours, 4);
  }

  #[test]
  fn test_member_rows_include_server_only_users() {
    let rows: UserRecords = vec![(Principal::new("aaaa-1"), vec![record(4)])];
    let server = vec![(Principal::new("aaaa-1"), 6), (Principal::new("cccc-3"), 2)];
    let members = member_rows(&rows, &server);
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].hours, 6);
    assert_eq!(members[1].user, Principal::new("cccc-3"));
    assert_eq!(members[1].records, 0);
  }
}
