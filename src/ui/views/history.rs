use crate::backend::cache::QueryFamily;
use crate::backend::types::{AttendanceModification, ModificationType};
use crate::domain::time::{format_date, format_timestamp};
use crate::domain::window::{TimeWindow, WindowKind};
use crate::query::{Query, QueryState};
use crate::ui::components::NameResolver;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{attendance_label, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub(crate) fn modification_color(kind: &ModificationType) -> Color {
  match kind {
    ModificationType::Created => Color::Green,
    ModificationType::Updated => Color::Yellow,
    ModificationType::Deleted => Color::Red,
    ModificationType::Unknown(_) => Color::White,
  }
}

/// One-line summary of what an audit entry changed
pub(crate) fn describe_change(modification: &AttendanceModification) -> String {
  match (&modification.old_record, &modification.new_record) {
    (Some(old), Some(new)) => {
      let mut changes = Vec::new();
      if old.date != new.date {
        changes.push(format!("date {} -> {}", format_date(old.date), format_date(new.date)));
      }
      if old.status != new.status {
        changes.push(format!(
          "status {} -> {}",
          attendance_label(&old.status),
          attendance_label(&new.status)
        ));
      }
      if old.hours_worked != new.hours_worked {
        changes.push(format!(
          "hours {} -> {}",
          old.hours_worked.unwrap_or(0),
          new.hours_worked.unwrap_or(0)
        ));
      }
      if old.activity != new.activity {
        changes.push("activity".to_string());
      }
      if old.notes != new.notes {
        changes.push("notes".to_string());
      }
      if changes.is_empty() {
        "no field changes".to_string()
      } else {
        changes.join(", ")
      }
    }
    (None, Some(record)) | (Some(record), None) => {
      format!("{} {}", format_date(record.date), attendance_label(&record.status))
    }
    (None, None) => String::new(),
  }
}

/// Attendance audit trail: the caller's own changes, or the whole team's
/// for one month when an admin switches scope
pub struct HistoryView {
  ctx: ViewContext,
  team: bool,
  month: TimeWindow,
  mine: Query<Vec<AttendanceModification>>,
  everyone: Option<Query<Vec<AttendanceModification>>>,
  names: NameResolver,
  list_state: ListState,
}

impl HistoryView {
  pub fn new(ctx: ViewContext) -> Self {
    let mine = ctx.query(&[QueryFamily::MyAttendanceModifications], |backend| async move {
      backend.my_attendance_modifications().await
    });
    let names = NameResolver::new(ctx.backend.clone());

    Self {
      ctx,
      team: false,
      month: TimeWindow::current(WindowKind::Month),
      mine,
      everyone: None,
      names,
      list_state: ListState::default(),
    }
  }

  fn team_query(&self) -> Query<Vec<AttendanceModification>> {
    let (start, end) = self.month.bounds();
    self
      .ctx
      .query(&[QueryFamily::AttendanceModificationsByPeriod], move |backend| async move {
        backend.attendance_modifications_by_period(start, end).await
      })
  }

  fn set_month(&mut self, month: TimeWindow) {
    self.month = month;
    self.everyone = Some(self.team_query());
    self.list_state.select(Some(0));
  }

  fn toggle_scope(&mut self) {
    if !self.ctx.admin {
      return;
    }
    self.team = !self.team;
    if self.team && self.everyone.is_none() {
      self.everyone = Some(self.team_query());
    }
    self.list_state.select(Some(0));
  }

  fn active(&self) -> &Query<Vec<AttendanceModification>> {
    match (&self.everyone, self.team) {
      (Some(query), true) => query,
      _ => &self.mine,
    }
  }

  fn entries(&self) -> Vec<&AttendanceModification> {
    let mut entries: Vec<_> = self.active().data().into_iter().flatten().collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = self
      .entries()
      .into_iter()
      .map(|entry| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<20}", format_timestamp(entry.timestamp)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<9}", entry.modification_type.as_str()),
            Style::default().fg(modification_color(&entry.modification_type)),
          ),
          Span::raw(format!("#{:<6}", entry.record_id)),
          Span::styled(
            format!("{:<18}", truncate(&self.names.name(&entry.modified_by), 16)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(truncate(&describe_change(entry), 60)),
        ]))
      })
      .collect();
    let len = items.len();
    ensure_valid_selection(&mut self.list_state, len);

    let scope = if self.team {
      format!("Team changes, {}", self.month.label())
    } else {
      "My changes".to_string()
    };
    let query = self.active();
    let title = match query.state() {
      QueryState::Loading => format!(" {} (loading...) ", scope),
      QueryState::Error(e) => format!(" {} (error: {}) ", scope, e),
      _ => format!(" {} ({}) ", scope, len),
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !query.is_loading() {
      let paragraph = Paragraph::new("No changes recorded.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for HistoryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('a') | KeyCode::Tab => self.toggle_scope(),
      KeyCode::Left | KeyCode::Char('h') if self.team => self.set_month(self.month.previous()),
      KeyCode::Right | KeyCode::Char('l') if self.team => self.set_month(self.month.next()),
      KeyCode::Char('r') => {
        self.mine.refetch();
        if let Some(query) = self.everyone.as_mut() {
          query.refetch();
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "History".to_string()
  }

  fn tick(&mut self) {
    self.mine.poll();
    if let Some(query) = self.everyone.as_mut() {
      query.poll();
    }
    let users: Vec<_> = self.entries().into_iter().map(|e| e.modified_by.clone()).collect();
    self.names.request(&users);
    self.names.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(40),
    ];
    if self.ctx.admin {
      shortcuts.push(ShortcutInfo::new("a", "my/team").with_priority(20));
    }
    if self.team {
      shortcuts.push(ShortcutInfo::new("←/→", "month").with_priority(30));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::{AttendanceRecord, AttendanceStatus, Principal};

  fn modification(
    kind: ModificationType,
    old: Option<AttendanceRecord>,
    new: Option<AttendanceRecord>,
  ) -> AttendanceModification {
    AttendanceModification {
      record_id: 1,
      modified_by: Principal::new("aaaa-bbbb"),
      modification_type: kind,
      timestamp: 0,
      old_record: old,
      new_record: new,
    }
  }

  #[test]
  fn test_describe_update_lists_changed_fields() {
    let old = AttendanceRecord {
      status: AttendanceStatus::Present,
      hours_worked: Some(8),
      ..AttendanceRecord::default()
    };
    let new = AttendanceRecord {
      status: AttendanceStatus::RemoteWork,
      hours_worked: Some(6),
      ..old.clone()
    };
    let text = describe_change(&modification(ModificationType::Updated, Some(old), Some(new)));
    assert_eq!(text, "status Present -> Remote work, hours 8 -> 6");
  }

  #[test]
  fn test_describe_update_without_changes() {
    let record = AttendanceRecord::default();
    let text = describe_change(&modification(
      ModificationType::Updated,
      Some(record.clone()),
      Some(record),
    ));
    assert_eq!(text, "no field changes");
  }

  #[test]
  fn test_describe_deletion_uses_old_record() {
    let old = AttendanceRecord {
      status: AttendanceStatus::Absent,
      ..AttendanceRecord::default()
    };
    let text = describe_change(&modification(ModificationType::Deleted, Some(old), None));
    assert!(text.ends_with("Absent"));
  }
}
