use crate::backend::cache::QueryFamily;
use crate::backend::types::{InviteCode, Rsvp, UserRole};
use crate::domain::messages::Operation;
use crate::domain::stats::{invite_link, InviteStats};
use crate::domain::time::format_timestamp;
use crate::query::Query;
use crate::ui::components::{KeyResult, Picker, PickerEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Roles offered when generating a code; `None` leaves the role to the backend
const ROLE_CHOICES: [(&str, Option<UserRole>); 3] = [
  ("user", Some(UserRole::User)),
  ("admin", Some(UserRole::Admin)),
  ("no role", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
  Unused,
  Used,
  Rsvps,
}

impl Tab {
  const ALL: [Tab; 3] = [Tab::Unused, Tab::Used, Tab::Rsvps];

  fn label(&self) -> &'static str {
    match self {
      Tab::Unused => "Unused",
      Tab::Used => "Used",
      Tab::Rsvps => "RSVPs",
    }
  }

  fn next(&self) -> Self {
    match self {
      Tab::Unused => Tab::Used,
      Tab::Used => Tab::Rsvps,
      Tab::Rsvps => Tab::Unused,
    }
  }
}

/// Admin management of invite codes and the RSVPs they produced
pub struct InvitesView {
  ctx: ViewContext,
  codes: Query<Vec<InviteCode>>,
  rsvps: Query<Vec<Rsvp>>,
  tab: Tab,
  list_state: ListState,
  role_picker: Picker,
  generate: Submission<String>,
  /// Most recently generated code
  latest: Option<String>,
}

impl InvitesView {
  pub fn new(ctx: ViewContext) -> Self {
    let codes = ctx.query(&[QueryFamily::InviteCodes], |backend| async move {
      backend.invite_codes().await
    });
    let rsvps = ctx.query(&[QueryFamily::Rsvps], |backend| async move { backend.rsvps().await });

    Self {
      ctx,
      codes,
      rsvps,
      tab: Tab::Unused,
      list_state: ListState::default(),
      role_picker: Picker::new(),
      generate: Submission::new(Operation::GenerateInvite),
      latest: None,
    }
  }

  fn codes(&self, used: bool) -> Vec<&InviteCode> {
    let mut codes: Vec<&InviteCode> = self
      .codes
      .data()
      .into_iter()
      .flatten()
      .filter(|c| c.used == used)
      .collect();
    codes.sort_by(|a, b| b.created.cmp(&a.created));
    codes
  }

  fn link(&self, code: &str) -> String {
    invite_link(&self.ctx.invite_base, code).unwrap_or_else(|_| code.to_string())
  }

  fn selected_code(&self) -> Option<String> {
    let index = self.list_state.selected()?;
    match self.tab {
      Tab::Unused => self.codes(false).get(index).map(|c| c.code.clone()),
      Tab::Used => self.codes(true).get(index).map(|c| c.code.clone()),
      Tab::Rsvps => None,
    }
  }

  fn start_generate(&mut self, role: Option<UserRole>) {
    if self.generate.is_pending() {
      return;
    }
    self.generate.start(self.ctx.mutation(Operation::GenerateInvite, move |backend| {
      let role = role.clone();
      async move { backend.generate_invite_code(role).await }
    }));
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let codes = self.codes.data().map(|v| v.as_slice()).unwrap_or(&[]);
    let rsvps = self.rsvps.data().map(|v| v.as_slice()).unwrap_or(&[]);
    let stats = InviteStats::collect(codes, rsvps);
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));

    let mut tabs = Vec::new();
    for tab in Tab::ALL {
      let style = if tab == self.tab {
        Style::default().fg(Color::Black).bg(Color::Cyan)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      tabs.push(Span::styled(format!(" {} ", tab.label()), style));
      tabs.push(Span::raw(" "));
    }

    let latest = match (&self.latest, self.generate.is_pending()) {
      (_, true) => Line::from(Span::styled("Generating...", Style::default().fg(Color::Yellow))),
      (Some(code), false) => Line::from(vec![
        label("New code: "),
        Span::styled(code.clone(), Style::default().fg(Color::Green).bold()),
        Span::raw("  "),
        Span::styled(self.link(code), Style::default().fg(Color::Cyan)),
      ]),
      (None, false) => Line::from(label("Press 'g' to generate an invite code")),
    };

    let lines = vec![
      Line::from(tabs),
      Line::from(vec![
        label("Unused: "),
        Span::styled(stats.unused.to_string(), Style::default().fg(Color::Green)),
        Span::raw("   "),
        label("Used: "),
        Span::raw(stats.used.to_string()),
        Span::raw("   "),
        label("Accepted RSVPs: "),
        Span::styled(stats.accepted.to_string(), Style::default().fg(Color::Yellow)),
      ]),
      latest,
    ];

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta))
      .title(" Invites ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn items(&self) -> Vec<ListItem<'static>> {
    match self.tab {
      Tab::Unused | Tab::Used => self
        .codes(self.tab == Tab::Used)
        .into_iter()
        .map(|code| {
          ListItem::new(Line::from(vec![
            Span::styled(format!("{:<20}", format_timestamp(code.created)), Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:<16}", code.code), Style::default().fg(Color::White).bold()),
            Span::styled(self.link(&code.code), Style::default().fg(Color::DarkGray)),
          ]))
        })
        .collect(),
      Tab::Rsvps => {
        let mut rsvps: Vec<&Rsvp> = self.rsvps.data().into_iter().flatten().collect();
        rsvps.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rsvps
          .into_iter()
          .map(|rsvp| {
            let (answer, color) = if rsvp.attending {
              ("attending", Color::Green)
            } else {
              ("declined", Color::Red)
            };
            ListItem::new(Line::from(vec![
              Span::styled(format!("{:<20}", format_timestamp(rsvp.timestamp)), Style::default().fg(Color::Cyan)),
              Span::styled(format!("{:<24}", rsvp.name), Style::default().fg(Color::Yellow)),
              Span::styled(format!("{:<11}", answer), Style::default().fg(color)),
              Span::styled(rsvp.invite_code.clone(), Style::default().fg(Color::DarkGray)),
            ]))
          })
          .collect()
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let items = self.items();
    let len = items.len();
    ensure_valid_selection(&mut self.list_state, len);

    let error = match self.tab {
      Tab::Rsvps => self.rsvps.state().error().map(str::to_string),
      _ => self.codes.state().error().map(str::to_string),
    };
    let loading = match self.tab {
      Tab::Rsvps => self.rsvps.is_loading(),
      _ => self.codes.is_loading(),
    };
    let title = match (loading, error) {
      (true, _) => format!(" {} (loading...) ", self.tab.label()),
      (_, Some(e)) => format!(" {} (error: {}) ", self.tab.label(), e),
      _ => format!(" {} ({}) ", self.tab.label(), len),
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

impl View for InvitesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.role_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(index)) => {
        if let Some((_, role)) = ROLE_CHOICES.get(index) {
          self.start_generate(role.clone());
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
        self.tab = self.tab.next();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('g') => {
        let options = ROLE_CHOICES.iter().map(|(label, _)| label.to_string()).collect();
        self.role_picker.show("Invite as", options);
      }
      KeyCode::Enter => {
        if let Some(code) = self.selected_code() {
          self.latest = Some(code);
        }
      }
      KeyCode::Char('r') => {
        self.codes.refetch();
        self.rsvps.refetch();
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

    self.render_summary(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    self.role_picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Invites".to_string()
  }

  fn tick(&mut self) {
    self.codes.poll();
    self.rsvps.poll();
    if let Some(result) = self.generate.poll() {
      if let Ok(code) = &result {
        self.latest = Some(code.clone());
      }
      self.ctx.report(self.generate.operation(), &result);
    }
  }

  fn captures_input(&self) -> bool {
    self.role_picker.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("g", "generate").with_priority(20),
      ShortcutInfo::new("Tab", "unused/used/rsvps").with_priority(30),
      ShortcutInfo::new("Enter", "show link").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
