use crate::backend::cache::QueryFamily;
use crate::backend::types::{UserProfile, UserRole};
use crate::domain::messages::Operation;
use crate::domain::validation::{validate_profile, DEFAULT_HOLIDAY_BALANCE};
use crate::query::{Query, QueryState};
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

const ROLES: [&str; 2] = ["Employee", "Admin"];

/// Profile form: first-time setup without an invite, or editing an
/// existing profile from the `profile` command
pub struct ProfileView {
  ctx: ViewContext,
  /// Caller's profile, `None` inside when none exists yet
  current: Query<Option<UserProfile>>,
  role: Query<UserRole>,
  setup: bool,
  form: Form,
  form_opened: bool,
  submit: Submission<()>,
}

impl ProfileView {
  pub fn setup(ctx: ViewContext) -> Self {
    Self::build(ctx, true)
  }

  pub fn edit(ctx: ViewContext) -> Self {
    Self::build(ctx, false)
  }

  fn build(ctx: ViewContext, setup: bool) -> Self {
    let current = ctx.query(&[QueryFamily::CurrentUserProfile], |backend| async move {
      backend.current_user_profile().await
    });
    let role = ctx.query(&[QueryFamily::CallerRole], |backend| async move {
      backend.caller_role().await
    });
    Self {
      ctx,
      current,
      role,
      setup,
      form: Form::default(),
      form_opened: false,
      submit: Submission::new(Operation::SaveProfile),
    }
  }

  fn open_form(&mut self) {
    let existing = self.current.data().cloned().flatten().unwrap_or_default();
    let role = if existing.is_employee || self.setup { 0 } else { 1 };
    let title = if self.setup { "Set up your profile" } else { "Edit profile" };

    self.form = Form::new(title)
      .text("Name", existing.name)
      .text("Position", existing.position)
      .choice("Role", ROLES, role);
    self.form.open();
  }

  fn submit_form(&mut self) {
    let (name, position) = match validate_profile(self.form.value(0), self.form.value(1)) {
      Ok(fields) => fields,
      Err(e) => {
        self.form.set_error(e.to_string());
        return;
      }
    };
    let holiday_balance = match self.current.data() {
      Some(Some(existing)) => existing.holiday_balance,
      _ => DEFAULT_HOLIDAY_BALANCE,
    };
    let profile = UserProfile {
      name,
      position,
      is_employee: self.form.selected(2) == 0,
      holiday_balance,
    };

    self.form.set_busy();
    self.submit.start(self.ctx.mutation(Operation::SaveProfile, move |backend| {
      let profile = profile.clone();
      async move { backend.save_profile(profile).await }
    }));
  }
}

impl View for ProfileView {
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
      KeyCode::Enter | KeyCode::Char('e') => self.open_form(),
      KeyCode::Char('r') => {
        self.current.refetch();
        self.role.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let mut lines = match self.current.state() {
      QueryState::Idle | QueryState::Loading => vec![Line::from("Loading profile...")],
      QueryState::Error(e) => vec![Line::from(Span::styled(
        format!("Failed to load profile: {}", e),
        Style::default().fg(Color::Red),
      ))],
      QueryState::Success(None) => vec![
        Line::from(Span::styled("No profile yet", Style::default().fg(Color::Yellow).bold())),
        Line::from(""),
        Line::from("Set your name and position before using the dashboard."),
      ],
      QueryState::Success(Some(profile)) => vec![
        Line::from(vec![label("Name:            "), Span::raw(profile.name.clone())]),
        Line::from(vec![label("Position:        "), Span::raw(profile.position.clone())]),
        Line::from(vec![
          label("Contract:        "),
          Span::raw(if profile.is_employee { "Employee" } else { "Collaborator" }),
        ]),
        Line::from(vec![
          label("Holiday balance: "),
          Span::styled(format!("{} days", profile.holiday_balance), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
          label("Access:          "),
          Span::raw(self.role.data().map_or("...", |role| role.as_str())),
        ]),
      ],
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "Press Enter to edit",
      Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(" Profile ");
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    if self.setup {
      "Profile setup".to_string()
    } else {
      "Profile".to_string()
    }
  }

  fn tick(&mut self) {
    self.current.poll();
    self.role.poll();
    // Setup opens straight into the form once we know there is no profile
    if self.setup && !self.form_opened && self.current.is_success() {
      self.form_opened = true;
      self.open_form();
    }
    if let Some(result) = self.submit.poll() {
      match &result {
        Ok(()) => self.form.close(),
        Err(message) => self.form.set_error(message.clone()),
      }
      self.ctx.report(self.submit.operation(), &result);
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.setup {
      return vec![
        ShortcutInfo::new("Enter", "edit").with_priority(10),
        ShortcutInfo::new("q", "quit").with_priority(90),
      ];
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(5),
      ShortcutInfo::new("Enter", "edit").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
