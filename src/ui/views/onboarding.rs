use crate::backend::types::UserProfile;
use crate::domain::messages::Operation;
use crate::domain::validation::{validate_profile, DEFAULT_HOLIDAY_BALANCE};
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, Submission, View, ViewAction, ViewContext};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

const CONTRACTS: [&str; 2] = ["Employee", "Collaborator"];

/// First run for someone holding an invite code: a welcome screen, then the
/// profile form. Submitting consumes the code with an RSVP before the
/// profile is saved.
pub struct OnboardingView {
  ctx: ViewContext,
  invite_code: String,
  form: Form,
  submit: Submission<()>,
}

impl OnboardingView {
  pub fn new(ctx: ViewContext, invite_code: String) -> Self {
    Self {
      ctx,
      invite_code,
      form: Form::default(),
      submit: Submission::new(Operation::Onboarding),
    }
  }

  fn open_form(&mut self) {
    self.form = Form::new("Join the team")
      .text("Name", "")
      .text("Position", "")
      .choice("Contract", CONTRACTS, 0);
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
    let profile = UserProfile {
      name,
      position,
      is_employee: self.form.selected(2) == 0,
      holiday_balance: DEFAULT_HOLIDAY_BALANCE,
    };
    let code = self.invite_code.clone();

    self.form.set_busy();
    self.submit.start(self.ctx.mutation(Operation::Onboarding, move |backend| {
      let profile = profile.clone();
      let code = code.clone();
      async move {
        backend.submit_rsvp(profile.name.clone(), true, code).await?;
        backend.save_profile(profile).await
      }
    }));
  }
}

impl View for OnboardingView {
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
      KeyCode::Enter => self.open_form(),
      KeyCode::Char('q') => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let lines = vec![
      Line::from(Span::styled("Welcome!", Style::default().fg(Color::Cyan).bold())),
      Line::from(""),
      Line::from("You have been invited to join the team."),
      Line::from(vec![
        Span::raw("Invite code: "),
        Span::styled(self.invite_code.clone(), Style::default().fg(Color::Yellow)),
      ]),
      Line::from(""),
      Line::from("Tell us your name and position to get started."),
      Line::from(""),
      Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::DarkGray))),
    ];
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan))
      .title(" Onboarding ");
    let paragraph = Paragraph::new(lines)
      .block(block)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Onboarding".to_string()
  }

  fn tick(&mut self) {
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
    vec![
      ShortcutInfo::new("Enter", "continue").with_priority(10),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
