pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::{App, Phase};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, ListState, Paragraph, Wrap};
use renderfns::{draw_footer, draw_header, HeaderInfo};

/// Clamp a list selection to `len` items, selecting the first when unset
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i < len => {}
    Some(_) => state.select(Some(len - 1)),
    None => state.select(Some(0)),
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let title = app.title();
  let user = app.user_name();
  let info = HeaderInfo {
    title: &title,
    user: user.as_deref(),
    connection: app.connection_label(),
    mode: app.mode(),
  };
  draw_header(frame, chunks[0], &info, &app.shortcuts());

  match app.phase().clone() {
    Phase::Ready => {
      if let Some(view) = app.current_view_mut() {
        view.render(frame, chunks[1]);
      } else {
        draw_message(frame, chunks[1], " rollcall ", "Loading your profile...", Color::Blue);
      }
    }
    Phase::Connecting => {
      draw_message(frame, chunks[1], " rollcall ", "Connecting to the backend...", Color::Blue);
    }
    Phase::Offline(error) => {
      let text = format!("Could not connect: {}\n\nPress Enter to retry, q to quit.", error);
      draw_message(frame, chunks[1], " Offline ", &text, Color::Red);
    }
    Phase::LoggedOut => {
      let text = "You have been logged out.\n\nPress Enter to log in again, q to quit.";
      draw_message(frame, chunks[1], " Logged out ", text, Color::Yellow);
    }
  }

  draw_footer(frame, chunks[2], &app.breadcrumb(), app.notice());
  app.command_input().render_overlay(frame, chunks[1]);
}

fn draw_message(frame: &mut Frame, area: Rect, title: &str, text: &str, color: Color) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(color))
    .title(title.to_string());
  let paragraph = Paragraph::new(text.to_string())
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: false });
  frame.render_widget(paragraph, area);
}
