use crate::db::DashboardMode;
use crate::ui::view::{ShortcutInfo, ShortcutVisibility};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// What the header shows besides the view's shortcuts
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub user: Option<&'a str>,
  pub connection: &'a str,
  pub mode: DashboardMode,
}

/// Draw the header bar with logo, context, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[ShortcutInfo]) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" rollcall ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::White)),
    sep(),
  ];

  if let Some(user) = info.user {
    spans.push(Span::styled(format!(" {} ", user), Style::default().fg(Color::Yellow).bold()));
    spans.push(sep());
  }

  let mode_style = match info.mode {
    DashboardMode::Admin => Style::default().fg(Color::Magenta).bold(),
    DashboardMode::Personal => Style::default().fg(Color::Green),
  };
  spans.push(Span::styled(format!(" {} ", info.mode.as_str()), mode_style));
  spans.push(sep());
  spans.push(Span::styled(
    format!(" {} ", info.connection),
    Style::default().fg(connection_color(info.connection)),
  ));
  spans.push(Span::raw("  "));

  let mut visible: Vec<&ShortcutInfo> = shortcuts
    .iter()
    .filter(|s| s.visibility == ShortcutVisibility::Always)
    .collect();
  visible.sort_by_key(|s| s.priority);

  for shortcut in visible {
    spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}   ", shortcut.label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn connection_color(label: &str) -> Color {
  match label {
    "connected" => Color::Green,
    "connecting" => Color::Yellow,
    _ => Color::Red,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_connection_color() {
    assert_eq!(connection_color("connected"), Color::Green);
    assert_eq!(connection_color("connecting"), Color::Yellow);
    assert_eq!(connection_color("disconnected"), Color::Red);
  }
}
