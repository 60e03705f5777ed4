use crate::event::{Notice, NoticeLevel};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: breadcrumb on the left, latest notice on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], notice: Option<&Notice>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);

  if let Some(notice) = notice {
    let (marker, color) = match notice.level {
      NoticeLevel::Success => ("✓", Color::Green),
      NoticeLevel::Error => ("✗", Color::Red),
    };
    let line = Line::from(vec![
      Span::styled(format!("{} ", marker), Style::default().fg(color).bold()),
      Span::styled(format!("{} ", notice.text), Style::default().fg(color)),
    ])
    .right_aligned();
    frame.render_widget(Paragraph::new(line), area);
  }
}
