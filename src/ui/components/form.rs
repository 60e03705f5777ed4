//! Modal multi-field form used by every create/edit screen.
//!
//! Fields are either free text or a fixed choice list. `Tab`/`Down` move to
//! the next field, `Left`/`Right` cycle a choice, `Enter` on the last field
//! or `Ctrl-S` anywhere submits, `Esc` cancels.

use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submitted,
  Cancelled,
}

#[derive(Debug, Clone)]
enum FieldKind {
  Text(TextInput),
  Choice { options: Vec<String>, selected: usize },
}

#[derive(Debug, Clone)]
struct Field {
  label: &'static str,
  hint: &'static str,
  kind: FieldKind,
}

#[derive(Debug, Clone, Default)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focus: usize,
  active: bool,
  error: Option<String>,
  busy: bool,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  pub fn text(mut self, label: &'static str, value: impl Into<String>) -> Self {
    self.fields.push(Field {
      label,
      hint: "",
      kind: FieldKind::Text(TextInput::with_value(value)),
    });
    self
  }

  /// Text field with a format hint shown next to the label
  pub fn text_with_hint(mut self, label: &'static str, hint: &'static str, value: impl Into<String>) -> Self {
    self = self.text(label, value);
    if let Some(field) = self.fields.last_mut() {
      field.hint = hint;
    }
    self
  }

  pub fn choice<S: Into<String>>(
    mut self,
    label: &'static str,
    options: impl IntoIterator<Item = S>,
    selected: usize,
  ) -> Self {
    let options: Vec<String> = options.into_iter().map(Into::into).collect();
    let selected = selected.min(options.len().saturating_sub(1));
    self.fields.push(Field {
      label,
      hint: "",
      kind: FieldKind::Choice { options, selected },
    });
    self
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn open(&mut self) {
    self.active = true;
    self.focus = 0;
    self.error = None;
    self.busy = false;
  }

  pub fn close(&mut self) {
    self.active = false;
    self.busy = false;
  }

  /// Show a validation or backend error below the fields
  pub fn set_error(&mut self, error: impl Into<String>) {
    self.error = Some(error.into());
    self.busy = false;
  }

  /// Mark the form as waiting on a submit; further submits are ignored
  pub fn set_busy(&mut self) {
    self.error = None;
    self.busy = true;
  }

  pub fn is_busy(&self) -> bool {
    self.busy
  }

  /// Value of the text field at `index`, empty for other kinds
  pub fn value(&self, index: usize) -> &str {
    match self.fields.get(index).map(|f| &f.kind) {
      Some(FieldKind::Text(input)) => input.value(),
      _ => "",
    }
  }

  /// Selected option of the choice field at `index`
  pub fn selected(&self, index: usize) -> usize {
    match self.fields.get(index).map(|f| &f.kind) {
      Some(FieldKind::Choice { selected, .. }) => *selected,
      _ => 0,
    }
  }

  fn next_field(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1) % self.fields.len();
    }
  }

  fn previous_field(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    if self.busy {
      return KeyResult::Handled;
    }
    KeyResult::Event(FormEvent::Submitted)
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        return KeyResult::Event(FormEvent::Cancelled);
      }
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => return self.submit(),
      KeyCode::Tab | KeyCode::Down => {
        self.next_field();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.previous_field();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        if self.focus + 1 >= self.fields.len() {
          return self.submit();
        }
        self.next_field();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::Handled;
    };
    match &mut field.kind {
      FieldKind::Text(input) => {
        input.handle_key(key);
      }
      FieldKind::Choice { options, selected } => {
        let count = options.len().max(1);
        match key.code {
          KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
            *selected = (*selected + 1) % count;
          }
          KeyCode::Left | KeyCode::Char('h') => {
            *selected = (*selected + count - 1) % count;
          }
          _ => {}
        }
      }
    }
    // Modal: nothing leaks to the view underneath
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 70 / 100).clamp(40, 72).min(area.width);
    let extra = if self.error.is_some() || self.busy { 2 } else { 0 };
    let height = (self.fields.len() as u16 + 4 + extra).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title))
      .title_bottom(Line::from(" Tab:next  Enter:submit  Esc:cancel ").right_aligned());

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.len())
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::raw(""));
    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::White)
      };
      let mut spans = vec![
        Span::styled(if focused { "> " } else { "  " }, Style::default().fg(Color::Cyan)),
        Span::styled(format!("{:<width$}  ", field.label, width = label_width), label_style),
      ];

      match &field.kind {
        FieldKind::Text(input) => {
          if focused {
            let (before, after) = input.split_at_cursor();
            spans.push(Span::raw(before.to_string()));
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(after.to_string()));
          } else {
            spans.push(Span::raw(input.value().to_string()));
          }
          if input.is_empty() && !field.hint.is_empty() {
            spans.push(Span::styled(format!(" {}", field.hint), Style::default().fg(Color::DarkGray)));
          }
        }
        FieldKind::Choice { options, selected } => {
          let value = options.get(*selected).map(String::as_str).unwrap_or("");
          let style = if focused {
            Style::default().fg(Color::Yellow)
          } else {
            Style::default()
          };
          spans.push(Span::styled(format!("< {} >", value), style));
        }
      }
      lines.push(Line::from(spans));
    }

    if let Some(error) = &self.error {
      lines.push(Line::raw(""));
      lines.push(Line::styled(format!("  {}", error), Style::default().fg(Color::Red)));
    } else if self.busy {
      lines.push(Line::raw(""));
      lines.push(Line::styled("  Saving...", Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
  }
}
