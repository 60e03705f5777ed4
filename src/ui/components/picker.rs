use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the picker that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  /// Index into the options passed to `show`
  Selected(usize),
  Cancelled,
}

/// Centered single-choice list, e.g. a role to assign
#[derive(Debug, Clone, Default)]
pub struct Picker {
  active: bool,
  title: String,
  options: Vec<String>,
  selected: usize,
}

impl Picker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, title: impl Into<String>, options: Vec<String>) {
    self.active = !options.is_empty();
    self.title = title.into();
    self.options = options;
    self.selected = 0;
  }

  fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let count = self.options.len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let index = self.selected;
        self.hide();
        KeyResult::Event(PickerEvent::Selected(index))
      }
      KeyCode::Char('j') | KeyCode::Down if count > 0 => {
        self.selected = (self.selected + 1) % count;
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up if count > 0 => {
        self.selected = (self.selected + count - 1) % count;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let widest = self
      .options
      .iter()
      .map(|o| o.len())
      .chain(std::iter::once(self.title.len()))
      .max()
      .unwrap_or(10);
    let width = (widest as u16 + 6).clamp(20, area.width.saturating_sub(4).max(20)).min(area.width);
    let height = (self.options.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|option| ListItem::new(Span::styled(option.as_str(), Style::default().fg(Color::Cyan))))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}
