//! Modal confirm dialogs
//!
//! A dialog is a degenerate form with zero fields: enter confirms, esc
//! cancels, and every other key is swallowed. While a dialog is open no key
//! reaches the underlying list or table.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// How a key press resolved against an open dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKey {
    /// `enter`: resolve the dialog's confirm path.
    Confirmed,
    /// `esc`: dismiss without effect.
    Cancelled,
    /// Any other key: consumed, state untouched.
    Captured,
}

/// Route a key press for an open dialog.
pub fn route_modal_key(key: &KeyEvent) -> ModalKey {
    match key.code {
        KeyCode::Enter => ModalKey::Confirmed,
        KeyCode::Esc => ModalKey::Cancelled,
        _ => ModalKey::Captured,
    }
}

/// Calculate a centered rectangle within an area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Render a centered confirm panel over whatever was drawn before it.
pub fn render_confirm(frame: &mut Frame, area: Rect, title: &str, body: &[String]) {
    let height = (body.len() as u16).saturating_add(4).min(area.height);
    let modal_area = centered_rect(52, height, area);
    frame.render_widget(Clear, modal_area);

    let mut lines: Vec<Line> = body.iter().map(|l| Line::raw(l.as_str())).collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Enter: confirm   Esc: cancel",
        Style::default().fg(Color::DarkGray),
    ));

    let panel = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title.to_string()),
    );
    frame.render_widget(panel, modal_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{char_key, key, RenderHarness};

    #[test]
    fn test_enter_confirms_esc_cancels() {
        assert_eq!(route_modal_key(&key("enter")), ModalKey::Confirmed);
        assert_eq!(route_modal_key(&key("esc")), ModalKey::Cancelled);
    }

    #[test]
    fn test_other_keys_are_captured() {
        for c in ['a', 'd', 'q', 'r', 'y', 'n'] {
            assert_eq!(route_modal_key(&char_key(c)), ModalKey::Captured);
        }
        assert_eq!(route_modal_key(&key("tab")), ModalKey::Captured);
        assert_eq!(route_modal_key(&key("up")), ModalKey::Captured);
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 80, 24);
        let centered = centered_rect(40, 10, area);
        assert_eq!(centered.x, 20);
        assert_eq!(centered.y, 7);
        assert_eq!(centered.width, 40);
        assert_eq!(centered.height, 10);
    }

    #[test]
    fn test_centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 30, 10);
        let centered = centered_rect(100, 50, area);
        assert!(centered.width <= 28);
        assert!(centered.height <= 8);
    }

    #[test]
    fn test_render_confirm_shows_prompt() {
        let mut harness = RenderHarness::new(80, 24);
        let output = harness.render_to_string(|frame| {
            render_confirm(
                frame,
                frame.area(),
                "Confirm Delete",
                &["Delete repository teamA?".to_string()],
            );
        });

        assert!(output.contains("Confirm Delete"));
        assert!(output.contains("Delete repository teamA?"));
        assert!(output.contains("Enter: confirm"));
    }
}
