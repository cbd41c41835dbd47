//! Test utilities
//!
//! Key-event constructors for driving screens in tests, plus a render
//! harness over ratatui's `TestBackend` for asserting on drawn output.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::{backend::TestBackend, Frame, Terminal};

/// Create a `KeyEvent` from a key string.
///
/// Supports single characters, named keys (`"enter"`, `"esc"`, `"tab"`,
/// `"shift+tab"`, `"backspace"`, `"delete"`, `"up"`, `"down"`, `"left"`,
/// `"right"`, `"home"`, `"end"`) and `"ctrl+X"` combinations.
///
/// # Panics
///
/// Panics on an unrecognized key string; intended for tests.
pub fn key(s: &str) -> KeyEvent {
    parse_key_string(s).unwrap_or_else(|| panic!("invalid key string: {s:?}"))
}

fn parse_key_string(s: &str) -> Option<KeyEvent> {
    let mut modifiers = KeyModifiers::empty();
    let mut rest = s;

    loop {
        if let Some(tail) = rest.strip_prefix("ctrl+") {
            modifiers |= KeyModifiers::CONTROL;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("alt+") {
            modifiers |= KeyModifiers::ALT;
            rest = tail;
        } else if rest == "shift+tab" {
            return Some(make_key(KeyCode::BackTab, modifiers | KeyModifiers::SHIFT));
        } else if let Some(tail) = rest.strip_prefix("shift+") {
            modifiers |= KeyModifiers::SHIFT;
            rest = tail;
        } else {
            break;
        }
    }

    let code = match rest {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        s if s.chars().count() == 1 => KeyCode::Char(s.chars().next()?),
        _ => return None,
    };
    Some(make_key(code, modifiers))
}

fn make_key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

/// Create a `KeyEvent` for a character with no modifiers.
pub fn char_key(c: char) -> KeyEvent {
    make_key(KeyCode::Char(c), KeyModifiers::empty())
}

/// Create a `KeyEvent` for a character with Ctrl held.
pub fn ctrl_key(c: char) -> KeyEvent {
    make_key(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Render harness backed by ratatui's `TestBackend`.
///
/// `render` is a pure function of state, so repeated draws of the same state
/// must produce the same buffer; tests rely on that.
pub struct RenderHarness {
    terminal: Terminal<TestBackend>,
}

impl RenderHarness {
    /// Create a harness with the given terminal size.
    pub fn new(width: u16, height: u16) -> Self {
        let backend = TestBackend::new(width, height);
        let terminal = Terminal::new(backend).expect("test backend");
        Self { terminal }
    }

    /// Draw with the closure and return the buffer as plain text.
    pub fn render_to_string(&mut self, draw: impl FnOnce(&mut Frame)) -> String {
        self.terminal.draw(draw).expect("draw");
        let buffer = self.terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }
}
