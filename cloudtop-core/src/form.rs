//! Multi-field form state machine
//!
//! Drives the create/edit workflows every screen reuses: an ordered list of
//! text fields, a single focus pointer cycling modulo the field count, and
//! submit/cancel routing. Field content is not interpreted until submit;
//! typed accessors parse integers and booleans at that point and report
//! failures as field-level errors without committing any state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// One editable text field.
#[derive(Debug, Clone)]
pub struct Field {
    label: String,
    value: String,
    placeholder: String,
    char_limit: usize,
    /// Cursor position as a byte index into `value`.
    cursor: usize,
}

impl Field {
    /// Create a field with an empty value.
    pub fn new(label: impl Into<String>, placeholder: impl Into<String>, char_limit: usize) -> Self {
        Self {
            label: label.into(),
            value: String::new(),
            placeholder: placeholder.into(),
            char_limit,
            cursor: 0,
        }
    }

    /// Create a field pre-populated with a value, cursor at the end.
    pub fn with_value(self, value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self {
            value,
            cursor,
            ..self
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn insert_char(&mut self, c: char) -> bool {
        if self.value.chars().count() >= self.char_limit {
            return false;
        }
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        true
    }

    fn delete_char_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let char_start = self.value[..self.cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.value.replace_range(char_start..self.cursor, "");
        self.cursor = char_start;
        true
    }

    fn delete_char_at(&mut self) -> bool {
        if self.cursor >= self.value.len() {
            return false;
        }
        let end = self.value[self.cursor..]
            .char_indices()
            .nth(1)
            .map(|(i, _)| self.cursor + i)
            .unwrap_or(self.value.len());
        self.value.replace_range(self.cursor..end, "");
        true
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            let mut pos = self.cursor - 1;
            while pos > 0 && !self.value.is_char_boundary(pos) {
                pos -= 1;
            }
            self.cursor = pos;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.value.len() {
            let mut pos = self.cursor + 1;
            while pos < self.value.len() && !self.value.is_char_boundary(pos) {
                pos += 1;
            }
            self.cursor = pos;
        }
    }
}

/// Whether the form was opened to create a new entity or edit an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// How the form state machine routed a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKey {
    /// Focus moved to another field.
    Cycled,
    /// The focused field's text changed.
    Edited,
    /// `enter`: the screen should validate and submit.
    Submit,
    /// `esc`: the screen should discard the form.
    Cancel,
    /// Consumed without effect.
    Ignored,
}

/// A parse failure tied to one field, rendered inline while the form stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: usize,
    pub message: String,
}

/// Ordered fields plus a single focus pointer.
///
/// Invariant: `0 <= focus < fields.len()`; focus wraps modulo the field count
/// on cycle. Only the focused field receives character edits.
#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<Field>,
    focus: usize,
    mode: FormMode,
    target_id: Option<String>,
    error: Option<FieldError>,
}

impl FormState {
    /// Create a form, focusing field 0.
    ///
    /// `target_id` identifies the entity being edited; `None` for create.
    pub fn new(mode: FormMode, fields: Vec<Field>, target_id: Option<String>) -> Self {
        debug_assert!(!fields.is_empty());
        Self {
            fields,
            focus: 0,
            mode,
            target_id,
            error: None,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&FieldError> {
        self.error.as_ref()
    }

    /// Raw text of field `i`.
    pub fn value(&self, i: usize) -> &str {
        self.fields[i].value()
    }

    /// Move focus forward, wrapping modulo the field count.
    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    /// Move focus backward, wrapping modulo the field count.
    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Route one key press through the form.
    ///
    /// Tab/shift+tab cycle focus; esc cancels; enter asks the screen to
    /// submit; everything else is forwarded verbatim to the focused field's
    /// text-edit primitive. Editing clears any previous field error.
    pub fn handle_key(&mut self, key: &KeyEvent) -> FormKey {
        match key.code {
            KeyCode::Tab => {
                self.focus_next();
                FormKey::Cycled
            }
            KeyCode::BackTab => {
                self.focus_prev();
                FormKey::Cycled
            }
            KeyCode::Esc => FormKey::Cancel,
            KeyCode::Enter => FormKey::Submit,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.fields[self.focus].insert_char(c) {
                    self.error = None;
                    FormKey::Edited
                } else {
                    FormKey::Ignored
                }
            }
            KeyCode::Backspace => {
                if self.fields[self.focus].delete_char_before() {
                    self.error = None;
                    FormKey::Edited
                } else {
                    FormKey::Ignored
                }
            }
            KeyCode::Delete => {
                if self.fields[self.focus].delete_char_at() {
                    self.error = None;
                    FormKey::Edited
                } else {
                    FormKey::Ignored
                }
            }
            KeyCode::Left => {
                self.fields[self.focus].move_left();
                FormKey::Ignored
            }
            KeyCode::Right => {
                self.fields[self.focus].move_right();
                FormKey::Ignored
            }
            KeyCode::Home => {
                self.fields[self.focus].cursor = 0;
                FormKey::Ignored
            }
            KeyCode::End => {
                self.fields[self.focus].cursor = self.fields[self.focus].value.len();
                FormKey::Ignored
            }
            _ => FormKey::Ignored,
        }
    }

    /// Record a parse failure against field `i`; the form stays open.
    pub fn set_error(&mut self, field: usize, message: impl Into<String>) {
        self.error = Some(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Field `i` parsed as an integer.
    pub fn int_value(&self, i: usize) -> Result<i64, FieldError> {
        self.fields[i].value().trim().parse().map_err(|_| FieldError {
            field: i,
            message: format!("{} must be a number", self.fields[i].label()),
        })
    }

    /// Field `i` parsed as a boolean.
    ///
    /// Defaults to `true` unless the literal case-insensitive string "false"
    /// was typed.
    pub fn bool_value(&self, i: usize) -> bool {
        !self.fields[i].value().trim().eq_ignore_ascii_case("false")
    }

    /// Field `i` as non-empty trimmed text.
    pub fn required(&self, i: usize) -> Result<String, FieldError> {
        let value = self.fields[i].value().trim();
        if value.is_empty() {
            Err(FieldError {
                field: i,
                message: format!("{} is required", self.fields[i].label()),
            })
        } else {
            Ok(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{char_key, key};

    fn sample_form() -> FormState {
        FormState::new(
            FormMode::Create,
            vec![
                Field::new("Name", "Repository name", 64),
                Field::new("URL", "https://...", 128),
                Field::new("Priority", "0-100", 8),
                Field::new("Enabled", "true/false", 8).with_value("true"),
            ],
            None,
        )
    }

    #[test]
    fn test_tab_cycles_modulo_field_count() {
        let mut form = sample_form();
        let len = form.fields().len();

        for k in 1..=10 {
            form.handle_key(&key("tab"));
            assert_eq!(form.focus(), k % len);
        }
    }

    #[test]
    fn test_shift_tab_cycles_backward() {
        let mut form = sample_form();
        form.handle_key(&key("shift+tab"));
        assert_eq!(form.focus(), 3);
        form.handle_key(&key("shift+tab"));
        assert_eq!(form.focus(), 2);
    }

    #[test]
    fn test_typing_goes_to_focused_field_only() {
        let mut form = sample_form();
        form.handle_key(&char_key('a'));
        form.handle_key(&key("tab"));
        form.handle_key(&char_key('b'));

        assert_eq!(form.value(0), "a");
        assert_eq!(form.value(1), "b");
        assert_eq!(form.value(2), "");
    }

    #[test]
    fn test_backspace_and_cursor() {
        let mut form = FormState::new(
            FormMode::Create,
            vec![Field::new("Name", "", 32).with_value("hello")],
            None,
        );
        assert_eq!(form.handle_key(&key("backspace")), FormKey::Edited);
        assert_eq!(form.value(0), "hell");

        form.handle_key(&key("home"));
        assert_eq!(form.handle_key(&key("backspace")), FormKey::Ignored);

        form.handle_key(&key("delete"));
        assert_eq!(form.value(0), "ell");
    }

    #[test]
    fn test_char_limit_rejects_insert() {
        let mut form = FormState::new(
            FormMode::Create,
            vec![Field::new("Short", "", 2)],
            None,
        );
        assert_eq!(form.handle_key(&char_key('a')), FormKey::Edited);
        assert_eq!(form.handle_key(&char_key('b')), FormKey::Edited);
        assert_eq!(form.handle_key(&char_key('c')), FormKey::Ignored);
        assert_eq!(form.value(0), "ab");
    }

    #[test]
    fn test_enter_and_esc_routing() {
        let mut form = sample_form();
        assert_eq!(form.handle_key(&key("enter")), FormKey::Submit);
        assert_eq!(form.handle_key(&key("esc")), FormKey::Cancel);
    }

    #[test]
    fn test_int_value_parse_failure() {
        let mut form = sample_form();
        for c in "abc".chars() {
            form.handle_key(&key("tab"));
            form.handle_key(&key("tab"));
            form.handle_key(&char_key(c));
            // back to field 2 for next char
            form.handle_key(&key("shift+tab"));
            form.handle_key(&key("shift+tab"));
        }
        // focus field 2 directly and check the typed value
        assert_eq!(form.value(2), "abc");
        let err = form.int_value(2).unwrap_err();
        assert_eq!(err.field, 2);
    }

    #[test]
    fn test_bool_value_defaults_true() {
        let form = FormState::new(
            FormMode::Create,
            vec![
                Field::new("Enabled", "", 8),
                Field::new("Enabled", "", 8).with_value("FALSE"),
                Field::new("Enabled", "", 8).with_value("yes"),
            ],
            None,
        );
        assert!(form.bool_value(0));
        assert!(!form.bool_value(1));
        assert!(form.bool_value(2));
    }

    #[test]
    fn test_required_rejects_empty() {
        let form = sample_form();
        assert!(form.required(0).is_err());

        let form = FormState::new(
            FormMode::Create,
            vec![Field::new("Name", "", 32).with_value("  teamA  ")],
            None,
        );
        assert_eq!(form.required(0).unwrap(), "teamA");
    }

    #[test]
    fn test_editing_clears_error() {
        let mut form = sample_form();
        form.set_error(2, "Priority must be a number");
        assert!(form.error().is_some());

        form.handle_key(&char_key('5'));
        assert!(form.error().is_none());
    }

    #[test]
    fn test_utf8_editing() {
        let mut form = FormState::new(
            FormMode::Create,
            vec![Field::new("Name", "", 32).with_value("héllo")],
            None,
        );
        form.handle_key(&key("backspace"));
        form.handle_key(&key("backspace"));
        form.handle_key(&key("backspace"));
        form.handle_key(&key("backspace"));
        assert_eq!(form.value(0), "h");
    }
}
