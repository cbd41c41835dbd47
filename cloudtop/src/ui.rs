//! Shared render helpers
//!
//! Every screen draws the same chrome: title, content panel, status line,
//! help line, and an optional form or confirm dialog on top. Keeping these
//! here keeps the per-screen render functions small and uniform.

use cloudtop_core::form::FormState;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Spinner frame for the given tick count.
pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Split a screen area into title / content / status / help rows.
pub fn screen_layout(area: Rect) -> (Rect, Rect, Rect, Rect) {
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);
    (rows[0], rows[1], rows[2], rows[3])
}

/// Draw the screen title.
pub fn render_title(frame: &mut Frame, area: Rect, title: &str) {
    frame.render_widget(
        Paragraph::new(Line::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        area,
    );
}

/// Draw the status line: error (if any) wins over the status message.
pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    loading: bool,
    tick: usize,
    error: Option<&str>,
    status: &str,
) {
    let line = if let Some(error) = error {
        Line::styled(format!("Error: {error}"), Style::default().fg(Color::Red))
    } else if loading {
        Line::styled(
            format!("{} loading...", spinner_frame(tick)),
            Style::default().fg(Color::Yellow),
        )
    } else {
        Line::styled(status.to_string(), Style::default().fg(Color::Green))
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the key-hint line.
pub fn render_help(frame: &mut Frame, area: Rect, help: &str) {
    frame.render_widget(
        Paragraph::new(Line::styled(
            help.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
        area,
    );
}

/// Draw a bordered, highlighted selection list.
pub fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[String],
    selected: Option<usize>,
    empty_hint: &str,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                empty_hint.to_string(),
                Style::default().fg(Color::DarkGray),
            ))
            .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = rows.iter().map(|r| ListItem::new(r.as_str())).collect();
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw a form panel: one row per field with a focus marker, then the
/// field-level error (if any) and the submit/cancel hint.
pub fn render_form(frame: &mut Frame, area: Rect, title: &str, form: &FormState) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, field) in form.fields().iter().enumerate() {
        let marker = if i == form.focus() { "> " } else { "  " };
        let shown = if field.value().is_empty() {
            Span::styled(
                field.placeholder().to_string(),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::raw(field.value().to_string())
        };
        let label_style = if i == form.focus() {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{}: ", field.label()), label_style),
            shown,
        ]));
    }
    lines.push(Line::raw(""));
    if let Some(error) = form.error() {
        lines.push(Line::styled(
            error.message.clone(),
            Style::default().fg(Color::Red),
        ));
    }
    lines.push(Line::styled(
        "Enter: save   Esc: cancel   Tab: next field   Shift+Tab: previous field",
        Style::default().fg(Color::DarkGray),
    ));

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string()),
    );
    frame.render_widget(panel, area);
}
