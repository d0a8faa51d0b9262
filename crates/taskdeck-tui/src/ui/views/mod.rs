//! Per-route screens.

pub mod auth;
pub mod details;
pub mod home;
pub mod project_form;
pub mod projects;

use ratatui::text::{Line, Span};

use super::styles;

/// The last `width` characters, so the text being typed stays visible.
pub fn visible_tail(value: &str, width: usize) -> String {
    let count = value.chars().count();
    value.chars().skip(count.saturating_sub(width)).collect()
}

/// A labelled single-line input: `   Title: [value▌        ]`
pub fn field_line(label: &str, value: &str, focused: bool, width: usize) -> Line<'static> {
    let cursor = if focused { "▌" } else { " " };
    let shown = visible_tail(value, width.saturating_sub(1));
    Line::from(vec![
        Span::styled(format!("  {:>8}: [", label), styles::muted_style()),
        Span::styled(
            format!("{}{}{}", shown, cursor, " ".repeat(width.saturating_sub(shown.chars().count() + 1))),
            styles::field_style(focused),
        ),
        Span::styled("]", styles::muted_style()),
    ])
}

pub fn button_line(label: &str, focused: bool) -> Line<'static> {
    let text = if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    Line::from(vec![
        Span::raw("            ["),
        Span::styled(text, styles::field_style(focused)),
        Span::raw("]"),
    ])
}
