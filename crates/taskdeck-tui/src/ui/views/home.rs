use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

/// Only reachable signed out; the guard sends signed-in users to projects.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect_fixed(48, 10, area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Taskdeck", styles::title_style())),
        Line::from(Span::styled(
            "  Projects and tasks from the terminal",
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    lines.push(Line::from(vec![
        Span::styled("  [l]", styles::help_key_style()),
        Span::styled(" Sign in", styles::help_desc_style()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("  [r]", styles::help_key_style()),
        Span::styled(" Create an account", styles::help_desc_style()),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("  {}", app.config.api_base_url),
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
