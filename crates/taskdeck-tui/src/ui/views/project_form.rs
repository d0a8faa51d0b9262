use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, FormField};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::{button_line, field_line};

const FIELD_WIDTH: usize = 40;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.project_form;
    let height = if form.error.is_some() { 10 } else { 8 };
    let area = centered_rect_fixed(60, height, area);

    let mut lines = vec![
        Line::from(""),
        field_line("Title", &form.title, form.focus == FormField::Title, FIELD_WIDTH),
        field_line(
            "Details",
            &form.description,
            form.focus == FormField::Description,
            FIELD_WIDTH,
        ),
        Line::from(""),
        button_line("Create", form.focus == FormField::Button),
    ];

    if let Some(ref error) = form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(" New Project ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
