use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use taskdeck_core::utils::truncate;

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_project_list(frame, app, chunks[0]);
    render_project_summary(frame, app, chunks[1]);
}

fn render_project_list(frame: &mut Frame, app: &App, area: Rect) {
    let name_width = (area.width as usize).saturating_sub(4);

    let items: Vec<ListItem> = app
        .projects
        .iter()
        .enumerate()
        .map(|(i, project)| {
            let style = if i == app.project_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(truncate(&project.title, name_width))).style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Projects ({}) ", app.projects.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if items.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(" No projects yet.", styles::muted_style())),
            Line::from(vec![
                Span::styled(" Press ", styles::muted_style()),
                Span::styled("n", styles::help_key_style()),
                Span::styled(" to create one.", styles::muted_style()),
            ]),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    state.select(Some(app.project_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_project_summary(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Details ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let lines = match app.selected_project() {
        Some(project) => vec![
            Line::from(Span::styled(project.title.clone(), styles::highlight_style())),
            Line::from(""),
            Line::from(project.description_display().to_string()),
            Line::from(""),
            Line::from(vec![
                Span::styled("[Enter]", styles::help_key_style()),
                Span::styled(" open  ", styles::muted_style()),
                Span::styled("[d]", styles::help_key_style()),
                Span::styled(" delete", styles::muted_style()),
            ]),
        ],
        None => vec![Line::from(Span::styled("Nothing selected", styles::muted_style()))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
