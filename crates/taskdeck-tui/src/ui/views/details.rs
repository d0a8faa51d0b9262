use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use taskdeck_core::models::Task;
use taskdeck_core::utils::{format_due_date, truncate};

use crate::app::{App, AppState};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Project header
            Constraint::Length(3), // Progress gauge
            Constraint::Length(1), // Filter bar
            Constraint::Min(5),    // Tasks
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_progress(frame, app, chunks[1]);
    render_filter_bar(frame, app, chunks[2]);
    render_tasks(frame, app, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.project {
        Some(ref project) => vec![
            Line::from(Span::styled(format!(" {}", project.title), styles::highlight_style())),
            Line::from(Span::styled(
                format!(" {}", project.description_display()),
                styles::muted_style(),
            )),
        ],
        None => vec![Line::from(Span::styled(" Loading project...", styles::muted_style()))],
    };

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Progress ")
                .title_style(styles::title_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .gauge_style(styles::gauge_style())
        .ratio(app.progress.ratio())
        .label(app.progress.summary());
    frame.render_widget(gauge, area);
}

fn render_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let filter = &app.task_filter;
    let searching = matches!(app.state, AppState::Searching);

    let search = if searching {
        format!("{}▌", app.search_input)
    } else if filter.search.is_empty() {
        "-".to_string()
    } else {
        filter.search.clone()
    };

    let line = Line::from(vec![
        Span::styled(" [/] ", styles::help_key_style()),
        Span::styled(
            search,
            if searching {
                styles::search_style()
            } else {
                styles::list_item_style()
            },
        ),
        Span::styled("  [f] ", styles::help_key_style()),
        Span::raw(filter.status.label()),
        Span::styled("  [s] ", styles::help_key_style()),
        Span::raw(filter.sort_by.label()),
        Span::styled("  [S] ", styles::help_key_style()),
        Span::raw(filter.direction.as_str()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn task_line(task: &Task, today: chrono::NaiveDate, title_width: usize) -> Line<'static> {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let title_style = if task.completed {
        styles::completed_style()
    } else {
        styles::list_item_style()
    };
    let due_style = if task.is_overdue(today) {
        styles::error_style()
    } else {
        styles::muted_style()
    };

    Line::from(vec![
        Span::styled(format!("{} ", mark), styles::success_style()),
        Span::styled(
            format!("{:<width$}", truncate(&task.title, title_width), width = title_width),
            title_style,
        ),
        Span::styled(format!(" {}", format_due_date(task.due_date)), due_style),
    ])
}

fn render_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let today = Local::now().date_naive();
    // checkbox + due date column + borders
    let title_width = (area.width as usize).saturating_sub(4 + 14 + 4).max(8);

    let items: Vec<ListItem> = app
        .tasks
        .content
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let item = ListItem::new(task_line(task, today, title_width));
            if i == app.task_selection {
                item.style(styles::selected_style())
            } else {
                item
            }
        })
        .collect();

    let block = Block::default()
        .title(format!(" Tasks ({}) ", app.tasks.total_elements))
        .title_style(styles::title_style())
        .title_bottom(Line::from(Span::styled(
            format!(" {}  [ ] prev/next ", app.tasks.label()),
            styles::muted_style(),
        )))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if items.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(" No tasks match.", styles::muted_style())),
            Line::from(vec![
                Span::styled(" Press ", styles::muted_style()),
                Span::styled("a", styles::help_key_style()),
                Span::styled(" to add one.", styles::muted_style()),
            ]),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    state.select(Some(app.task_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(completed: bool, due: Option<NaiveDate>) -> Task {
        Task {
            id: 1,
            title: "Plant tomatoes".to_string(),
            description: None,
            due_date: due,
            completed,
            project_id: 1,
        }
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_task_line_marks_completion_and_due_date() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 5, 1);

        let open = text(&task_line(&task(false, due), today, 10));
        assert!(open.starts_with("[ ] Plant t..."));
        assert!(open.ends_with("May 01, 2025"));

        let done = text(&task_line(&task(true, None), today, 20));
        assert!(done.starts_with("[x] Plant tomatoes"));
        assert!(done.ends_with("No due date"));
    }
}
