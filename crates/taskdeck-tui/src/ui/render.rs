use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use taskdeck_core::utils::truncate;
use taskdeck_core::{Route, View};

use crate::app::{App, AppState, DeleteTarget, FormField};

use super::styles;
use super::views::{self, auth, details, home, project_form, projects};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete(target) => render_delete_overlay(frame, app, target),
        AppState::AddingTask => render_task_form_overlay(frame, app),
        AppState::Normal | AppState::Searching | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.view {
        View::Loading => "  Taskdeck".to_string(),
        View::Show(route) => format!("  Taskdeck · {}", route.title()),
    };
    let right = match app.signed_in_email() {
        Some(email) => format!("{}  [?] Help", email),
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize)
                .saturating_sub(title.chars().count() + right.chars().count() + 2),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Loading => render_loading(frame, area),
        View::Show(route) => match route {
            Route::Home => home::render(frame, app, area),
            Route::Login | Route::Register => auth::render(frame, app, area),
            Route::Projects => projects::render(frame, app, area),
            Route::NewProject => project_form::render(frame, app, area),
            Route::ProjectDetails(_) => details::render(frame, app, area),
        },
    }
}

/// Shown while the persisted session is still being read
fn render_loading(frame: &mut Frame, area: Rect) {
    let area = centered_rect_fixed(30, 3, area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "  Restoring session...",
        styles::muted_style(),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    );
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.view {
        View::Loading => "[q]uit",
        View::Show(Route::Login | Route::Register) => "[F2] switch | [Esc] back",
        View::Show(Route::NewProject) => "[Esc] cancel",
        View::Show(Route::Home) => "[q]uit",
        View::Show(_) => "[L]ogout | [q]uit",
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.config.api_base_url),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(keys: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", keys), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 26, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Taskdeck", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("↑/↓ j/k", "Navigate list"),
        help_line("Enter", "Open project / submit form"),
        help_line("Tab", "Next form field"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Projects", styles::highlight_style())),
        help_line("n", "New project"),
        help_line("d", "Delete project"),
        help_line("r", "Refresh"),
        help_line("L", "Log out"),
        Line::from(""),
        Line::from(Span::styled(" Project Details", styles::highlight_style())),
        help_line("Space", "Toggle task done"),
        help_line("a / x", "Add / delete task"),
        help_line("/", "Search tasks"),
        help_line("f", "Cycle status filter"),
        help_line("s / S", "Sort column / direction"),
        help_line("[ / ]", "Previous / next page"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, question: String, action: &'static str) {
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(format!(" to {}, ", action), styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    render_confirm_overlay(frame, "Are you sure you want to quit?".to_string(), "quit");
}

fn render_delete_overlay(frame: &mut Frame, app: &App, target: DeleteTarget) {
    let question = match target {
        DeleteTarget::Project(id) => {
            let name = app
                .projects
                .iter()
                .find(|p| p.id == id)
                .or(app.project.as_ref().filter(|p| p.id == id))
                .map(|p| p.title.clone())
                .unwrap_or_else(|| format!("#{}", id));
            format!("Delete project '{}'?", truncate(&name, 22))
        }
        DeleteTarget::Task(id) => {
            let name = app
                .tasks
                .content
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| format!("#{}", id));
            format!("Delete task '{}'?", truncate(&name, 25))
        }
    };
    render_confirm_overlay(frame, question, "delete");
}

fn render_task_form_overlay(frame: &mut Frame, app: &App) {
    let form = &app.task_form;
    let height = if form.error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(60, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(""),
        views::field_line("Title", &form.title, form.focus == FormField::Title, 40),
        views::field_line(
            "Details",
            &form.description,
            form.focus == FormField::Description,
            40,
        ),
        views::field_line(
            "Due",
            &form.due_date,
            form.focus == FormField::DueDate,
            40,
        ),
        Line::from(Span::styled("            YYYY-MM-DD or blank", styles::muted_style())),
        Line::from(""),
        views::button_line("Add Task", form.focus == FormField::Button),
    ];

    if let Some(ref error) = form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(" New Task ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(50, 10, outer), Rect::new(25, 15, 50, 10));

        // Larger than the terminal is clamped
        let small = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_rect_fixed(50, 10, small), Rect::new(0, 0, 20, 5));
    }
}
