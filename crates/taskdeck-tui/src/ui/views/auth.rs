use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use taskdeck_core::Route;

use crate::app::{App, LoginFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::{button_line, field_line};

/// Interior width of the input boxes
const FIELD_WIDTH: usize = 28;

/// Login and register share one form; the route picks the action.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let registering = app.router.current() == Route::Register;
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(50, height, area);

    let (title, button, switch_hint) = if registering {
        (" Create Account ", "Register", "Have an account? [F2] Sign in")
    } else {
        (" Sign In ", "  Login ", "New here? [F2] Register")
    };

    let masked = "*".repeat(app.login_password.chars().count());

    let mut lines = vec![
        Line::from(""),
        field_line("Email", &app.login_email, app.login_focus == LoginFocus::Email, FIELD_WIDTH),
        field_line("Password", &masked, app.login_focus == LoginFocus::Password, FIELD_WIDTH),
        Line::from(""),
        button_line(button, app.login_focus == LoginFocus::Button),
        Line::from(""),
        Line::from(Span::styled(format!("  {}", switch_hint), styles::muted_style())),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
