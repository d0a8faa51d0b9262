//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Screens with text fields receive every
//! character, so the global `q`/`?` keys only apply to list screens.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use taskdeck_core::{Route, View};

use crate::app::{
    can_add_email_char, can_add_password_char, App, AppState, DeleteTarget, FormField, ItemForm,
    LoginFocus, PAGE_SCROLL_SIZE,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle delete confirmation
    if let AppState::ConfirmingDelete(target) = app.state {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Normal;
                match target {
                    DeleteTarget::Project(id) => app.delete_project(id).await,
                    DeleteTarget::Task(id) => app.delete_task(id).await,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::Searching) {
        return handle_search_input(app, key).await;
    }

    if matches!(app.state, AppState::AddingTask) {
        return handle_task_form_input(app, key).await;
    }

    let route = match app.view {
        View::Loading => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.state = AppState::ConfirmingQuit;
            }
            return Ok(false);
        }
        View::Show(route) => route,
    };

    // Text entry screens
    match route {
        Route::Login | Route::Register => return handle_auth_form_input(app, key).await,
        Route::NewProject => return handle_project_form_input(app, key).await,
        _ => {}
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('L') if app.session.is_authenticated() => {
            app.logout();
            return Ok(false);
        }
        _ => {}
    }

    match route {
        Route::Home => handle_home_input(app, key),
        Route::Projects => handle_projects_input(app, key).await?,
        Route::ProjectDetails(_) => handle_details_input(app, key).await?,
        Route::Login | Route::Register | Route::NewProject => {}
    }

    Ok(false)
}

fn handle_home_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('l') | KeyCode::Enter => app.navigate(Route::Login),
        KeyCode::Char('r') => app.navigate(Route::Register),
        _ => {}
    }
}

async fn handle_auth_form_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.login_error = None;
            app.navigate(Route::Home);
        }
        KeyCode::F(2) => {
            // Switch between sign in and register
            let other = if app.router.current() == Route::Register {
                Route::Login
            } else {
                Route::Register
            };
            app.login_error = None;
            app.navigate(other);
        }
        KeyCode::Down | KeyCode::Tab => app.login_focus = app.login_focus.next(),
        KeyCode::Up | KeyCode::BackTab => app.login_focus = app.login_focus.prev(),
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.submit_auth_form().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

/// Shared key handling for the project and task forms.
/// Returns true when the form should be submitted.
fn edit_form(form: &mut ItemForm, key: KeyEvent, with_due_date: bool) -> bool {
    match key.code {
        KeyCode::Down | KeyCode::Tab => form.focus = form.focus.next(with_due_date),
        KeyCode::Up | KeyCode::BackTab => form.focus = form.focus.prev(with_due_date),
        KeyCode::Enter => {
            if form.focus == FormField::Button {
                return true;
            }
            form.focus = form.focus.next(with_due_date);
        }
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
    false
}

async fn handle_project_form_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Esc {
        app.navigate(Route::Projects);
        return Ok(false);
    }
    if edit_form(&mut app.project_form, key, false) {
        app.submit_project_form().await;
    }
    Ok(false)
}

async fn handle_task_form_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Esc {
        app.task_form = ItemForm::default();
        app.state = AppState::Normal;
        return Ok(false);
    }
    if edit_form(&mut app.task_form, key, true) {
        app.submit_task_form().await;
    }
    Ok(false)
}

async fn handle_search_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.search_input = app.task_filter.search.clone();
        }
        KeyCode::Enter => {
            app.state = AppState::Normal;
            app.apply_search().await;
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => {
            if !c.is_control() {
                app.search_input.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_projects_input(app: &mut App, key: KeyEvent) -> Result<()> {
    let max_index = app.projects.len().saturating_sub(1);

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.project_selection = app.project_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.project_selection = (app.project_selection + 1).min(max_index);
        }
        KeyCode::PageUp => {
            app.project_selection = app.project_selection.saturating_sub(PAGE_SCROLL_SIZE);
        }
        KeyCode::PageDown => {
            app.project_selection = (app.project_selection + PAGE_SCROLL_SIZE).min(max_index);
        }
        KeyCode::Home => app.project_selection = 0,
        KeyCode::End => app.project_selection = max_index,
        KeyCode::Enter => {
            if let Some(id) = app.selected_project().map(|p| p.id) {
                app.navigate(Route::ProjectDetails(id));
            }
        }
        KeyCode::Char('n') => app.navigate(Route::NewProject),
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.selected_project().map(|p| p.id) {
                app.state = AppState::ConfirmingDelete(DeleteTarget::Project(id));
            }
        }
        KeyCode::Char('r') => {
            app.load_projects().await;
            app.status_message = Some("Projects refreshed".to_string());
        }
        _ => {}
    }
    Ok(())
}

async fn handle_details_input(app: &mut App, key: KeyEvent) -> Result<()> {
    let max_index = app.tasks.content.len().saturating_sub(1);

    match key.code {
        KeyCode::Esc | KeyCode::Backspace => app.navigate(Route::Projects),
        KeyCode::Up | KeyCode::Char('k') => {
            app.task_selection = app.task_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.task_selection = (app.task_selection + 1).min(max_index);
        }
        KeyCode::Char(' ') => app.toggle_selected_task().await,
        KeyCode::Char('a') => app.start_add_task(),
        KeyCode::Char('x') | KeyCode::Delete => {
            if let Some(id) = app.selected_task().map(|t| t.id) {
                app.state = AppState::ConfirmingDelete(DeleteTarget::Task(id));
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = app.project.as_ref().map(|p| p.id) {
                app.state = AppState::ConfirmingDelete(DeleteTarget::Project(id));
            }
        }
        KeyCode::Char('/') => {
            app.search_input = app.task_filter.search.clone();
            app.state = AppState::Searching;
        }
        KeyCode::Char('f') => app.cycle_status_filter().await,
        KeyCode::Char('s') => app.cycle_sort_column().await,
        KeyCode::Char('S') => app.toggle_sort_direction().await,
        KeyCode::Char(']') | KeyCode::PageDown => app.next_page().await,
        KeyCode::Char('[') | KeyCode::PageUp => app.prev_page().await,
        KeyCode::Char('r') => {
            app.load_project_details().await;
            app.status_message = Some("Project refreshed".to_string());
        }
        _ => {}
    }
    Ok(())
}
