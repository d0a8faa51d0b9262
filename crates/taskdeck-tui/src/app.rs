//! Application state management for Taskdeck.
//!
//! This module contains the `App` struct: the session store, the router,
//! per-screen form and list state, and the background channel that
//! delivers the restored session.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use taskdeck_core::auth::{CredentialStore, PersistedCredential, SessionStore};
use taskdeck_core::models::{
    Page, Progress, Project, ProjectRequest, Task, TaskFilter, TaskRequest, ValidationError,
};
use taskdeck_core::utils::is_plausible_email;
use taskdeck_core::{ApiClient, ApiError, Config, Route, Router, View};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for email input (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for project and task titles.
const MAX_TITLE_LENGTH: usize = 120;

/// Maximum length for descriptions.
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// `YYYY-MM-DD`
const MAX_DATE_LENGTH: usize = 10;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please sign in again.";

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state (overlays and modal input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    AddingTask,
    ShowingHelp,
    ConfirmingDelete(DeleteTarget),
    ConfirmingQuit,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Project(i64),
    Task(i64),
}

/// Login/register form focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
        }
    }
}

/// Field focus shared by the project and task forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    Button,
}

impl FormField {
    /// Next field; `with_due_date` is false for the project form.
    pub fn next(&self, with_due_date: bool) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description if with_due_date => FormField::DueDate,
            FormField::Description => FormField::Button,
            FormField::DueDate => FormField::Button,
            FormField::Button => FormField::Title,
        }
    }

    pub fn prev(&self, with_due_date: bool) -> Self {
        match self {
            FormField::Title => FormField::Button,
            FormField::Description => FormField::Title,
            FormField::DueDate => FormField::Description,
            FormField::Button if with_due_date => FormField::DueDate,
            FormField::Button => FormField::Description,
        }
    }
}

/// Title/description/due-date form state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub focus: FormField,
    pub error: Option<String>,
}

impl Default for ItemForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            focus: FormField::Title,
            error: None,
        }
    }
}

impl ItemForm {
    /// Type into the focused field, respecting its length limit.
    pub fn push_char(&mut self, c: char) {
        let (field, max) = match self.focus {
            FormField::Title => (&mut self.title, MAX_TITLE_LENGTH),
            FormField::Description => (&mut self.description, MAX_DESCRIPTION_LENGTH),
            FormField::DueDate => (&mut self.due_date, MAX_DATE_LENGTH),
            FormField::Button => return,
        };
        if can_add_char(field.chars().count(), max, c) {
            field.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            FormField::Title => {
                self.title.pop();
            }
            FormField::Description => {
                self.description.pop();
            }
            FormField::DueDate => {
                self.due_date.pop();
            }
            FormField::Button => {}
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results delivered to the main loop from spawned tasks
enum BackgroundResult {
    /// The persisted credential has been read (or found missing)
    SessionRestored(Option<PersistedCredential>),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,
    pub router: Router,

    // What was drawn last; data is loaded when this changes
    pub view: View,
    pub state: AppState,

    // Login/register form
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Projects screen
    pub projects: Vec<Project>,
    pub project_selection: usize,

    // New project screen
    pub project_form: ItemForm,

    // Project details screen
    pub project: Option<Project>,
    pub tasks: Page<Task>,
    pub progress: Progress,
    pub task_filter: TaskFilter,
    pub task_selection: usize,
    pub search_input: String,
    pub task_form: ItemForm,

    // Status message
    pub status_message: Option<String>,

    // Background task channel
    background_rx: mpsc::Receiver<BackgroundResult>,
    background_tx: mpsc::Sender<BackgroundResult>,
}

impl App {
    /// Create a new application instance. The session starts `Pending`;
    /// call `start_session_restore` to resolve it.
    pub fn new(config: Config, credentials: Arc<dyn CredentialStore>, initial: Route) -> Result<Self> {
        let api = ApiClient::new(&config.api_base_url)?;
        debug!(base_url = %api.base_url(), "API client configured");

        let session = SessionStore::new(credentials, Arc::new(api.clone()));
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill from env vars or config
        let login_email = std::env::var("TASKDECK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var("TASKDECK_PASSWORD").unwrap_or_default();

        let task_filter = TaskFilter::new(0).with_page_size(config.page_size);

        Ok(Self {
            config,
            session,
            api,
            router: Router::new(initial),

            view: View::Loading,
            state: AppState::Normal,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            projects: Vec::new(),
            project_selection: 0,

            project_form: ItemForm::default(),

            project: None,
            tasks: Page::default(),
            progress: Progress::default(),
            task_filter,
            task_selection: 0,
            search_input: String::new(),
            task_form: ItemForm::default(),

            status_message: None,

            background_rx: rx,
            background_tx: tx,
        })
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Read the persisted credential on a background task. Until it arrives
    /// the router shows the loading screen.
    pub fn start_session_restore(&self) {
        let tx = self.background_tx.clone();
        let credentials = self.session.credentials();
        tokio::spawn(async move {
            let loaded = SessionStore::read_persisted(credentials).await;
            if tx.send(BackgroundResult::SessionRestored(loaded)).await.is_err() {
                warn!("App dropped before session restore finished");
            }
        });
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.background_rx.try_recv() {
            match result {
                BackgroundResult::SessionRestored(loaded) => {
                    self.session.finish_initialization(loaded);
                    self.adopt_session_token();
                }
            }
        }
    }

    /// Keep the API client's bearer token in step with the session.
    fn adopt_session_token(&mut self) {
        match self.session.token() {
            Some(token) => self.api.set_token(token.to_string()),
            None => self.api.clear_token(),
        }
    }

    pub fn signed_in_email(&self) -> Option<&str> {
        self.session.identity().map(|i| i.email.as_str())
    }

    /// Submit the login or register form, depending on the current route.
    pub async fn submit_auth_form(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some(ValidationError::MissingCredentials.to_string());
            return;
        }
        if !is_plausible_email(&email) {
            self.login_error = Some("Enter a valid email address".to_string());
            return;
        }

        self.login_error = None;
        let registering = self.router.current() == Route::Register;
        let result = if registering {
            self.session.register(&email, &password).await
        } else {
            self.session.login(&email, &password).await
        };

        match result {
            Ok(()) => {
                self.adopt_session_token();
                self.login_password.clear();
                self.config.last_email = self.signed_in_email().map(str::to_string);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.status_message = self
                    .signed_in_email()
                    .map(|email| format!("Signed in as {}", email));
            }
            Err(e) => {
                self.login_password.clear();
                self.login_focus = LoginFocus::Password;
                self.login_error = Some(e.message().to_string());
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.adopt_session_token();
        self.clear_user_data();
        self.state = AppState::Normal;
        self.status_message = Some("Signed out".to_string());
    }

    fn clear_user_data(&mut self) {
        self.projects.clear();
        self.project_selection = 0;
        self.project = None;
        self.tasks = Page::default();
        self.progress = Progress::default();
        self.project_form = ItemForm::default();
        self.task_form = ItemForm::default();
    }

    /// Report an API failure. A rejected token ends the session, and the
    /// router then sends the user to the login screen.
    fn handle_api_error(&mut self, context: &str, err: ApiError) {
        if err.is_unauthorized() {
            warn!(context, "Token rejected by backend, ending session");
            self.session.logout();
            self.adopt_session_token();
            self.clear_user_data();
            self.state = AppState::Normal;
            self.router.set_notice(SESSION_EXPIRED_NOTICE);
            self.status_message = Some(SESSION_EXPIRED_NOTICE.to_string());
            return;
        }

        warn!(context, error = %err, "API request failed");
        let detail = err
            .payload_message()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        self.status_message = Some(format!("{}: {}", context, detail));
    }

    // =========================================================================
    // Routing
    // =========================================================================

    pub fn navigate(&mut self, route: Route) {
        self.state = AppState::Normal;
        self.router.navigate(route);
    }

    /// Run the route guard for this frame and load data for a newly shown view.
    pub async fn update_view(&mut self) {
        let view = self.router.resolve(self.session.state());
        if view == self.view {
            return;
        }
        debug!(?view, "View changed");
        self.view = view;

        if let View::Show(route) = view {
            self.enter_route(route).await;
        }
    }

    async fn enter_route(&mut self, route: Route) {
        match route {
            Route::Home => {}
            Route::Login | Route::Register => {
                self.login_error = self.router.take_notice();
                self.login_focus = if self.login_email.is_empty() {
                    LoginFocus::Email
                } else {
                    LoginFocus::Password
                };
            }
            Route::Projects => self.load_projects().await,
            Route::NewProject => self.project_form = ItemForm::default(),
            Route::ProjectDetails(id) => {
                self.task_filter = TaskFilter::new(id).with_page_size(self.config.page_size);
                self.search_input.clear();
                self.task_selection = 0;
                self.project = None;
                self.load_project_details().await;
            }
        }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub async fn load_projects(&mut self) {
        match self.api.list_projects().await {
            Ok(projects) => {
                debug!(count = projects.len(), "Projects loaded");
                self.projects = projects;
                self.project_selection = self
                    .project_selection
                    .min(self.projects.len().saturating_sub(1));
            }
            Err(e) => self.handle_api_error("Failed to load projects", e),
        }
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.projects.get(self.project_selection)
    }

    pub async fn submit_project_form(&mut self) {
        let request = ProjectRequest::new(&self.project_form.title, &self.project_form.description);
        if let Err(e) = request.validate() {
            self.project_form.error = Some(e.to_string());
            self.project_form.focus = FormField::Title;
            return;
        }

        match self.api.create_project(&request).await {
            Ok(project) => {
                info!(id = project.id, "Project created");
                self.status_message = Some(format!("Created '{}'", project.title));
                self.project_form = ItemForm::default();
                self.navigate(Route::ProjectDetails(project.id));
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    self.project_form.error =
                        Some(e.payload_message().unwrap_or("Failed to create project").to_string());
                }
                self.handle_api_error("Failed to create project", e);
            }
        }
    }

    pub async fn delete_project(&mut self, id: i64) {
        match self.api.delete_project(id).await {
            Ok(()) => {
                info!(id, "Project deleted");
                self.projects.retain(|p| p.id != id);
                self.project_selection = self
                    .project_selection
                    .min(self.projects.len().saturating_sub(1));
                self.status_message = Some("Project deleted".to_string());
                if self.router.current() == Route::ProjectDetails(id) {
                    self.navigate(Route::Projects);
                }
            }
            Err(e) => self.handle_api_error("Failed to delete project", e),
        }
    }

    // =========================================================================
    // Project details / tasks
    // =========================================================================

    pub async fn load_project_details(&mut self) {
        match self.api.fetch_project_overview(&self.task_filter).await {
            Ok((project, tasks, progress)) => {
                debug!(id = project.id, tasks = tasks.content.len(), "Project loaded");
                self.project = Some(project);
                self.tasks = tasks;
                self.progress = progress;
                self.clamp_task_selection();
            }
            Err(e) => self.handle_api_error("Failed to load project details", e),
        }
    }

    /// Reload only the task page (after a filter, sort or page change).
    pub async fn reload_tasks(&mut self) {
        match self.api.filter_tasks(&self.task_filter).await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.clamp_task_selection();
            }
            Err(e) => self.handle_api_error("Failed to load tasks", e),
        }
    }

    async fn reload_progress(&mut self) {
        match self.api.project_progress(self.task_filter.project_id).await {
            Ok(progress) => self.progress = progress,
            Err(e) => self.handle_api_error("Failed to load progress", e),
        }
    }

    fn clamp_task_selection(&mut self) {
        self.task_selection = self
            .task_selection
            .min(self.tasks.content.len().saturating_sub(1));
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.content.get(self.task_selection)
    }

    pub async fn toggle_selected_task(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        match self.api.update_task(task.id, &task.toggled()).await {
            Ok(updated) => {
                debug!(id = updated.id, completed = updated.completed, "Task toggled");
                if let Some(slot) = self.tasks.content.get_mut(self.task_selection) {
                    *slot = updated;
                }
                self.reload_progress().await;
            }
            Err(e) => self.handle_api_error("Failed to update task", e),
        }
    }

    pub fn start_add_task(&mut self) {
        self.task_form = ItemForm::default();
        self.state = AppState::AddingTask;
    }

    pub async fn submit_task_form(&mut self) {
        let request = match TaskRequest::from_form(
            self.task_filter.project_id,
            &self.task_form.title,
            &self.task_form.description,
            &self.task_form.due_date,
        ) {
            Ok(request) => request,
            Err(e) => {
                self.task_form.focus = match e {
                    ValidationError::InvalidDueDate(_) => FormField::DueDate,
                    _ => FormField::Title,
                };
                self.task_form.error = Some(e.to_string());
                return;
            }
        };

        match self.api.create_task(&request).await {
            Ok(task) => {
                info!(id = task.id, "Task created");
                self.status_message = Some(format!("Added '{}'", task.title));
                self.task_form = ItemForm::default();
                self.state = AppState::Normal;
                self.reload_tasks().await;
                self.reload_progress().await;
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    self.task_form.error =
                        Some(e.payload_message().unwrap_or("Failed to create task").to_string());
                }
                self.handle_api_error("Failed to create task", e);
            }
        }
    }

    pub async fn delete_task(&mut self, id: i64) {
        match self.api.delete_task(id).await {
            Ok(()) => {
                info!(id, "Task deleted");
                self.status_message = Some("Task deleted".to_string());
                self.reload_tasks().await;
                self.reload_progress().await;
            }
            Err(e) => self.handle_api_error("Failed to delete task", e),
        }
    }

    pub async fn apply_search(&mut self) {
        self.task_filter.search = self.search_input.trim().to_string();
        self.task_filter.page = 0;
        self.task_selection = 0;
        self.reload_tasks().await;
    }

    pub async fn cycle_status_filter(&mut self) {
        self.task_filter.status = self.task_filter.status.next();
        self.task_filter.page = 0;
        self.reload_tasks().await;
    }

    pub async fn cycle_sort_column(&mut self) {
        self.task_filter.sort_by = self.task_filter.sort_by.next();
        self.reload_tasks().await;
    }

    pub async fn toggle_sort_direction(&mut self) {
        self.task_filter.direction = self.task_filter.direction.toggle();
        self.reload_tasks().await;
    }

    pub async fn next_page(&mut self) {
        if !self.tasks.last {
            self.task_filter.page += 1;
            self.task_selection = 0;
            self.reload_tasks().await;
        }
    }

    pub async fn prev_page(&mut self) {
        if !self.tasks.first && self.task_filter.page > 0 {
            self.task_filter.page -= 1;
            self.task_selection = 0;
            self.reload_tasks().await;
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

fn can_add_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    can_add_char(current_len, MAX_EMAIL_LENGTH, c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    can_add_char(current_len, MAX_PASSWORD_LENGTH, c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::auth::{AuthState, MemoryCredentialStore};

    fn app_with(credentials: Arc<MemoryCredentialStore>, initial: Route) -> App {
        App::new(Config::default(), credentials, initial).unwrap()
    }

    fn seeded() -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        PersistedCredential {
            token: "jwt".to_string(),
            email: "admin@demo.com".to_string(),
        }
        .save(store.as_ref())
        .unwrap();
        store
    }

    /// Wait for the spawned restore task to report back
    async fn drain_restore(app: &mut App) {
        for _ in 0..100 {
            app.check_background_tasks();
            if app.session.is_initialized() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("session restore never completed");
    }

    // -------------------------------------------------------------------------
    // Session gating
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_loading_until_restore_completes() {
        let mut app = app_with(Arc::new(MemoryCredentialStore::new()), Route::Projects);

        app.update_view().await;
        assert_eq!(app.view, View::Loading);
        assert_eq!(app.router.current(), Route::Projects);

        app.start_session_restore();
        drain_restore(&mut app).await;
        app.update_view().await;

        assert_eq!(app.session.state(), &AuthState::Unauthenticated);
        assert_eq!(app.view, View::Show(Route::Login));
    }

    #[tokio::test]
    async fn test_restored_session_sets_token() {
        let mut app = app_with(seeded(), Route::Home);
        app.start_session_restore();
        drain_restore(&mut app).await;

        assert!(app.session.is_authenticated());
        assert!(app.api.has_token());
        assert_eq!(app.signed_in_email(), Some("admin@demo.com"));
    }

    #[tokio::test]
    async fn test_logout_redirects_to_login() {
        let credentials = seeded();
        let mut app = app_with(credentials.clone(), Route::Login);
        app.start_session_restore();
        drain_restore(&mut app).await;

        app.logout();
        assert!(!app.api.has_token());
        assert_eq!(PersistedCredential::load(credentials.as_ref()).unwrap(), None);

        app.update_view().await;
        assert_eq!(app.view, View::Show(Route::Login));
    }

    #[tokio::test]
    async fn test_empty_login_form_is_rejected_locally() {
        let mut app = app_with(Arc::new(MemoryCredentialStore::new()), Route::Login);
        app.login_email.clear();
        app.login_password.clear();

        app.submit_auth_form().await;
        assert_eq!(app.login_error.as_deref(), Some("Email and password are required"));

        app.login_email = "not-an-email".to_string();
        app.login_password = "pw".to_string();
        app.submit_auth_form().await;
        assert_eq!(app.login_error.as_deref(), Some("Enter a valid email address"));
    }

    #[tokio::test]
    async fn test_expired_token_ends_session_with_notice() {
        let mut app = app_with(seeded(), Route::Projects);
        app.start_session_restore();
        drain_restore(&mut app).await;

        app.handle_api_error(
            "Failed to load projects",
            ApiError::Unauthorized(Default::default()),
        );
        assert!(!app.session.is_authenticated());

        app.update_view().await;
        assert_eq!(app.view, View::Show(Route::Login));
        assert_eq!(app.login_error.as_deref(), Some(SESSION_EXPIRED_NOTICE));
    }

    // -------------------------------------------------------------------------
    // Forms
    // -------------------------------------------------------------------------

    #[test]
    fn test_login_focus_cycles() {
        assert_eq!(LoginFocus::Email.next(), LoginFocus::Password);
        assert_eq!(LoginFocus::Button.next(), LoginFocus::Email);
        assert_eq!(LoginFocus::Email.prev(), LoginFocus::Button);
    }

    #[test]
    fn test_form_field_cycles() {
        assert_eq!(FormField::Description.next(true), FormField::DueDate);
        assert_eq!(FormField::Description.next(false), FormField::Button);
        assert_eq!(FormField::Button.prev(true), FormField::DueDate);
        assert_eq!(FormField::Button.prev(false), FormField::Description);
        assert_eq!(FormField::Button.next(false), FormField::Title);
    }

    #[test]
    fn test_item_form_limits() {
        let mut form = ItemForm {
            focus: FormField::DueDate,
            ..ItemForm::default()
        };
        for c in "2025-01-011999".chars() {
            form.push_char(c);
        }
        assert_eq!(form.due_date, "2025-01-01");

        form.focus = FormField::Button;
        form.push_char('x');
        form.pop_char();
        assert_eq!(form.due_date, "2025-01-01");

        form.focus = FormField::Title;
        form.push_char('\n');
        assert!(form.title.is_empty());
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(253, '@'));
        assert!(!can_add_email_char(254, 'a'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(0, '\t'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(can_add_password_char(0, ' '));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
        assert!(!can_add_password_char(0, '\r'));
    }
}
