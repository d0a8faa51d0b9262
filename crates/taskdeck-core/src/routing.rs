//! Route table and authentication guards.
//!
//! Every route is gated by a `RouteGuard`. Guards never decide while the
//! session is `Pending`: they neither render the view nor redirect, so a
//! restored session never flashes the login screen.

use tracing::{debug, warn};

use crate::auth::AuthState;

/// Redirect hops allowed in one resolve pass before giving up
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Projects,
    NewProject,
    ProjectDetails(i64),
}

impl Route {
    /// Where RequireAuth sends unauthenticated users
    pub const LOGIN_ENTRY: Route = Route::Login;

    /// Where RequireAnon sends authenticated users
    pub const LANDING: Route = Route::Projects;

    /// Parse a path like `/projects/42`. Unknown paths fall back to `Home`.
    pub fn parse(path: &str) -> Route {
        let segments: Vec<&str> = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["projects"] => Route::Projects,
            ["projects", "new"] => Route::NewProject,
            ["projects", id] => match id.parse() {
                Ok(id) => Route::ProjectDetails(id),
                Err(_) => Route::Home,
            },
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::NewProject => "/projects/new".to_string(),
            Route::ProjectDetails(id) => format!("/projects/{}", id),
        }
    }

    pub fn guard(&self) -> RouteGuard {
        match self {
            Route::Home | Route::Login | Route::Register => RouteGuard::RequireAnon,
            Route::Projects | Route::NewProject | Route::ProjectDetails(_) => {
                RouteGuard::RequireAuth
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Welcome",
            Route::Login => "Sign in",
            Route::Register => "Create account",
            Route::Projects => "Projects",
            Route::NewProject => "New project",
            Route::ProjectDetails(_) => "Project",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Protected view: signed-in users only
    RequireAuth,
    /// Public view: bounce signed-in users to the landing view
    RequireAnon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet; show nothing but a loading indicator
    Wait,
    Render,
    Redirect(Route),
}

impl RouteGuard {
    pub fn decide(&self, state: &AuthState) -> GuardDecision {
        match (self, state) {
            (_, AuthState::Pending) => GuardDecision::Wait,
            (RouteGuard::RequireAuth, AuthState::Authenticated(_)) => GuardDecision::Render,
            (RouteGuard::RequireAuth, AuthState::Unauthenticated) => {
                GuardDecision::Redirect(Route::LOGIN_ENTRY)
            }
            (RouteGuard::RequireAnon, AuthState::Authenticated(_)) => {
                GuardDecision::Redirect(Route::LANDING)
            }
            (RouteGuard::RequireAnon, AuthState::Unauthenticated) => GuardDecision::Render,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStatus {
    Pending,
    Authorized,
    Redirected,
}

/// A route plus its guard's state for one mounted view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedRoute {
    route: Route,
    guard: RouteGuard,
    status: GuardStatus,
}

impl GuardedRoute {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            guard: route.guard(),
            status: GuardStatus::Pending,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn status(&self) -> GuardStatus {
        self.status
    }

    /// Re-evaluate for one render pass.
    ///
    /// A redirect is returned only on the pass that moves the guard into
    /// `Redirected`; later passes with the same outcome yield `Wait`.
    pub fn evaluate(&mut self, state: &AuthState) -> GuardDecision {
        match self.guard.decide(state) {
            GuardDecision::Wait => GuardDecision::Wait,
            GuardDecision::Render => {
                self.status = GuardStatus::Authorized;
                GuardDecision::Render
            }
            GuardDecision::Redirect(_) if self.status == GuardStatus::Redirected => {
                GuardDecision::Wait
            }
            GuardDecision::Redirect(to) => {
                self.status = GuardStatus::Redirected;
                GuardDecision::Redirect(to)
            }
        }
    }
}

/// What the UI should draw this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Show(Route),
}

/// Current location plus a one-shot notice for the next view
/// (e.g. "Session expired").
#[derive(Debug)]
pub struct Router {
    current: GuardedRoute,
    notice: Option<String>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        Self {
            current: GuardedRoute::new(initial),
            notice: None,
        }
    }

    pub fn current(&self) -> Route {
        self.current.route()
    }

    pub fn guard_status(&self) -> GuardStatus {
        self.current.status()
    }

    /// Mount a new route with a fresh guard.
    pub fn navigate(&mut self, route: Route) {
        debug!(from = %self.current.route().path(), to = %route.path(), "Navigate");
        self.current = GuardedRoute::new(route);
    }

    /// Run the current guard, following redirects, and report what to draw.
    pub fn resolve(&mut self, state: &AuthState) -> View {
        for _ in 0..=MAX_REDIRECTS {
            match self.current.evaluate(state) {
                GuardDecision::Wait => return View::Loading,
                GuardDecision::Render => return View::Show(self.current.route()),
                GuardDecision::Redirect(to) => {
                    debug!(from = %self.current.route().path(), to = %to.path(), "Guard redirect");
                    self.current = GuardedRoute::new(to);
                }
            }
        }
        warn!(route = %self.current.route().path(), "Too many redirects");
        View::Loading
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}
