//! Core library for taskdeck.
//!
//! - `api`: REST client for the projects/tasks backend
//! - `auth`: credential persistence, the auth gateway seam and `SessionStore`
//! - `routing`: route table, route guards and the `Router`
//! - `models`: projects, tasks, progress and paging types
//! - `config`: on-disk application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routing;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthGateway, AuthState, CredentialStore, Session, SessionStore, UserIdentity};
pub use config::Config;
pub use routing::{GuardDecision, Route, RouteGuard, Router, View};
