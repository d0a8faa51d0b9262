//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionStore`: the authentication state (`Pending`, `Authenticated`,
//!   `Unauthenticated`) and the login/register/logout operations
//! - `AuthGateway`: the network calls behind login and register
//! - `CredentialStore`: durable key-value storage for the token and email,
//!   backed by a JSON file, the OS keychain, or memory

pub mod credentials;
pub mod gateway;
pub mod session;
pub mod store;

use thiserror::Error;

pub use credentials::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
    PersistedCredential, StoreError,
};
pub use gateway::{AuthGateway, AuthGrant};
pub use session::{AuthState, Session, UserIdentity};
pub use store::SessionStore;

/// Failure of a login or register attempt, ready to show to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{message}")]
    CredentialRejected { message: String },
}

impl AuthError {
    pub fn message(&self) -> &str {
        match self {
            AuthError::CredentialRejected { message } => message,
        }
    }
}
