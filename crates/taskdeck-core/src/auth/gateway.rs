use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";

/// Successful `/auth/login` or `/auth/register` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub email: String,
}

/// Network side of authentication.
///
/// Failures carry the backend's error payload; `ApiError::payload_message`
/// exposes its optional `message`.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;

    async fn register(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;
}

#[async_trait]
impl AuthGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        self.authenticate(LOGIN_PATH, email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        self.authenticate(REGISTER_PATH, email, password).await
    }
}
