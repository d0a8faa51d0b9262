//! API client for the projects/tasks REST backend.
//!
//! `ApiClient` performs the credential calls used by the auth gateway and
//! every bearer-authenticated project and task request.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthGrant;
use crate::models::{Page, Progress, Project, ProjectRequest, Task, TaskFilter, TaskRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// API client for the task backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff_ms: u64,
}

impl ApiClient {
    /// Create a new API client for the given base URL (e.g. `http://localhost:8080/api`)
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    /// Shorten the 429 backoff (tests use a local server).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            initial_backoff_ms: self.initial_backoff_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str, ApiError> {
        self.token.as_deref().ok_or(ApiError::MissingToken)
    }

    // ===== Authentication =====

    /// `POST {path}` with `{email, password}`; a single attempt, never retried.
    pub async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, ApiError> {
        let url = self.url(path);
        debug!(%url, "Sending credential request");

        let response = self
            .client
            .post(&url)
            .json(&CredentialsBody { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }

    // ===== Response handling =====

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit
    /// (should retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(%url, error = %e, "Unexpected response body");
            ApiError::InvalidResponse(format!("{} from {}", e, url))
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let token = self.bearer()?;
        let mut retries = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            debug!(%url, "GET");
            let response = self
                .client
                .get(&url)
                .query(query)
                .bearer_auth(token)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Self::parse_json(response, &url).await,
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(%url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, %method, "Sending JSON");

        let response = self
            .client
            .request(method, &url)
            .bearer_auth(self.bearer()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(%url, "DELETE");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Projects =====

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/projects", &[]).await
    }

    pub async fn get_project(&self, id: i64) -> Result<Project, ApiError> {
        self.get(&format!("/projects/{}", id), &[]).await
    }

    pub async fn create_project(&self, request: &ProjectRequest) -> Result<Project, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.send_json(Method::POST, "/projects", request).await
    }

    pub async fn update_project(
        &self,
        id: i64,
        request: &ProjectRequest,
    ) -> Result<Project, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.send_json(Method::PUT, &format!("/projects/{}", id), request)
            .await
    }

    pub async fn delete_project(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/projects/{}", id)).await
    }

    pub async fn project_progress(&self, id: i64) -> Result<Progress, ApiError> {
        self.get(&format!("/projects/{}/progress", id), &[]).await
    }

    // ===== Tasks =====

    /// All tasks of a project, unpaged.
    pub async fn tasks_for_project(&self, project_id: i64) -> Result<Vec<Task>, ApiError> {
        self.get("/tasks", &[("projectId", project_id.to_string())])
            .await
    }

    pub async fn filter_tasks(&self, filter: &TaskFilter) -> Result<Page<Task>, ApiError> {
        self.get("/tasks/filter", &filter.query_pairs()).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.get(&format!("/tasks/{}", id), &[]).await
    }

    pub async fn create_task(&self, request: &TaskRequest) -> Result<Task, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.send_json(Method::POST, "/tasks", request).await
    }

    pub async fn update_task(&self, id: i64, request: &TaskRequest) -> Result<Task, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.send_json(Method::PUT, &format!("/tasks/{}", id), request)
            .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/tasks/{}", id)).await
    }

    /// Project, the requested task page and its progress, fetched concurrently.
    pub async fn fetch_project_overview(
        &self,
        filter: &TaskFilter,
    ) -> Result<(Project, Page<Task>, Progress), ApiError> {
        futures::try_join!(
            self.get_project(filter.project_id),
            self.filter_tasks(filter),
            self.project_progress(filter.project_id),
        )
    }
}
