//! Integration tests against a local mock backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use taskdeck_core::api::{ApiClient, ApiError};
use taskdeck_core::auth::{
    AuthState, CredentialStore, FileCredentialStore, SessionStore,
};
use taskdeck_core::models::{ProjectRequest, StatusFilter, TaskFilter, TaskRequest};

const TOKEN: &str = "jwt-1";

#[derive(Default)]
struct MockState {
    progress_calls: AtomicUsize,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"}))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("admin@demo.com"), Some("123456")) => {
            Json(json!({"token": TOKEN, "email": "admin@demo.com"})).into_response()
        }
        (Some("crash@demo.com"), _) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"}))).into_response(),
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    match body["email"].as_str() {
        Some("admin@demo.com") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Email already registered"})),
        )
            .into_response(),
        Some(email) => Json(json!({"token": "jwt-new", "email": email})).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn list_projects(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"id": 1, "title": "Garden", "description": "Spring planting", "userId": 1},
        {"id": 2, "title": "Garage", "description": null, "userId": 1}
    ]))
    .into_response()
}

async fn create_project(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": 3, "title": body["title"], "description": body.get("description"), "userId": 1})),
    )
        .into_response()
}

async fn get_project(headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != 1 {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Project not found"}))).into_response();
    }
    Json(json!({"id": 1, "title": "Garden", "description": "Spring planting", "userId": 1}))
        .into_response()
}

async fn delete_project(headers: HeaderMap, Path(_id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Rate-limits the first two calls to exercise the client's backoff
async fn progress(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.progress_calls.fetch_add(1, Ordering::SeqCst) < 2 {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    Json(json!({"totalTasks": 4, "completedTasks": 1, "progressPercentage": 25.0})).into_response()
}

/// Echoes the query back inside the page so tests can see what was sent
async fn filter_tasks(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let completed = query.get("completed").map(|c| c == "true").unwrap_or(false);
    Json(json!({
        "content": [
            {"id": 10, "title": format!("search={}", query.get("search").cloned().unwrap_or_default()),
             "description": query.get("sortBy"), "dueDate": "2025-05-01",
             "completed": completed, "projectId": 1}
        ],
        "pageNumber": page,
        "pageSize": 10,
        "totalElements": 11,
        "totalPages": 2,
        "first": page == 0,
        "last": page == 1
    }))
    .into_response()
}

async fn tasks_for_project(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let project_id: i64 = query.get("projectId").and_then(|p| p.parse().ok()).unwrap_or(0);
    Json(json!([
        {"id": 10, "title": "Dig", "completed": true, "projectId": project_id},
        {"id": 11, "title": "Plant", "completed": false, "projectId": project_id}
    ]))
    .into_response()
}

async fn update_task(headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut task = body;
    task["id"] = json!(id);
    Json(task).into_response()
}

async fn spawn_backend() -> String {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project).delete(delete_project))
        .route("/api/projects/{id}/progress", get(progress))
        .route("/api/tasks", get(tasks_for_project))
        .route("/api/tasks/filter", get(filter_tasks))
        .route("/api/tasks/{id}", axum::routing::put(update_task))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

async fn client() -> ApiClient {
    ApiClient::new(&spawn_backend().await)
        .unwrap()
        .with_initial_backoff(Duration::from_millis(1))
}

// ============================================================================
// Session over HTTP
// ============================================================================

#[tokio::test]
async fn test_login_persists_and_survives_restart() {
    let api = client().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    let mut session = SessionStore::new(
        Arc::new(FileCredentialStore::new(path.clone())),
        Arc::new(api.clone()),
    );
    session.initialize().await;
    assert_eq!(session.state(), &AuthState::Unauthenticated);

    session.login("admin@demo.com", "123456").await.unwrap();
    assert_eq!(session.token(), Some(TOKEN));

    let mut restarted = SessionStore::new(
        Arc::new(FileCredentialStore::new(path.clone())),
        Arc::new(api),
    );
    restarted.initialize().await;
    assert_eq!(restarted.identity().unwrap().email, "admin@demo.com");
    assert_eq!(restarted.token(), Some(TOKEN));

    restarted.logout();
    let store = FileCredentialStore::new(path);
    assert_eq!(store.get("token").unwrap(), None);
}

#[tokio::test]
async fn test_login_rejection_carries_backend_message() {
    let mut session = SessionStore::new(
        Arc::new(taskdeck_core::auth::MemoryCredentialStore::new()),
        Arc::new(client().await),
    );
    session.initialize().await;

    let err = session.login("admin@demo.com", "wrong").await.unwrap_err();
    assert_eq!(err.message(), "Bad credentials");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_server_error_without_body_uses_fallback() {
    let mut session = SessionStore::new(
        Arc::new(taskdeck_core::auth::MemoryCredentialStore::new()),
        Arc::new(client().await),
    );
    session.initialize().await;

    let err = session.login("crash@demo.com", "x").await.unwrap_err();
    assert_eq!(err.message(), "Login failed");
}

#[tokio::test]
async fn test_register_paths() {
    let mut session = SessionStore::new(
        Arc::new(taskdeck_core::auth::MemoryCredentialStore::new()),
        Arc::new(client().await),
    );
    session.initialize().await;

    let err = session.register("admin@demo.com", "pw").await.unwrap_err();
    assert_eq!(err.message(), "Email already registered");

    session.register("new@demo.com", "pw").await.unwrap();
    assert_eq!(session.identity().unwrap().email, "new@demo.com");
    assert_eq!(session.token(), Some("jwt-new"));
}

// ============================================================================
// Data endpoints
// ============================================================================

#[tokio::test]
async fn test_data_requests_need_the_token() {
    let api = client().await;
    let err = api.list_projects().await.unwrap_err();
    assert!(matches!(err, ApiError::MissingToken));

    let wrong = api.with_token("stale".to_string());
    let err = wrong.list_projects().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.payload_message(), Some("Invalid token"));
}

#[tokio::test]
async fn test_project_crud() {
    let api = client().await.with_token(TOKEN.to_string());

    let projects = api.list_projects().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[1].description, None);

    let created = api
        .create_project(&ProjectRequest::new("Attic", "Clear it out"))
        .await
        .unwrap();
    assert_eq!(created.id, 3);
    assert_eq!(created.title, "Attic");

    let err = api.get_project(99).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.payload_message(), Some("Project not found"));

    api.delete_project(2).await.unwrap();
}

#[tokio::test]
async fn test_filter_sends_query_parameters() {
    let api = client().await.with_token(TOKEN.to_string());

    let mut filter = TaskFilter::new(1);
    filter.search = "seeds".to_string();
    filter.status = StatusFilter::Done;
    filter.sort_by = taskdeck_core::models::TaskSortColumn::Title;
    filter.page = 1;

    let page = api.filter_tasks(&filter).await.unwrap();
    assert_eq!(page.page_number, 1);
    assert!(page.last);
    assert!(!page.first);
    assert_eq!(page.content[0].title, "search=seeds");
    assert_eq!(page.content[0].description.as_deref(), Some("title"));
    assert!(page.content[0].completed);
}

#[tokio::test]
async fn test_overview_retries_rate_limited_progress() {
    let api = client().await.with_token(TOKEN.to_string());

    let (project, page, progress) = api.fetch_project_overview(&TaskFilter::new(1)).await.unwrap();
    assert_eq!(project.title, "Garden");
    assert_eq!(page.total_elements, 11);
    assert_eq!(progress.percent(), 25);
}

#[tokio::test]
async fn test_toggle_task_completion() {
    let api = client().await.with_token(TOKEN.to_string());

    let tasks = api.tasks_for_project(1).await.unwrap();
    assert_eq!(tasks.len(), 2);
    let open = tasks.iter().find(|t| !t.completed).unwrap();

    let updated = api.update_task(open.id, &open.toggled()).await.unwrap();
    assert_eq!(updated.id, 11);
    assert!(updated.completed);

    let created = TaskRequest::from_form(1, "Weed", "", "").unwrap();
    assert!(!created.completed);
}
