//! The HTTP client against a local axum server standing in for the task
//! service: paths, methods, bodies, the bearer header, and how error
//! responses surface.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use taskdeck::api::{ApiClient, NewTask, TaskPatch, TaskService};
use taskdeck::auth;
use taskdeck::core::{Column, FolderId, Scope, TaskId};
use taskdeck::Error;

const TOKEN: &str = "tok-1";

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    auth: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    fn push(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: String) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            auth,
            body,
        });
    }

    fn all(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> Recorded {
        self.all().pop().expect("no request recorded")
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Not authenticated" })),
    )
        .into_response()
}

async fn token(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body.clone());
    if body.contains("password=secret") {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect username or password" })),
        )
            .into_response()
    }
}

async fn users(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body.clone());
    let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let email = value["email"].as_str().unwrap_or_default().to_string();
    if email == "taken@example.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response();
    }
    Json(json!({ "id": 9, "email": email })).into_response()
}

async fn notes(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body.clone());
    if !authorized(&headers) {
        return unauthorized();
    }
    if method == Method::POST {
        let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        return Json(json!({
            "id": 42,
            "title": value["title"],
            "status": "TO DO",
            "priority": value["priority"],
            "category": value["category"],
            "user_id": 1
        }))
        .into_response();
    }
    Json(json!([
        { "id": 1, "title": "Write report", "status": "TO DO", "priority": 3,
          "category": "Work", "due_date": "2025-06-01T00:00:00.000Z", "user_id": 1 },
        { "id": 2, "title": "No priority", "status": "ONGOING", "user_id": 1 }
    ]))
    .into_response()
}

async fn note(
    State(rec): State<Recorder>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body);
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Note not found" })),
        )
            .into_response();
    }
    if method == Method::DELETE {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(json!({ "id": id })).into_response()
}

async fn note_status(
    State(rec): State<Recorder>,
    Path(_id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body);
    if !authorized(&headers) {
        return unauthorized();
    }
    // Plain-text success body; the client must not try to parse it.
    "updated".into_response()
}

async fn notebook(
    State(rec): State<Recorder>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": id,
        "title": "Garden",
        "notes": [
            { "id": 20, "title": "Water plants", "status": "TO DO", "priority": 2 }
        ]
    }))
    .into_response()
}

async fn me(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    rec.push(&method, &uri, &headers, body.clone());
    if !authorized(&headers) {
        return unauthorized();
    }
    let username = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["username"].as_str().map(str::to_string))
        .unwrap_or_else(|| "ada".to_string());
    Json(json!({ "id": 1, "email": "ada@example.com", "username": username })).into_response()
}

/// Start the server on an ephemeral port; returns its base URL.
async fn serve() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/token", post(token))
        .route("/users/", post(users))
        .route("/notes/", get(notes).post(notes))
        .route("/notes/{id}", put(note).delete(note))
        .route("/notes/{id}/status", put(note_status))
        .route("/notebooks/{id}/", get(notebook))
        .route("/me", get(me).put(me))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/", addr), recorder)
}

fn signed_in(base_url: &str) -> ApiClient {
    ApiClient::new(base_url).with_token(Some(TOKEN.to_string()))
}

#[tokio::test]
async fn test_login_posts_form_and_returns_token() {
    let (url, rec) = serve().await;
    let client = ApiClient::new(url);

    let token = auth::login(&client, "ada@example.com", "secret").await.unwrap();

    assert_eq!(token, TOKEN);
    let req = rec.last();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/token");
    assert!(req.body.contains("username=ada%40example.com"));
    assert!(req.auth.is_none());
}

#[tokio::test]
async fn test_bad_credentials_map_to_fixed_message() {
    let (url, _rec) = serve().await;
    let client = ApiClient::new(url);

    let err = auth::login(&client, "ada@example.com", "wrong")
        .await
        .unwrap_err();

    match &err {
        Error::Api { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Incorrect username or password");
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(
        auth::describe_failure(&err),
        "Failed to sign in. Please check your credentials."
    );
}

#[tokio::test]
async fn test_signup_then_login() {
    let (url, rec) = serve().await;
    let client = ApiClient::new(url);

    let (user, token) = auth::signup(&client, "new@example.com", "secret", "secret")
        .await
        .unwrap();

    assert_eq!(user.email, "new@example.com");
    assert_eq!(token, TOKEN);
    let paths: Vec<String> = rec.all().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/users/", "/token"]);
}

#[tokio::test]
async fn test_signup_conflict_maps_to_fixed_message() {
    let (url, rec) = serve().await;
    let client = ApiClient::new(url);

    let err = auth::signup(&client, "taken@example.com", "secret", "secret")
        .await
        .unwrap_err();

    assert_eq!(
        auth::describe_failure(&err),
        "Failed to create account. Email may already be in use."
    );
    assert_eq!(rec.all().len(), 1, "no login after a failed signup");
}

#[tokio::test]
async fn test_signup_mismatch_never_sends() {
    let (url, rec) = serve().await;
    let client = ApiClient::new(url);

    let err = auth::signup(&client, "new@example.com", "secret", "secrets")
        .await
        .unwrap_err();

    assert_eq!(auth::describe_failure(&err), "Passwords do not match.");
    assert!(rec.all().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}", addr));
    let err = auth::login(&client, "ada@example.com", "secret")
        .await
        .unwrap_err();

    assert_eq!(
        auth::describe_failure(&err),
        "Network error. Please check your connection and ensure the backend server is running."
    );
}

#[tokio::test]
async fn test_list_sends_bearer_and_defaults_priority() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    let tasks = client.list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].category.as_deref(), Some("Work"));
    assert_eq!(tasks[0].due_day(), Some("2025-06-01"));
    assert_eq!(tasks[1].priority, 1);
    assert_eq!(tasks[1].column(), Some(Column::Ongoing));

    let req = rec.last();
    assert_eq!(req.path, "/notes/");
    assert_eq!(req.auth.as_deref(), Some("Bearer tok-1"));
}

#[tokio::test]
async fn test_missing_token_is_rejected_by_server() {
    let (url, _rec) = serve().await;
    let client = ApiClient::new(url);

    let err = client.list_tasks().await.unwrap_err();

    assert_eq!(err.to_string(), "API error (401): Not authenticated");
}

#[tokio::test]
async fn test_create_sends_json_body() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    let created = client
        .create_task(&NewTask {
            title: "Plant tulips".to_string(),
            notebook_id: Some(FolderId(7)),
            priority: Some(2),
            category: Some("Garden".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(created.id, TaskId(42));
    assert_eq!(created.priority, 2);
    let body: Value = serde_json::from_str(&rec.last().body).unwrap();
    assert_eq!(body["title"], "Plant tulips");
    assert_eq!(body["notebook_id"], 7);
    assert_eq!(body["category"], "Garden");
}

#[tokio::test]
async fn test_status_update_body_and_plain_response() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    client.update_status(TaskId(5), Column::Done).await.unwrap();

    let req = rec.last();
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path, "/notes/5/status");
    let body: Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body, json!({ "status": "DONE" }));
}

#[tokio::test]
async fn test_patch_clears_due_date_with_null() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    let patch = TaskPatch {
        title: Some("Renamed".to_string()),
        due_date: Some(None),
        ..Default::default()
    };
    client.update_task(TaskId(3), &patch).await.unwrap();

    let req = rec.last();
    assert_eq!(req.path, "/notes/3");
    let body: Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["title"], "Renamed");
    assert!(body["due_date"].is_null());
    assert!(body.as_object().unwrap().contains_key("due_date"));
    assert!(!body.as_object().unwrap().contains_key("category"));
}

#[tokio::test]
async fn test_not_found_carries_detail() {
    let (url, _rec) = serve().await;
    let client = signed_in(&url);

    let err = client.delete_task(TaskId(404)).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "API error (404): Note not found");
}

#[tokio::test]
async fn test_delete_accepts_no_content() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    client.delete_task(TaskId(8)).await.unwrap();

    let req = rec.last();
    assert_eq!(req.method, "DELETE");
    assert_eq!(req.path, "/notes/8");
}

#[tokio::test]
async fn test_folder_scope_reads_notes() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    let tasks = client.list_scope(Scope::Folder(FolderId(7))).await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Water plants");
    assert_eq!(rec.last().path, "/notebooks/7/");
}

#[tokio::test]
async fn test_profile_round_trip() {
    let (url, rec) = serve().await;
    let client = signed_in(&url);

    let user = client.current_user().await.unwrap();
    assert_eq!(user.display_name(), "ada");

    let user = client.update_profile("lovelace").await.unwrap();
    assert_eq!(user.username.as_deref(), Some("lovelace"));
    let req = rec.last();
    assert_eq!(req.method, "PUT");
    assert_eq!(req.path, "/me");
}
