//! Client for the remote task service.
//!
//! [`TaskService`] is the seam the reconciler talks to; [`ApiClient`] is the
//! HTTP implementation. Every authenticated request goes through
//! [`ApiClient::request`], which attaches the bearer token.

use async_trait::async_trait;
use chrono::{NaiveDate, SecondsFormat};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::task::PRIORITY_RANGE;
use crate::core::{Column, Folder, FolderDetail, FolderId, Scope, Task, TaskId, User};
use crate::{tdlog_debug, tdlog_trace, Error, Result};

/// Body of a task create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<FolderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Partial update of a task's descriptive fields.
///
/// `due_date: Some(None)` clears the date (sent as JSON `null`); `None`
/// leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Validation("nothing to update".to_string()));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("title cannot be empty".to_string()));
            }
        }
        if let Some(priority) = self.priority {
            if !PRIORITY_RANGE.contains(&priority) {
                return Err(Error::Validation(format!(
                    "priority must be between {} and {}",
                    PRIORITY_RANGE.start(),
                    PRIORITY_RANGE.end()
                )));
            }
        }
        Ok(())
    }
}

/// Turn a `YYYY-MM-DD` day into the UTC-midnight timestamp the service
/// stores, e.g. `2025-03-01T00:00:00.000Z`.
pub fn due_date_from_day(day: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid due date '{}', expected YYYY-MM-DD", day)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Validation(format!("invalid due date '{}'", day)))?
        .and_utc();
    Ok(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct ProfileBody<'a> {
    username: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Operations the reconciler needs from the task service.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn create_task(&self, new_task: &NewTask) -> Result<Task>;

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<()>;

    async fn update_status(&self, id: TaskId, status: Column) -> Result<()>;

    async fn delete_task(&self, id: TaskId) -> Result<()>;

    async fn list_folders(&self) -> Result<Vec<Folder>>;

    async fn folder_detail(&self, id: FolderId) -> Result<FolderDetail>;

    async fn create_folder(&self, title: &str) -> Result<Folder>;

    async fn current_user(&self) -> Result<User>;

    async fn update_profile(&self, username: &str) -> Result<User>;

    /// Full listing behind a board scope.
    async fn list_scope(&self, scope: Scope) -> Result<Vec<Task>> {
        match scope {
            Scope::Inbox => self.list_tasks().await,
            Scope::Folder(id) => Ok(self.folder_detail(id).await?.notes),
        }
    }
}

/// HTTP implementation of [`TaskService`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request, attaching `Authorization: Bearer <token>` when
    /// signed in.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tdlog_trace!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = api_message(&body, status);
        tdlog_debug!("API error status={} message={}", status.as_u16(), message);
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        Ok(Self::send(builder).await?.json::<T>().await?)
    }

    /// Exchange credentials for an access token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let builder = self
            .http
            .post(self.url("/token"))
            .form(&[("username", email), ("password", password)]);
        let token: TokenResponse = Self::send_json(builder).await?;
        Ok(token.access_token)
    }

    /// Register a new account. Does not sign in.
    pub async fn signup(&self, email: &str, password: &str) -> Result<User> {
        let builder = self
            .http
            .post(self.url("/users/"))
            .json(&SignupBody { email, password });
        Self::send_json(builder).await
    }
}

#[async_trait]
impl TaskService for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Self::send_json(self.request(Method::GET, "/notes/")).await
    }

    async fn create_task(&self, new_task: &NewTask) -> Result<Task> {
        Self::send_json(self.request(Method::POST, "/notes/").json(new_task)).await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<()> {
        let path = format!("/notes/{}", id);
        Self::send(self.request(Method::PUT, &path).json(patch)).await?;
        Ok(())
    }

    async fn update_status(&self, id: TaskId, status: Column) -> Result<()> {
        let path = format!("/notes/{}/status", id);
        let body = StatusBody {
            status: status.as_str(),
        };
        Self::send(self.request(Method::PUT, &path).json(&body)).await?;
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        let path = format!("/notes/{}", id);
        Self::send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        Self::send_json(self.request(Method::GET, "/notebooks/")).await
    }

    async fn folder_detail(&self, id: FolderId) -> Result<FolderDetail> {
        let path = format!("/notebooks/{}/", id);
        Self::send_json(self.request(Method::GET, &path)).await
    }

    async fn create_folder(&self, title: &str) -> Result<Folder> {
        let body = TitleBody { title };
        Self::send_json(self.request(Method::POST, "/notebooks/").json(&body)).await
    }

    async fn current_user(&self) -> Result<User> {
        Self::send_json(self.request(Method::GET, "/me")).await
    }

    async fn update_profile(&self, username: &str) -> Result<User> {
        let body = ProfileBody { username };
        Self::send_json(self.request(Method::PUT, "/me").json(&body)).await
    }
}

/// Pick a readable message out of an error body: a `message` or `detail`
/// field, else the raw text, else the status reason.
fn api_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
