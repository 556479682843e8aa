use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::auth::dto::{AuthResponse, MessageResponse};
use crate::config::ClientConfig;
use crate::domain::{PublicUser, Task, TaskCategory, TaskPriority};
use crate::error::ErrorBody;

use super::normalize::normalize_task_list;
use super::ClientError;

/// Fields a user fills in to create a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub date: String,
    pub time: String,
}

/// Partial task update; absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u64>,
}

impl TaskUpdate {
    pub fn completion(time_spent: u64) -> Self {
        Self {
            is_completed: Some(true),
            time_spent: Some(time_spent),
            ..Self::default()
        }
    }
}

/// Task operations against the server, on behalf of the session's user.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Full task list, already normalized.
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError>;
    async fn create_task(&self, form: &TaskForm) -> Result<(), ClientError>;
    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> Result<(), ClientError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError>;
}

/// Credential exchange.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse, ClientError>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError>;
}

/// HTTP client for the JSON API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: None,
        }
    }

    /// Same client, sending `token` as the bearer credential.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.config.api_url(path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    pub async fn change_password(&self, password: &str) -> Result<String, ClientError> {
        let res = self
            .authed(Method::PUT, "/api/auth/password")?
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await?;
        let body: MessageResponse = read_json(res, "Failed to update password").await?;
        Ok(body.message)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        let res = self.authed(Method::GET, "/api/auth/me")?.send().await?;
        read_json(res, "Failed to load user").await
    }
}

/// Maps a non-success response to `ClientError::Api`, preferring the
/// server's own message over `fallback`.
async fn check(res: Response, fallback: &str) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(
    res: Response,
    fallback: &str,
) -> Result<T, ClientError> {
    let res = check(res, fallback).await?;
    let text = res.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let res = self.authed(Method::GET, "/api/tasks")?.send().await?;
        let raw: Value = read_json(res, "Failed to fetch tasks").await?;
        let tasks = normalize_task_list(raw);
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    async fn create_task(&self, form: &TaskForm) -> Result<(), ClientError> {
        let res = self.authed(Method::POST, "/api/tasks")?.json(form).send().await?;
        check(res, "Failed to create task").await?;
        Ok(())
    }

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> Result<(), ClientError> {
        let res = self
            .authed(Method::PUT, &format!("/api/tasks/{id}"))?
            .json(update)
            .send()
            .await?;
        check(res, "Failed to update task").await?;
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        let res = self
            .authed(Method::DELETE, &format!("/api/tasks/{id}"))?
            .send()
            .await?;
        check(res, "Failed to delete task").await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse, ClientError> {
        let res = self
            .request(Method::POST, "/api/auth/signup")
            .json(&serde_json::json!({ "email": email, "password": password, "fullName": full_name }))
            .send()
            .await?;
        read_json(res, "Signup failed").await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let res = self
            .request(Method::POST, "/api/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_json(res, "Login failed").await
    }
}
