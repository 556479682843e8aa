use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, jwt::AuthUser},
    domain::{NewTask, Task, TaskPatch},
    error::{ApiJson, AppError, AppResult},
    state::AppState,
};

use super::dto::{CreateTaskRequest, UpdateTaskRequest};

/// Ids that are not UUIDs cannot name a task, so they are reported as missing.
fn parse_task_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::task_not_found())
}

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = state.tasks.list_by_user(user_id).await?;
    Ok(Json(tasks))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let new_task = NewTask::try_from(payload)?;
    let task = state.tasks.create_task(user_id, new_task).await?;
    info!(user_id = %user_id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateTaskRequest>,
) -> AppResult<Json<Task>> {
    let id = parse_task_id(&id)?;
    let patch = TaskPatch::try_from(payload)?;
    match state.tasks.update_task(user_id, id, patch).await? {
        Some(task) => {
            info!(user_id = %user_id, task_id = %id, completed = task.is_completed, "task updated");
            Ok(Json(task))
        }
        None => {
            warn!(user_id = %user_id, task_id = %id, "update of missing task");
            Err(AppError::task_not_found())
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_task_id(&id)?;
    if !state.tasks.delete_task(user_id, id).await? {
        warn!(user_id = %user_id, task_id = %id, "delete of missing task");
        return Err(AppError::task_not_found());
    }
    info!(user_id = %user_id, task_id = %id, "task deleted");
    Ok(Json(MessageResponse {
        message: "Task deleted".into(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::app::testing::{send, signup_user, TestApp};

    async fn create(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
        send(app, Method::POST, "/api/tasks", Some(token), Some(body)).await
    }

    #[tokio::test]
    async fn create_then_list_returns_fresh_task() {
        let app = TestApp::new();
        let token = signup_user(&app, "t@example.com", "secret1").await;

        let (status, created) = create(
            &app,
            &token,
            json!({"title": "Write report", "category": "Work", "priority": "High", "date": "2024-05-01"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["id"].as_str().is_some());
        assert!(created["created_at"].as_str().is_some());

        let (status, list) = send(&app, Method::GET, "/api/tasks", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["title"], "Write report");
        assert_eq!(list[0]["is_completed"], false);
        assert_eq!(list[0]["time_spent"], 0);
        assert_eq!(list[0]["time"], "");
        assert_eq!(list[0]["description"], "");
    }

    #[tokio::test]
    async fn list_is_stable_without_mutation() {
        let app = TestApp::new();
        let token = signup_user(&app, "s@example.com", "secret1").await;
        for title in ["a", "b", "c"] {
            create(&app, &token, json!({"title": title, "date": "2024-05-02"})).await;
        }
        let (_, first) = send(&app, Method::GET, "/api/tasks", Some(&token), None).await;
        let (_, second) = send(&app, Method::GET, "/api/tasks", Some(&token), None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_and_nothing_is_stored() {
        let app = TestApp::new();
        let token = signup_user(&app, "e@example.com", "secret1").await;
        let (status, body) = create(
            &app,
            &token,
            json!({"title": "x", "date": "2024-05-01", "category": "Chores"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some());

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/tasks/00000000-0000-0000-0000-000000000000",
            Some(&token),
            Some(json!({"priority": "Urgent"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = send(&app, Method::GET, "/api/tasks", Some(&token), None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn completion_update_sets_flag_and_time() {
        let app = TestApp::new();
        let token = signup_user(&app, "c@example.com", "secret1").await;
        let (_, created) = create(&app, &token, json!({"title": "Focus", "date": "2024-05-01"})).await;
        let id = created["id"].as_str().unwrap();

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/tasks/{id}"),
            Some(&token),
            Some(json!({"is_completed": true, "time_spent": 125})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["is_completed"], true);
        assert_eq!(updated["time_spent"], 125);
        assert_eq!(updated["title"], "Focus");
    }

    #[tokio::test]
    async fn other_users_cannot_see_update_or_delete() {
        let app = TestApp::new();
        let alice = signup_user(&app, "alice@example.com", "secret1").await;
        let bob = signup_user(&app, "bob@example.com", "secret1").await;
        let (_, created) = create(&app, &alice, json!({"title": "private", "date": "2024-05-01"})).await;
        let uri = format!("/api/tasks/{}", created["id"].as_str().unwrap());

        let (_, bobs) = send(&app, Method::GET, "/api/tasks", Some(&bob), None).await;
        assert_eq!(bobs, json!([]));

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&bob),
            Some(json!({"title": "hijacked"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, alices) = send(&app, Method::GET, "/api/tasks", Some(&alice), None).await;
        assert_eq!(alices[0]["title"], "private");
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::new();
        let token = signup_user(&app, "d@example.com", "secret1").await;
        let (_, created) = create(&app, &token, json!({"title": "bye", "date": "2024-05-01"})).await;
        let uri = format!("/api/tasks/{}", created["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");
    }

    #[tokio::test]
    async fn malformed_ids_are_not_found() {
        let app = TestApp::new();
        let token = signup_user(&app, "m@example.com", "secret1").await;
        let (status, body) = send(&app, Method::DELETE, "/api/tasks/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Task not found");
    }

    #[tokio::test]
    async fn task_routes_require_a_token() {
        let app = TestApp::new();
        let (status, body) = send(&app, Method::GET, "/api/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].as_str().is_some());

        let (status, _) = send(&app, Method::GET, "/api/tasks", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
