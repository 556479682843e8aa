use serde::Deserialize;

use crate::domain::{is_valid_date, is_valid_time, NewTask, TaskCategory, TaskPatch, TaskPriority};
use crate::error::AppError;

/// Body of `POST /tasks`. Unknown category or priority values fail to
/// deserialize and are rejected; absent ones take the defaults.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
}

/// Body of `PUT /tasks/:id`. Fields not listed here (`id`, `user_id`,
/// timestamps) are ignored, so the owner can never be reassigned.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub is_completed: Option<bool>,
    pub time_spent: Option<i64>,
}

fn check_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    Ok(title.to_string())
}

fn check_date(date: &str) -> Result<(), AppError> {
    if !is_valid_date(date) {
        return Err(AppError::Validation("Date must be YYYY-MM-DD".into()));
    }
    Ok(())
}

fn check_time(time: &str) -> Result<(), AppError> {
    if !is_valid_time(time) {
        return Err(AppError::Validation("Time must be HH:MM".into()));
    }
    Ok(())
}

impl TryFrom<CreateTaskRequest> for NewTask {
    type Error = AppError;

    fn try_from(req: CreateTaskRequest) -> Result<Self, Self::Error> {
        let title = check_title(&req.title)?;
        check_date(&req.date)?;
        let time = req.time.unwrap_or_default();
        check_time(&time)?;
        Ok(NewTask {
            title,
            description: req.description.unwrap_or_default(),
            category: req.category.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            date: req.date,
            time,
        })
    }
}

impl TryFrom<UpdateTaskRequest> for TaskPatch {
    type Error = AppError;

    fn try_from(req: UpdateTaskRequest) -> Result<Self, Self::Error> {
        let title = req.title.as_deref().map(check_title).transpose()?;
        if let Some(date) = &req.date {
            check_date(date)?;
        }
        if let Some(time) = &req.time {
            check_time(time)?;
        }
        if req.time_spent.is_some_and(|s| s < 0) {
            return Err(AppError::Validation("time_spent must not be negative".into()));
        }
        Ok(TaskPatch {
            title,
            description: req.description,
            category: req.category,
            priority: req.priority,
            date: req.date,
            time: req.time,
            is_completed: req.is_completed,
            time_spent: req.time_spent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_defaults_category_priority_and_optionals() {
        let req: CreateTaskRequest =
            serde_json::from_value(json!({"title": "  Read  ", "date": "2024-05-01"})).unwrap();
        let task = NewTask::try_from(req).unwrap();
        assert_eq!(task.title, "Read");
        assert_eq!(task.category, TaskCategory::Personal);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.description, "");
        assert_eq!(task.time, "");
    }

    #[test]
    fn create_rejects_unknown_enum_values() {
        let res = serde_json::from_value::<CreateTaskRequest>(
            json!({"title": "x", "date": "2024-05-01", "category": "Chores"}),
        );
        assert!(res.is_err());
    }

    #[test]
    fn create_requires_title_and_date() {
        let no_title: CreateTaskRequest =
            serde_json::from_value(json!({"title": " ", "date": "2024-05-01"})).unwrap();
        assert!(matches!(NewTask::try_from(no_title), Err(AppError::Validation(_))));

        let bad_date: CreateTaskRequest =
            serde_json::from_value(json!({"title": "x", "date": "05/01/2024"})).unwrap();
        assert!(matches!(NewTask::try_from(bad_date), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_ignores_owner_and_rejects_negative_time() {
        let req: UpdateTaskRequest = serde_json::from_value(json!({
            "user_id": "00000000-0000-0000-0000-000000000000",
            "is_completed": true,
            "time_spent": 125
        }))
        .unwrap();
        let patch = TaskPatch::try_from(req).unwrap();
        assert_eq!(patch, TaskPatch::completion(125));

        let negative = UpdateTaskRequest {
            time_spent: Some(-1),
            ..UpdateTaskRequest::default()
        };
        assert!(TaskPatch::try_from(negative).is_err());
    }
}
