use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Length is counted in characters, not UTF-8 bytes.
pub fn is_password_too_short(password: &str) -> bool {
    password.chars().count() < MIN_PASSWORD_LEN
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_category")]
pub enum TaskCategory {
    Work,
    #[default]
    Personal,
    Study,
    Health,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 4] = [
        TaskCategory::Work,
        TaskCategory::Personal,
        TaskCategory::Study,
        TaskCategory::Health,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Work => "Work",
            TaskCategory::Personal => "Personal",
            TaskCategory::Study => "Study",
            TaskCategory::Health => "Health",
        }
    }
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown priority `{s}`"))
    }
}

/// Task record, as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub date: String, // YYYY-MM-DD
    pub time: String, // HH:MM or empty
    pub is_completed: bool,
    pub time_spent: i64, // seconds
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// `1h 5m` style label for the time recorded on a completed task.
    pub fn time_spent_label(&self) -> String {
        let seconds = self.time_spent.max(0);
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }
}

/// Validated input for task creation; the owner is supplied separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub date: String,
    pub time: String,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub is_completed: Option<bool>,
    pub time_spent: Option<i64>,
}

impl TaskPatch {
    pub fn completion(time_spent: i64) -> Self {
        Self {
            is_completed: Some(true),
            time_spent: Some(time_spent),
            ..Self::default()
        }
    }

    /// Applies the patch in place. Used by the in-memory store.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(date) = &self.date {
            task.date = date.clone();
        }
        if let Some(time) = &self.time {
            task.time = time.clone();
        }
        if let Some(done) = self.is_completed {
            task.is_completed = done;
        }
        if let Some(spent) = self.time_spent {
            task.time_spent = spent;
        }
    }
}

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // never exposed
    pub full_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            full_name: u.full_name.clone().unwrap_or_default(),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Accepts real calendar dates in `YYYY-MM-DD` form only.
pub fn is_valid_date(date: &str) -> bool {
    let format = format_description!("[year]-[month]-[day]");
    date.len() == 10 && Date::parse(date, &format).is_ok()
}

/// Accepts an empty string or a 24h `HH:MM` time.
pub fn is_valid_time(time: &str) -> bool {
    lazy_static! {
        static ref TIME_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
    }
    time.is_empty() || TIME_RE.is_match(time)
}
