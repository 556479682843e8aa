//! Reshapes raw task records from the server into `Task`, filling defaults
//! and accepting alternate field spellings.

use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::domain::Task;

/// Accepts either a bare array or `{ "tasks": [...] }`; anything else is empty.
pub fn normalize_task_list(raw: Value) -> Vec<Task> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items.iter().map(normalize_task).collect()
}

pub fn normalize_task(raw: &Value) -> Task {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let now = OffsetDateTime::now_utc();

    Task {
        id: first(obj, &["id", "_id"]).and_then(as_uuid).unwrap_or_default(),
        user_id: first(obj, &["user_id", "user"]).and_then(as_uuid).unwrap_or_default(),
        title: string(obj, &["title"]),
        description: string(obj, &["description"]),
        category: first(obj, &["category"])
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        priority: first(obj, &["priority"])
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        date: string(obj, &["date"]),
        time: string(obj, &["time"]),
        is_completed: first(obj, &["is_completed", "completed"])
            .and_then(Value::as_bool)
            .unwrap_or(false),
        time_spent: first(obj, &["time_spent"])
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
            .unwrap_or(0)
            .max(0),
        created_at: first(obj, &["created_at", "createdAt"])
            .and_then(as_timestamp)
            .unwrap_or(now),
        updated_at: first(obj, &["updated_at", "updatedAt"])
            .and_then(as_timestamp)
            .unwrap_or(now),
    }
}

/// First non-null value among `keys`.
fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn string(obj: &Map<String, Value>, keys: &[&str]) -> String {
    first(obj, keys)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn as_uuid(v: &Value) -> Option<Uuid> {
    v.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

fn as_timestamp(v: &Value) -> Option<OffsetDateTime> {
    v.as_str().and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
}
