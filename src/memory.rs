//! In-memory store, used when no database is configured and in tests.
//! Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::domain::{NewTask, Task, TaskPatch, User};
use crate::tasks::repo::TaskRepo;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        // Check and insert under one write lock so concurrent signups cannot both win.
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TaskRepo for MemoryStore {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| (&a.date, &a.time, a.created_at).cmp(&(&b.date, &b.time, b.created_at)));
        Ok(owned)
    }

    async fn create_task(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: task.title,
            description: task.description,
            category: task.category,
            priority: task.priority,
            date: task.date,
            time: task.time,
            is_completed: false,
            time_spent: 0,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&task_id).filter(|t| t.user_id == user_id) else {
            return Ok(None);
        };
        patch.apply(task);
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
        let mut tasks = self.tasks.write().await;
        if tasks.get(&task_id).is_some_and(|t| t.user_id == user_id) {
            tasks.remove(&task_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
