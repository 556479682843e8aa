use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::Task;

use super::api::{TaskApi, TaskForm, TaskUpdate};
use super::ClientError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Records elapsed focus time against a task.
#[async_trait]
pub trait CompleteTask: Send {
    async fn complete_task(&mut self, task_id: Uuid, time_spent: u64) -> Result<(), ClientError>;
}

/// Cached copy of the signed-in user's task list.
///
/// The cache is only ever replaced wholesale from the server: every
/// successful create/update/delete is followed by a full re-fetch before the
/// call returns. A failed call leaves the cache exactly as it was.
pub struct TaskStore<A: TaskApi> {
    api: A,
    tasks: Vec<Task>,
}

impl<A: TaskApi> TaskStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.api.fetch_tasks().await {
            Ok(tasks) => {
                debug!(count = tasks.len(), "task cache refreshed");
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "task refresh failed; keeping cached list");
                Err(e)
            }
        }
    }

    pub async fn create(&mut self, form: &TaskForm) -> Result<(), ClientError> {
        self.api.create_task(form).await?;
        self.refresh().await
    }

    pub async fn update(&mut self, task_id: Uuid, update: &TaskUpdate) -> Result<(), ClientError> {
        self.api.update_task(task_id, update).await?;
        self.refresh().await
    }

    pub async fn delete(&mut self, task_id: Uuid) -> Result<(), ClientError> {
        self.api.delete_task(task_id).await?;
        self.refresh().await
    }

    /// Marks the task done with `time_spent` seconds in one update.
    pub async fn complete(&mut self, task_id: Uuid, time_spent: u64) -> Result<(), ClientError> {
        self.update(task_id, &TaskUpdate::completion(time_spent)).await
    }

    pub fn tasks_for_date(&self, date: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.date == date).collect()
    }

    pub fn stats(&self) -> TaskStats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.is_completed).count();
        TaskStats {
            total,
            completed,
            pending: total - completed,
        }
    }

    /// Dates carrying at least one task.
    pub fn task_dates(&self) -> BTreeSet<&str> {
        self.tasks.iter().map(|t| t.date.as_str()).collect()
    }
}

#[async_trait]
impl<A: TaskApi> CompleteTask for TaskStore<A> {
    async fn complete_task(&mut self, task_id: Uuid, time_spent: u64) -> Result<(), ClientError> {
        self.complete(task_id, time_spent).await
    }
}
