use async_trait::async_trait;
use uuid::Uuid;

use crate::db::PgStore;
use crate::domain::{NewTask, Task, TaskPatch};

/// Task persistence. Every operation is scoped to the owning user.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Task>>;

    async fn create_task(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task>;

    /// Merge `patch` into the task. `None` if no such task belongs to `user_id`.
    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>>;

    /// `false` if no such task belongs to `user_id`.
    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool>;
}

const TASK_COLUMNS: &str = "id, user_id, title, description, category, priority, date, time, \
                            is_completed, time_spent, created_at, updated_at";

#[async_trait]
impl TaskRepo for PgStore {
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY date, time, created_at");
        let rows = sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_task(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let sql = format!(
            r#"
            INSERT INTO tasks (id, user_id, title, description, category, priority, date, time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(task.title)
            .bind(task.description)
            .bind(task.category)
            .bind(task.priority)
            .bind(task.date)
            .bind(task.time)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let sql = format!(
            r#"
            UPDATE tasks SET
                title        = COALESCE($3, title),
                description  = COALESCE($4, description),
                category     = COALESCE($5, category),
                priority     = COALESCE($6, priority),
                date         = COALESCE($7, date),
                time         = COALESCE($8, time),
                is_completed = COALESCE($9, is_completed),
                time_spent   = COALESCE($10, time_spent),
                updated_at   = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Task>(&sql)
            .bind(task_id)
            .bind(user_id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.category)
            .bind(patch.priority)
            .bind(patch.date)
            .bind(patch.time)
            .bind(patch.is_completed)
            .bind(patch.time_spent)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM tasks WHERE id = $1 AND user_id = $2"#)
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
