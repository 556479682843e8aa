use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{is_unique_violation, PgStore};
use crate::domain::User;

/// User persistence.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Insert a new user. Returns `None` if the email is already registered.
    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> anyhow::Result<Option<User>>;

    /// Replace the stored hash. Returns `false` if the user no longer exists.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, full_name, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, full_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(user) => Ok(Some(user)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
