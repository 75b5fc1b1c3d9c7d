//! User repository implementation

use maieutic_core::directory::{User, UserStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::{Error, Result};

/// Repository for user records
pub struct UserRepository {
    pool: Pool<Sqlite>,
}

impl UserRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert a new user; the username must be unique
    pub async fn create(&self, user: &User) -> Result<()> {
        debug!("Creating user: {} ({})", user.username, user.id);

        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.status.as_str())
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "User with username '{}' already exists",
                user.username
            )),
            _ => Error::Database(e),
        })?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, status, created_at FROM users WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_row(&r)).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, status, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_row(&r)).transpose()
    }

    /// Update the status column; errors if the user does not exist
    pub async fn update_status(&self, id: Uuid, status: UserStatus) -> Result<()> {
        let result = sqlx::query("UPDATE users SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound {
                entity: "User".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    fn from_row(row: &SqliteRow) -> Result<User> {
        let id: String = row.try_get("id")?;
        let username: String = row.try_get("username")?;
        let display_name: Option<String> = row.try_get("display_name")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(User {
            id: parse_uuid(&id)?,
            username,
            display_name,
            status: status.parse().map_err(Error::Core)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}
