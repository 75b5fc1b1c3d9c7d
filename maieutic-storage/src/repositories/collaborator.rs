//! Collaborator repository implementation
//!
//! One row per `(project_id, user_id)` pair; deactivation keeps the row
//! so the grant history survives, but an inactive row is invisible to
//! the access checks.

use maieutic_core::directory::Collaborator;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::{Error, Result};

/// Repository for collaborator grants
pub struct CollaboratorRepository {
    pool: Pool<Sqlite>,
}

impl CollaboratorRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert or replace the grant for `(project_id, user_id)`
    pub async fn upsert(&self, collaborator: &Collaborator) -> Result<()> {
        debug!(
            "Upserting collaborator {} on project {}",
            collaborator.user_id, collaborator.project_id
        );

        sqlx::query(
            r#"
            INSERT INTO collaborators (project_id, user_id, role, is_active, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (project_id, user_id) DO UPDATE SET
                role = excluded.role,
                is_active = excluded.is_active,
                added_at = excluded.added_at
            "#,
        )
        .bind(collaborator.project_id.to_string())
        .bind(collaborator.user_id.to_string())
        .bind(collaborator.role.as_str())
        .bind(collaborator.is_active)
        .bind(collaborator.added_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The grant for the pair, only if it is active
    pub async fn find_active(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Collaborator>> {
        let row = sqlx::query(
            r#"
            SELECT project_id, user_id, role, is_active, added_at
            FROM collaborators
            WHERE project_id = ?1 AND user_id = ?2 AND is_active = 1
            "#,
        )
        .bind(project_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_row(&r)).transpose()
    }

    /// Mark the grant inactive; errors if no row exists
    pub async fn deactivate(&self, project_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE collaborators SET is_active = 0 WHERE project_id = ?1 AND user_id = ?2",
        )
        .bind(project_id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound {
                entity: "Collaborator".to_string(),
                id: format!("{}/{}", project_id, user_id),
            });
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM collaborators")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    fn from_row(row: &SqliteRow) -> Result<Collaborator> {
        let project_id: String = row.try_get("project_id")?;
        let user_id: String = row.try_get("user_id")?;
        let role: String = row.try_get("role")?;
        let is_active: bool = row.try_get("is_active")?;
        let added_at: String = row.try_get("added_at")?;

        Ok(Collaborator {
            project_id: parse_uuid(&project_id)?,
            user_id: parse_uuid(&user_id)?,
            role: role.parse().map_err(Error::Core)?,
            is_active,
            added_at: parse_timestamp(&added_at)?,
        })
    }
}
