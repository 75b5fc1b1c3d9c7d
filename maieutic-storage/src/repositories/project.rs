//! Project repository implementation

use maieutic_core::directory::Project;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::{Error, Result};

/// Repository for project records
pub struct ProjectRepository {
    pool: Pool<Sqlite>,
}

impl ProjectRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insert a new project; the name must be unique
    pub async fn create(&self, project: &Project) -> Result<()> {
        debug!("Creating project: {} ({})", project.name, project.id);

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, owner_id, archived, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.owner_id.to_string())
        .bind(project.archived)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "Project with name '{}' already exists",
                project.name
            )),
            _ => Error::Database(e),
        })?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, description, owner_id, archived, created_at, updated_at FROM projects WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_row(&r)).transpose()
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, description, owner_id, archived, created_at, updated_at FROM projects WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_row(&r)).transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM projects")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    fn from_row(row: &SqliteRow) -> Result<Project> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let description: Option<String> = row.try_get("description")?;
        let owner_id: String = row.try_get("owner_id")?;
        let archived: bool = row.try_get("archived")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Project {
            id: parse_uuid(&id)?,
            name,
            description,
            owner_id: parse_uuid(&owner_id)?,
            archived,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}
