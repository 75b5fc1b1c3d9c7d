//! Storage manager for coordinating database operations

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use maieutic_core::directory::{Collaborator, Directory, Project, User, UserStatus};

use crate::repositories::{CollaboratorRepository, ProjectRepository, UserRepository};
use crate::{Error, Result};

/// Main storage manager owning the pool and all repositories
///
/// Implements the core [`Directory`] contract so the access pipeline and
/// the directory-backed agents can run against SQLite without knowing
/// about it.
pub struct StorageManager {
    pool: Pool<Sqlite>,
    users: Arc<UserRepository>,
    projects: Arc<ProjectRepository>,
    collaborators: Arc<CollaboratorRepository>,
}

impl StorageManager {
    /// Connect to the database, creating the file if necessary
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to database: {}", url);

        let options = SqliteConnectOptions::from_str(url)
            .map_err(Error::Database)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Database connection established");

        Ok(Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            projects: Arc::new(ProjectRepository::new(pool.clone())),
            collaborators: Arc::new(CollaboratorRepository::new(pool.clone())),
            pool,
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    pub fn users(&self) -> Arc<UserRepository> {
        self.users.clone()
    }

    pub fn projects(&self) -> Arc<ProjectRepository> {
        self.projects.clone()
    }

    pub fn collaborators(&self) -> Arc<CollaboratorRepository> {
        self.collaborators.clone()
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Get database statistics
    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            users_count: self.users.count().await?,
            projects_count: self.projects.count().await?,
            collaborators_count: self.collaborators.count().await?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub users_count: i64,
    pub projects_count: i64,
    pub collaborators_count: i64,
}

#[async_trait]
impl Directory for StorageManager {
    async fn create_user(&self, user: &User) -> maieutic_core::Result<()> {
        Ok(self.users.create(user).await?)
    }

    async fn user_by_id(&self, id: Uuid) -> maieutic_core::Result<Option<User>> {
        Ok(self.users.find_by_id(id).await?)
    }

    async fn user_by_username(&self, username: &str) -> maieutic_core::Result<Option<User>> {
        Ok(self.users.find_by_username(username).await?)
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> maieutic_core::Result<()> {
        Ok(self.users.update_status(id, status).await?)
    }

    async fn create_project(&self, project: &Project) -> maieutic_core::Result<()> {
        Ok(self.projects.create(project).await?)
    }

    async fn project_by_id(&self, id: Uuid) -> maieutic_core::Result<Option<Project>> {
        Ok(self.projects.find_by_id(id).await?)
    }

    async fn project_by_name(&self, name: &str) -> maieutic_core::Result<Option<Project>> {
        Ok(self.projects.find_by_name(name).await?)
    }

    async fn add_collaborator(&self, collaborator: &Collaborator) -> maieutic_core::Result<()> {
        Ok(self.collaborators.upsert(collaborator).await?)
    }

    async fn active_collaborator(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> maieutic_core::Result<Option<Collaborator>> {
        Ok(self.collaborators.find_active(project_id, user_id).await?)
    }

    async fn deactivate_collaborator(&self, project_id: Uuid, user_id: Uuid) -> maieutic_core::Result<()> {
        Ok(self.collaborators.deactivate(project_id, user_id).await?)
    }
}
