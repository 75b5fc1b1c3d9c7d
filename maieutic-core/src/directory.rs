//! User/project directory models and the lookup contract
//!
//! The directory is the narrow external collaborator behind
//! authentication and project access: users, projects, and the
//! collaborator records granting role-scoped access to non-owners.
//! The access pipeline and the directory-backed agents consume it only
//! through the [`Directory`] trait; the concrete backend (SQLite or the
//! in-memory fallback) is chosen by configuration at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Error, Result};

/// Account status; only `Active` users may authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Deactivated,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Deactivated => "deactivated",
        }
    }
}

impl FromStr for UserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            "deactivated" => Ok(UserStatus::Deactivated),
            other => Err(Error::validation(format!("unknown user status '{}'", other))),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with validation
    pub fn new<S: Into<String>>(username: S, display_name: Option<String>) -> Result<Self> {
        let username = username.into();
        Self::validate_username(&username)?;
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            display_name,
            status: UserStatus::Active,
            created_at: Utc::now(),
        })
    }

    fn validate_username(username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(Error::validation("Username cannot be empty"));
        }
        if username.len() > 64 {
            return Err(Error::validation("Username cannot exceed 64 characters"));
        }
        if !username.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(Error::validation(
                "Username can only contain alphanumeric characters, hyphens, and underscores",
            ));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// A project owned by one user, shared through collaborator records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with validation
    pub fn new<S: Into<String>>(name: S, description: Option<String>, owner_id: Uuid) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::validation("Project name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(Error::validation("Project name cannot exceed 100 characters"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            owner_id,
            archived: false,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Role a user holds relative to one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Developer,
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Developer => "developer",
            ProjectRole::Viewer => "viewer",
        }
    }
}

impl FromStr for ProjectRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(ProjectRole::Owner),
            "developer" => Ok(ProjectRole::Developer),
            "viewer" => Ok(ProjectRole::Viewer),
            other => Err(Error::validation(format!("unknown project role '{}'", other))),
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role-scoped access grant for a non-owner user
///
/// An inactive record grants nothing; access checks treat it exactly
/// like a missing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
}

impl Collaborator {
    pub fn new(project_id: Uuid, user_id: Uuid, role: ProjectRole) -> Self {
        Self {
            project_id,
            user_id,
            role,
            is_active: true,
            added_at: Utc::now(),
        }
    }
}

/// Narrow lookup/write contract consumed by the access pipeline and the
/// directory-backed agents
#[async_trait]
pub trait Directory: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> Result<()>;

    async fn create_project(&self, project: &Project) -> Result<()>;
    async fn project_by_id(&self, id: Uuid) -> Result<Option<Project>>;
    async fn project_by_name(&self, name: &str) -> Result<Option<Project>>;

    /// Insert or replace the record for `(project_id, user_id)`
    async fn add_collaborator(&self, collaborator: &Collaborator) -> Result<()>;
    /// Only returns records with `is_active == true`
    async fn active_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Collaborator>>;
    async fn deactivate_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<()>;
}

/// In-memory directory backend
///
/// Selected when no database is configured; also the default backend in
/// unit tests. Every orchestrator instance owns its own copy — nothing
/// is shared across instances.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Uuid, User>>,
    projects: RwLock<HashMap<Uuid, Project>>,
    collaborators: RwLock<Vec<Collaborator>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(Error::conflict(format!(
                "User with username '{}' already exists",
                user.username
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn set_user_status(&self, id: Uuid, status: UserStatus) -> Result<()> {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.status = status;
                Ok(())
            }
            None => Err(Error::not_found("User", id.to_string())),
        }
    }

    async fn create_project(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        if projects.values().any(|p| p.name == project.name) {
            return Err(Error::conflict(format!(
                "Project with name '{}' already exists",
                project.name
            )));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn project_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn project_by_name(&self, name: &str) -> Result<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn add_collaborator(&self, collaborator: &Collaborator) -> Result<()> {
        let mut collaborators = self.collaborators.write().await;
        collaborators
            .retain(|c| !(c.project_id == collaborator.project_id && c.user_id == collaborator.user_id));
        collaborators.push(collaborator.clone());
        Ok(())
    }

    async fn active_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Collaborator>> {
        Ok(self
            .collaborators
            .read()
            .await
            .iter()
            .find(|c| c.project_id == project_id && c.user_id == user_id && c.is_active)
            .cloned())
    }

    async fn deactivate_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut collaborators = self.collaborators.write().await;
        match collaborators
            .iter_mut()
            .find(|c| c.project_id == project_id && c.user_id == user_id)
        {
            Some(record) => {
                record.is_active = false;
                Ok(())
            }
            None => Err(Error::not_found(
                "Collaborator",
                format!("{}/{}", project_id, user_id),
            )),
        }
    }
}
