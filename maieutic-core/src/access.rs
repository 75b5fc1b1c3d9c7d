//! Access-control pipeline applied around agent action handlers
//!
//! The pipeline replaces decorator stacking with explicit steps:
//! [`authenticate`] resolves the calling user, [`authorize_project`]
//! resolves the calling user *and* their role on the target project.
//! `authorize_project` re-runs every authentication check itself — it
//! never trusts that an earlier step already did — so the precedence of
//! failure codes holds no matter how a handler is reached.
//!
//! On success the steps inject the resolved context into the payload
//! (`_authenticated_user`, `_project`, `_project_role`) so handlers can
//! read it back without another directory round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::directory::{Directory, Project, ProjectRole, User, UserStatus};
use crate::envelope::ErrorCode;

/// Payload key for the user record injected by [`authenticate`]
pub const AUTHENTICATED_USER_KEY: &str = "_authenticated_user";
/// Payload key for the project record injected by [`authorize_project`]
pub const PROJECT_KEY: &str = "_project";
/// Payload key for the caller's role injected by [`authorize_project`]
pub const PROJECT_ROLE_KEY: &str = "_project_role";

/// Access requirement of one action, enforced before its handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// No checks; the handler does its own parameter validation
    Public,
    /// Caller must resolve to an active user
    Authenticated,
    /// Caller must be the project owner or an active collaborator
    ProjectScoped,
}

/// A failed access check, carrying the machine-matchable code when the
/// failure belongs to the auth taxonomy
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDenial {
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl AccessDenial {
    fn new<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Context resolved by [`authorize_project`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectAccess {
    pub user: User,
    pub project: Project,
    pub role: ProjectRole,
}

/// Resolve the calling user from `payload["user_id"]`
///
/// Failure precedence: missing/blank id → `AUTH_REQUIRED`; unparseable
/// or unknown id → `INVALID_USER`; non-active account → `USER_INACTIVE`.
/// On success the user record is injected under
/// [`AUTHENTICATED_USER_KEY`].
pub async fn authenticate(
    directory: &dyn Directory,
    payload: &mut Map<String, Value>,
) -> Result<User, AccessDenial> {
    let raw_id = payload
        .get("user_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AccessDenial::new(ErrorCode::AuthRequired, "user_id is required"))?
        .to_string();

    let user_id = Uuid::parse_str(&raw_id)
        .map_err(|_| AccessDenial::new(ErrorCode::InvalidUser, format!("unknown user '{}'", raw_id)))?;

    let user = directory
        .user_by_id(user_id)
        .await
        .map_err(|err| AccessDenial::internal(format!("user lookup failed: {}", err)))?
        .ok_or_else(|| AccessDenial::new(ErrorCode::InvalidUser, format!("unknown user '{}'", raw_id)))?;

    if user.status != UserStatus::Active {
        return Err(AccessDenial::new(
            ErrorCode::UserInactive,
            format!("user '{}' is not active", user.username),
        ));
    }

    let record = serde_json::to_value(&user)
        .map_err(|err| AccessDenial::internal(format!("failed to encode user record: {}", err)))?;
    payload.insert(AUTHENTICATED_USER_KEY.to_string(), record);

    Ok(user)
}

/// Resolve the calling user's access to `payload["project_id"]`
///
/// Runs the full [`authenticate`] step first (same precedence, same
/// codes), then: missing project id → `PROJECT_ID_REQUIRED`; unknown
/// project → `PROJECT_NOT_FOUND`; neither owner nor active collaborator
/// → `ACCESS_DENIED`. An inactive collaborator record is treated exactly
/// like a missing one. On success the project and role are injected
/// under [`PROJECT_KEY`] / [`PROJECT_ROLE_KEY`].
pub async fn authorize_project(
    directory: &dyn Directory,
    payload: &mut Map<String, Value>,
) -> Result<ProjectAccess, AccessDenial> {
    let user = authenticate(directory, payload).await?;

    let raw_id = payload
        .get("project_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AccessDenial::new(ErrorCode::ProjectIdRequired, "project_id is required"))?
        .to_string();

    let project_id = Uuid::parse_str(&raw_id).map_err(|_| {
        AccessDenial::new(ErrorCode::ProjectNotFound, format!("unknown project '{}'", raw_id))
    })?;

    let project = directory
        .project_by_id(project_id)
        .await
        .map_err(|err| AccessDenial::internal(format!("project lookup failed: {}", err)))?
        .ok_or_else(|| {
            AccessDenial::new(ErrorCode::ProjectNotFound, format!("unknown project '{}'", raw_id))
        })?;

    let role = if project.owner_id == user.id {
        ProjectRole::Owner
    } else {
        let record = directory
            .active_collaborator(project.id, user.id)
            .await
            .map_err(|err| AccessDenial::internal(format!("collaborator lookup failed: {}", err)))?;
        match record {
            Some(collaborator) if collaborator.is_active => collaborator.role,
            _ => {
                return Err(AccessDenial::new(
                    ErrorCode::AccessDenied,
                    format!(
                        "user '{}' has no access to project '{}'",
                        user.username, project.name
                    ),
                ))
            }
        }
    };

    debug!(
        user = %user.username,
        project = %project.name,
        role = %role,
        "project access granted"
    );

    let project_record = serde_json::to_value(&project)
        .map_err(|err| AccessDenial::internal(format!("failed to encode project record: {}", err)))?;
    payload.insert(PROJECT_KEY.to_string(), project_record);
    payload.insert(PROJECT_ROLE_KEY.to_string(), Value::String(role.as_str().to_string()));

    Ok(ProjectAccess { user, project, role })
}

/// Enforce one action's policy against the payload
pub async fn enforce(
    policy: AccessPolicy,
    directory: &dyn Directory,
    payload: &mut Map<String, Value>,
) -> Result<(), AccessDenial> {
    match policy {
        AccessPolicy::Public => Ok(()),
        AccessPolicy::Authenticated => authenticate(directory, payload).await.map(|_| ()),
        AccessPolicy::ProjectScoped => authorize_project(directory, payload).await.map(|_| ()),
    }
}
