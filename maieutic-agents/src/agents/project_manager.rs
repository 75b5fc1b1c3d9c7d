//! Project management agent
//!
//! Projects and their collaborator grants. Grant changes are owner-only;
//! the access pipeline has already established the caller's role by the
//! time a handler runs, so the owner check here is a plain comparison.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::directory::{Collaborator, Directory, Project, ProjectRole};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{
    authenticated_user, caller_role, emit_best_effort, optional_str, require_str, require_uuid,
    scoped_project,
};

pub const AGENT_ID: &str = "project_manager";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("create_project", AccessPolicy::Authenticated),
    ActionSpec::new("get_project_info", AccessPolicy::ProjectScoped),
    ActionSpec::new("add_collaborator", AccessPolicy::ProjectScoped),
    ActionSpec::new("remove_collaborator", AccessPolicy::ProjectScoped),
];

/// Agent owning project records and access grants
pub struct ProjectManagerAgent {
    directory: Arc<dyn Directory>,
    events: Arc<dyn EventSink>,
}

impl ProjectManagerAgent {
    pub fn new(directory: Arc<dyn Directory>, events: Arc<dyn EventSink>) -> Self {
        Self { directory, events }
    }

    async fn create_project(&self, payload: &Map<String, Value>) -> Result<Value> {
        let caller = authenticated_user(payload)?;
        let name = require_str(payload, "name")?;
        let description = optional_str(payload, "description").map(str::to_string);

        if self.directory.project_by_name(name).await?.is_some() {
            return Err(Error::conflict(format!(
                "Project with name '{}' already exists",
                name
            )));
        }

        let project = Project::new(name, description, caller.id)?;
        self.directory.create_project(&project).await?;
        info!("Created project: {} ({}) owned by {}", project.name, project.id, caller.username);

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ProjectCreated,
                AGENT_ID,
                json!({"project_id": project.id, "name": project.name, "owner_id": caller.id}),
            ),
        )
        .await;

        Ok(json!({"project": project, "role": ProjectRole::Owner.as_str()}))
    }

    async fn get_project_info(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let role = caller_role(payload)?;
        Ok(json!({"project": project, "role": role.as_str()}))
    }

    async fn add_collaborator(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        if caller_role(payload)? != ProjectRole::Owner {
            return Err(Error::permission_denied(
                "add_collaborator",
                "caller is not the project owner",
            ));
        }

        let collaborator_id = require_uuid(payload, "collaborator_id")?;
        if collaborator_id == project.owner_id {
            return Err(Error::validation("the project owner already has access"));
        }
        let role: ProjectRole = match optional_str(payload, "role") {
            Some(raw) => raw.parse()?,
            None => ProjectRole::Developer,
        };
        if role == ProjectRole::Owner {
            return Err(Error::validation("collaborators cannot be granted the owner role"));
        }

        let target = self
            .directory
            .user_by_id(collaborator_id)
            .await?
            .ok_or_else(|| Error::not_found("User", collaborator_id.to_string()))?;
        if !target.is_active() {
            return Err(Error::validation(format!(
                "user '{}' is not active and cannot be added",
                target.username
            )));
        }

        let record = Collaborator::new(project.id, collaborator_id, role);
        self.directory.add_collaborator(&record).await?;
        info!(
            "Added collaborator {} to project {} as {}",
            target.username, project.name, role
        );

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::CollaboratorAdded,
                AGENT_ID,
                json!({"project_id": project.id, "user_id": collaborator_id, "role": role.as_str()}),
            ),
        )
        .await;

        Ok(json!({"collaborator": record}))
    }

    async fn remove_collaborator(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        if caller_role(payload)? != ProjectRole::Owner {
            return Err(Error::permission_denied(
                "remove_collaborator",
                "caller is not the project owner",
            ));
        }

        let collaborator_id = require_uuid(payload, "collaborator_id")?;
        self.directory
            .deactivate_collaborator(project.id, collaborator_id)
            .await?;
        info!("Removed collaborator {} from project {}", collaborator_id, project.name);

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::CollaboratorRemoved,
                AGENT_ID,
                json!({"project_id": project.id, "user_id": collaborator_id}),
            ),
        )
        .await;

        Ok(json!({
            "project_id": project.id.to_string(),
            "collaborator_id": collaborator_id.to_string(),
            "removed": true,
        }))
    }
}

#[async_trait]
impl ActionHandler for ProjectManagerAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "create_project" => self.create_project(&payload).await,
            "get_project_info" => self.get_project_info(&payload).await,
            "add_collaborator" => self.add_collaborator(&payload).await,
            "remove_collaborator" => self.remove_collaborator(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }
}
