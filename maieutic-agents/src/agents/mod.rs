//! Concrete agents for the Socratic workflow
//!
//! `user_manager` and `project_manager` are backed by the directory;
//! `socratic`, `spec_writer`, `code_generator`, and `reviewer` delegate
//! their prose to the LLM client and stay deliberately thin.

pub mod code_generator;
pub mod project_manager;
pub mod reviewer;
pub mod socratic;
pub mod spec_writer;
pub mod user_manager;

pub use code_generator::CodeGeneratorAgent;
pub use project_manager::ProjectManagerAgent;
pub use reviewer::ReviewerAgent;
pub use socratic::SocraticAgent;
pub use spec_writer::SpecWriterAgent;
pub use user_manager::UserManagerAgent;

use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use maieutic_core::access::{AUTHENTICATED_USER_KEY, PROJECT_KEY, PROJECT_ROLE_KEY};
use maieutic_core::directory::{Project, ProjectRole, User};
use maieutic_core::event::{Event, EventSink};
use maieutic_core::{Error, Result};

/// Required string parameter; blank counts as missing
pub(crate) fn require_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::validation(format!("missing required parameter '{}'", key)))
}

/// Optional string parameter; blank counts as absent
pub(crate) fn optional_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Required id parameter
pub(crate) fn require_uuid(payload: &Map<String, Value>, key: &str) -> Result<Uuid> {
    let raw = require_str(payload, key)?;
    Uuid::parse_str(raw)
        .map_err(|_| Error::validation(format!("parameter '{}' must be a valid id", key)))
}

/// The user record injected by the authentication step
pub(crate) fn authenticated_user(payload: &Map<String, Value>) -> Result<User> {
    let value = payload
        .get(AUTHENTICATED_USER_KEY)
        .cloned()
        .ok_or_else(|| Error::internal("authentication context missing from payload"))?;
    Ok(serde_json::from_value(value)?)
}

/// The project record injected by the project-access step
pub(crate) fn scoped_project(payload: &Map<String, Value>) -> Result<Project> {
    let value = payload
        .get(PROJECT_KEY)
        .cloned()
        .ok_or_else(|| Error::internal("project context missing from payload"))?;
    Ok(serde_json::from_value(value)?)
}

/// The caller's role injected by the project-access step
pub(crate) fn caller_role(payload: &Map<String, Value>) -> Result<ProjectRole> {
    payload
        .get(PROJECT_ROLE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::internal("project role missing from payload"))?
        .parse()
}

/// Emit without letting sink failures reach the handler
pub(crate) async fn emit_best_effort(events: &dyn EventSink, event: Event) {
    let event_type = event.event_type;
    if let Err(err) = events.emit(event).await {
        warn!(event_type = %event_type, error = %err, "failed to emit event");
    }
}
