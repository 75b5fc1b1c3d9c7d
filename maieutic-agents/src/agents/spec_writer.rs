//! Specification and architecture agent
//!
//! Consumes the answered questions and produces the specification, then
//! the architecture derived from it.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{emit_best_effort, require_str, scoped_project};
use crate::llm::{LlmClient, LlmHandle, LlmRequest};

pub const AGENT_ID: &str = "spec_writer";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("generate_specification", AccessPolicy::ProjectScoped),
    ActionSpec::new("design_architecture", AccessPolicy::ProjectScoped),
];

pub struct SpecWriterAgent {
    llm: LlmHandle,
    events: Arc<dyn EventSink>,
}

impl SpecWriterAgent {
    pub fn new(llm: Arc<dyn LlmClient>, events: Arc<dyn EventSink>) -> Self {
        Self {
            llm: LlmHandle::new(llm),
            events,
        }
    }

    async fn generate_specification(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let requirements = payload
            .get("requirements")
            .and_then(Value::as_array)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::validation("missing required parameter 'requirements'"))?;

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "generate_specification",
                format!(
                    "Write a functional specification for project '{}' from {} requirement statements",
                    project.name,
                    requirements.len()
                ),
                json!({"project_id": project.id, "requirements": requirements}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "specification", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "specification",
            "project_id": project.id.to_string(),
            "requirements_covered": requirements.len(),
            "content": response.content,
            "model": response.model,
        }))
    }

    async fn design_architecture(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let specification = require_str(payload, "specification")?;

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "design_architecture",
                format!("Design a component architecture for project '{}'", project.name),
                json!({"project_id": project.id, "specification": specification}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "architecture", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "architecture",
            "project_id": project.id.to_string(),
            "content": response.content,
            "model": response.model,
        }))
    }
}

#[async_trait]
impl ActionHandler for SpecWriterAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "generate_specification" => self.generate_specification(&payload).await,
            "design_architecture" => self.design_architecture(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }

    async fn shutdown(&self) -> Option<Result<()>> {
        self.llm.release().await;
        Some(Ok(()))
    }
}
