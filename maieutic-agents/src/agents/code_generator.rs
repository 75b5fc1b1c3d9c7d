//! Code generation agent
//!
//! Turns an architecture into multi-file code, and refines previously
//! generated code against feedback.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{emit_best_effort, optional_str, require_str, scoped_project};
use crate::llm::{LlmClient, LlmHandle, LlmRequest};

pub const AGENT_ID: &str = "code_generator";

const DEFAULT_LANGUAGE: &str = "python";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("generate_code", AccessPolicy::ProjectScoped),
    ActionSpec::new("refine_code", AccessPolicy::ProjectScoped),
];

pub struct CodeGeneratorAgent {
    llm: LlmHandle,
    events: Arc<dyn EventSink>,
}

impl CodeGeneratorAgent {
    pub fn new(llm: Arc<dyn LlmClient>, events: Arc<dyn EventSink>) -> Self {
        Self {
            llm: LlmHandle::new(llm),
            events,
        }
    }

    async fn generate_code(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let architecture = require_str(payload, "architecture")?;
        let language = optional_str(payload, "language").unwrap_or(DEFAULT_LANGUAGE);

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "generate_code",
                format!(
                    "Generate {} source files for project '{}' from its architecture",
                    language, project.name
                ),
                json!({"project_id": project.id, "architecture": architecture, "language": language}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "code", "project_id": project.id, "language": language}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "code",
            "project_id": project.id.to_string(),
            "language": language,
            "content": response.content,
            "model": response.model,
        }))
    }

    async fn refine_code(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let code = require_str(payload, "code")?;
        let feedback = require_str(payload, "feedback")?;

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "refine_code",
                format!("Rework the code for project '{}' against review feedback", project.name),
                json!({"project_id": project.id, "code": code, "feedback": feedback}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "refined_code", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "refined_code",
            "project_id": project.id.to_string(),
            "content": response.content,
            "model": response.model,
        }))
    }
}

#[async_trait]
impl ActionHandler for CodeGeneratorAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "generate_code" => self.generate_code(&payload).await,
            "refine_code" => self.refine_code(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }

    async fn shutdown(&self) -> Option<Result<()>> {
        self.llm.release().await;
        Some(Ok(()))
    }
}
