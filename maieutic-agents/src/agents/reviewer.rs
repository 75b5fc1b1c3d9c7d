//! Review agent
//!
//! Closes the workflow loop: designs tests for generated code and turns
//! failing test reports into correction proposals.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{emit_best_effort, require_str, scoped_project};
use crate::llm::{LlmClient, LlmHandle, LlmRequest};

pub const AGENT_ID: &str = "reviewer";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("design_tests", AccessPolicy::ProjectScoped),
    ActionSpec::new("propose_corrections", AccessPolicy::ProjectScoped),
];

pub struct ReviewerAgent {
    llm: LlmHandle,
    events: Arc<dyn EventSink>,
}

impl ReviewerAgent {
    pub fn new(llm: Arc<dyn LlmClient>, events: Arc<dyn EventSink>) -> Self {
        Self {
            llm: LlmHandle::new(llm),
            events,
        }
    }

    async fn design_tests(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let code = require_str(payload, "code")?;

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "design_tests",
                format!("Design a test suite for the code of project '{}'", project.name),
                json!({"project_id": project.id, "code": code}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "tests", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "tests",
            "project_id": project.id.to_string(),
            "content": response.content,
            "model": response.model,
        }))
    }

    async fn propose_corrections(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let code = require_str(payload, "code")?;
        let test_report = require_str(payload, "test_report")?;

        let client = self.llm.get().await?;
        let response = client
            .complete(LlmRequest::new(
                "propose_corrections",
                format!(
                    "Propose corrections for project '{}' from its failing test report",
                    project.name
                ),
                json!({"project_id": project.id, "code": code, "test_report": test_report}),
            ))
            .await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "corrections", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "corrections",
            "project_id": project.id.to_string(),
            "content": response.content,
            "model": response.model,
        }))
    }
}

#[async_trait]
impl ActionHandler for ReviewerAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "design_tests" => self.design_tests(&payload).await,
            "propose_corrections" => self.propose_corrections(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }

    async fn shutdown(&self) -> Option<Result<()>> {
        self.llm.release().await;
        Some(Ok(()))
    }
}
