//! Socratic questioning agent
//!
//! Opens the workflow: turns a topic into clarifying questions and
//! scores the answers that come back. All prose comes from the LLM
//! client; this agent only validates parameters and shapes artifacts.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{emit_best_effort, require_str, scoped_project};
use crate::llm::{LlmClient, LlmHandle, LlmRequest};

pub const AGENT_ID: &str = "socratic";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("generate_questions", AccessPolicy::ProjectScoped),
    ActionSpec::new("evaluate_answers", AccessPolicy::ProjectScoped),
];

/// Agent leading the requirements dialogue
pub struct SocraticAgent {
    llm: LlmHandle,
    events: Arc<dyn EventSink>,
}

impl SocraticAgent {
    pub fn new(llm: Arc<dyn LlmClient>, events: Arc<dyn EventSink>) -> Self {
        Self {
            llm: LlmHandle::new(llm),
            events,
        }
    }

    async fn generate_questions(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let topic = require_str(payload, "topic")?;
        let count = payload
            .get("question_count")
            .and_then(Value::as_u64)
            .unwrap_or(5);
        if count == 0 || count > 20 {
            return Err(Error::validation("question_count must be between 1 and 20"));
        }

        let client = self.llm.get().await?;
        let request = LlmRequest::new(
            "generate_questions",
            format!(
                "Ask {} probing requirements questions about '{}' for project '{}'",
                count, topic, project.name
            ),
            json!({"project_id": project.id, "topic": topic, "question_count": count}),
        );
        let response = client.complete(request).await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "questions", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "questions",
            "project_id": project.id.to_string(),
            "topic": topic,
            "content": response.content,
            "model": response.model,
        }))
    }

    async fn evaluate_answers(&self, payload: &Map<String, Value>) -> Result<Value> {
        let project = scoped_project(payload)?;
        let answers = payload
            .get("answers")
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::validation("missing required parameter 'answers'"))?;

        let client = self.llm.get().await?;
        let request = LlmRequest::new(
            "evaluate_answers",
            format!(
                "Judge whether {} answers resolve the open questions for project '{}'",
                answers.len(),
                project.name
            ),
            json!({"project_id": project.id, "answers": answers}),
        );
        let response = client.complete(request).await?;

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::ArtifactGenerated,
                AGENT_ID,
                json!({"kind": "answer_evaluation", "project_id": project.id}),
            ),
        )
        .await;

        Ok(json!({
            "kind": "answer_evaluation",
            "project_id": project.id.to_string(),
            "answers_reviewed": answers.len(),
            "content": response.content,
            "model": response.model,
        }))
    }
}

#[async_trait]
impl ActionHandler for SocraticAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "generate_questions" => self.generate_questions(&payload).await,
            "evaluate_answers" => self.evaluate_answers(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }

    async fn shutdown(&self) -> Option<Result<()>> {
        self.llm.release().await;
        Some(Ok(()))
    }
}
