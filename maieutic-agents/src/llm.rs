//! LLM client seam
//!
//! The platform treats the language model as an opaque collaborator
//! behind [`LlmClient`]. [`ScriptedLlmClient`] is the deterministic
//! null-object implementation selected by configuration; it answers
//! from a response table or with a canned summary of the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use maieutic_core::{Error, Result};

/// A single completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// What kind of artifact is being produced, e.g. `generate_questions`
    pub task: String,
    pub prompt: String,
    pub context: Value,
}

impl LlmRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(task: S1, prompt: S2, context: Value) -> Self {
        Self {
            task: task.into(),
            prompt: prompt.into(),
            context,
        }
    }
}

/// A completion result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
}

/// Opaque completion contract
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Deterministic client used when no real model is wired in
pub struct ScriptedLlmClient {
    model: String,
    responses: HashMap<String, String>,
}

impl ScriptedLlmClient {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            responses: HashMap::new(),
        }
    }

    /// Script a fixed response for one task
    pub fn with_response<S1: Into<String>, S2: Into<String>>(mut self, task: S1, content: S2) -> Self {
        self.responses.insert(task.into(), content.into());
        self
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let content = self
            .responses
            .get(&request.task)
            .cloned()
            .unwrap_or_else(|| format!("[{}] {}", request.task, request.prompt));
        Ok(LlmResponse {
            content,
            model: self.model.clone(),
        })
    }
}

/// Releasable handle the LLM-backed agents hold on their client
///
/// `release` drops the client reference; later calls fail with a
/// dependency error instead of touching a half-closed client. Releasing
/// twice is a no-op.
pub struct LlmHandle {
    inner: RwLock<Option<Arc<dyn LlmClient>>>,
}

impl LlmHandle {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            inner: RwLock::new(Some(client)),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn LlmClient>> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::dependency("llm", "client has been released"))
    }

    pub async fn release(&self) {
        self.inner.write().await.take();
    }
}
