//! Agent contract and the generic dispatch pipeline
//!
//! Concrete agents implement [`ActionHandler`]: a declared action table
//! plus one `handle` entry point. [`AgentRuntime`] wraps a handler and
//! implements the orchestrator-facing [`Agent`] trait, running every
//! inbound call through the same pipeline:
//!
//! ```text
//! payload validation
//!     |
//!     v
//! action table lookup
//!     |
//!     v
//! access pipeline (authenticate / project access)
//!     |
//!     v
//! timed action logging around the handler
//!     |
//!     v
//! fault isolation (errors and panics become envelopes)
//!     |
//!     v
//! event emission (best-effort)
//! ```
//!
//! Nothing a handler does can escape the runtime as anything but an
//! error envelope; one agent's bug never reaches the orchestrator or a
//! sibling agent.

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::access::{enforce, AccessPolicy};
use crate::directory::Directory;
use crate::envelope::{Envelope, ErrorCode};
use crate::event::{Event, EventSink, EventType};
use crate::Result;

/// One action an agent can perform, with its access requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub access: AccessPolicy,
}

impl ActionSpec {
    pub const fn new(name: &'static str, access: AccessPolicy) -> Self {
        Self { name, access }
    }
}

/// Contract implemented by concrete agents
///
/// The action table is the single source of truth for what the agent can
/// do: `handle` is only ever invoked with an action present in the
/// table, and the capability list the orchestrator indexes is derived
/// from it.
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    fn agent_id(&self) -> &str;

    fn actions(&self) -> &'static [ActionSpec];

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value>;

    /// Release owned resources; `None` means the agent has nothing to
    /// release. Implementations must be idempotent.
    async fn shutdown(&self) -> Option<Result<()>> {
        None
    }
}

/// Orchestrator-facing agent surface
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_id(&self) -> &str;

    /// Concrete implementation type, for status reporting
    fn kind(&self) -> &'static str;

    /// Declared action names, in declaration order
    ///
    /// Fallible at this boundary so a wedged agent can be observed by
    /// health probes; implementations should be cheap and
    /// side-effect-free.
    fn capabilities(&self) -> Result<Vec<String>>;

    /// Generic dispatch entry point; always returns an envelope
    async fn process_request(&self, action: &str, payload: Value) -> Envelope;

    /// Status block for diagnostics; must not fail
    fn status(&self) -> Value;

    /// `None` when the agent has no shutdown behavior
    async fn shutdown(&self) -> Option<Envelope>;
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Generic dispatch pipeline wrapping one [`ActionHandler`]
pub struct AgentRuntime<H: ActionHandler> {
    handler: H,
    directory: Arc<dyn Directory>,
    events: Arc<dyn EventSink>,
    requests_handled: AtomicU64,
}

impl<H: ActionHandler> AgentRuntime<H> {
    pub fn new(handler: H, directory: Arc<dyn Directory>, events: Arc<dyn EventSink>) -> Self {
        Self {
            handler,
            directory,
            events,
            requests_handled: AtomicU64::new(0),
        }
    }

    /// Wrap the runtime as a shareable trait object
    pub fn into_agent(self) -> Arc<dyn Agent> {
        Arc::new(self)
    }

    async fn emit(&self, event_type: EventType, data: Value) {
        let event = Event::new(event_type, self.handler.agent_id(), data);
        if let Err(err) = self.events.emit(event).await {
            warn!(
                agent = self.handler.agent_id(),
                error = %err,
                "failed to emit event"
            );
        }
    }
}

#[async_trait]
impl<H: ActionHandler> Agent for AgentRuntime<H> {
    fn agent_id(&self) -> &str {
        self.handler.agent_id()
    }

    fn kind(&self) -> &'static str {
        let full = std::any::type_name::<H>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn capabilities(&self) -> Result<Vec<String>> {
        Ok(self
            .handler
            .actions()
            .iter()
            .map(|spec| spec.name.to_string())
            .collect())
    }

    async fn process_request(&self, action: &str, payload: Value) -> Envelope {
        let agent_id = self.handler.agent_id().to_string();

        let Value::Object(mut payload) = payload else {
            return Envelope::error(agent_id, "request payload must be a JSON object", None);
        };

        let Some(spec) = self.handler.actions().iter().find(|s| s.name == action) else {
            let message = format!("unknown action '{}' for agent '{}'", action, agent_id);
            return Envelope::error(agent_id, message, None);
        };

        self.requests_handled.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        debug!(agent = %agent_id, action, "dispatching action");

        // Either an access denial (with its code) or the handler outcome.
        let outcome: std::result::Result<Value, (String, Option<ErrorCode>)> =
            match enforce(spec.access, self.directory.as_ref(), &mut payload).await {
                Err(denial) => Err((denial.message, denial.code)),
                Ok(()) => {
                    let call = AssertUnwindSafe(self.handler.handle(action, payload)).catch_unwind();
                    match call.await {
                        Ok(Ok(data)) => Ok(data),
                        Ok(Err(err)) => Err((err.to_string(), None)),
                        Err(panic) => Err((
                            format!("action '{}' panicked: {}", action, panic_message(panic.as_ref())),
                            None,
                        )),
                    }
                }
            };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(data) => {
                info!(agent = %agent_id, action, elapsed_ms, success = true, "action completed");
                self.emit(
                    EventType::AgentActionCompleted,
                    json!({"agent_id": agent_id, "action": action, "elapsed_ms": elapsed_ms}),
                )
                .await;
                Envelope::success(agent_id, data)
            }
            Err((message, code)) => {
                warn!(
                    agent = %agent_id,
                    action,
                    elapsed_ms,
                    success = false,
                    error = %message,
                    "action failed"
                );
                self.emit(
                    EventType::AgentActionFailed,
                    json!({"agent_id": agent_id, "action": action, "error": message, "elapsed_ms": elapsed_ms}),
                )
                .await;
                Envelope::error(agent_id, message, code)
            }
        }
    }

    fn status(&self) -> Value {
        let agent_id = self.handler.agent_id();
        match self.capabilities() {
            Ok(capabilities) => json!({
                "agent_id": agent_id,
                "type": self.kind(),
                "capabilities": capabilities,
                "responsive": true,
                "requests_handled": self.requests_handled.load(Ordering::Relaxed),
            }),
            Err(err) => json!({
                "agent_id": agent_id,
                "type": self.kind(),
                "responsive": false,
                "error": err.to_string(),
            }),
        }
    }

    async fn shutdown(&self) -> Option<Envelope> {
        let agent_id = self.handler.agent_id().to_string();
        match self.handler.shutdown().await? {
            Ok(()) => {
                info!(agent = %agent_id, "agent shut down");
                Some(Envelope::success(agent_id, json!({"released": true})))
            }
            Err(err) => Some(Envelope::error(agent_id, err.to_string(), None)),
        }
    }
}
