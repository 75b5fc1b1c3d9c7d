//! Agent orchestrator: construction, capability routing, health, shutdown
//!
//! The orchestrator owns the live agent registry. Construction attempts
//! every known agent definition in priority order, records each failure
//! (with its category) instead of aborting, then builds the capability
//! registry from the survivors — so a broken optional agent degrades the
//! platform instead of taking it down. Once built, the registry and
//! capability map are read-only; routing is safe for concurrent callers.
//!
//! Routing never raises: unknown targets, unsupported actions, agent
//! errors, and even panicking agents all come back as error envelopes.

use chrono::Utc;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use maieutic_core::agent::{panic_message, Agent, AgentRuntime};
use maieutic_core::capability::CapabilityRegistry;
use maieutic_core::directory::{Directory, InMemoryDirectory};
use maieutic_core::envelope::{Envelope, RoutingMetadata};
use maieutic_core::event::{
    BroadcastEventSink, Event, EventSink, EventType, NullEventSink, TracingEventSink,
};
use maieutic_storage::StorageManager;

use crate::agents::{
    code_generator, project_manager, reviewer, socratic, spec_writer, user_manager,
    CodeGeneratorAgent, ProjectManagerAgent, ReviewerAgent, SocraticAgent, SpecWriterAgent,
    UserManagerAgent,
};
use crate::config::{EventSinkKind, OrchestratorConfig};
use crate::llm::{LlmClient, ScriptedLlmClient};

/// Source identifier the orchestrator stamps on envelopes and events
const ORCHESTRATOR_ID: &str = "orchestrator";

/// Why an agent failed to construct; the reason string lands in the
/// failure record for degraded-mode status reporting
#[derive(Debug, Error)]
pub enum AgentInitError {
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("disabled by configuration")]
    Disabled,

    #[error("construction failed: {0}")]
    Construction(String),
}

/// Dependencies handed to every agent factory
pub struct AgentContext {
    pub directory: Arc<dyn Directory>,
    pub events: Arc<dyn EventSink>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl AgentContext {
    fn require_llm(&self) -> Result<Arc<dyn LlmClient>, AgentInitError> {
        self.llm
            .clone()
            .ok_or_else(|| AgentInitError::DependencyUnavailable("llm client is not configured".to_string()))
    }
}

type BuildFn = fn(&AgentContext) -> Result<Arc<dyn Agent>, AgentInitError>;

/// One known agent: its id and how to construct it
struct AgentDefinition {
    id: &'static str,
    build: BuildFn,
}

fn build_user_manager(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = UserManagerAgent::new(ctx.directory.clone(), ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

fn build_project_manager(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = ProjectManagerAgent::new(ctx.directory.clone(), ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

fn build_socratic(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = SocraticAgent::new(ctx.require_llm()?, ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

fn build_spec_writer(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = SpecWriterAgent::new(ctx.require_llm()?, ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

fn build_code_generator(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = CodeGeneratorAgent::new(ctx.require_llm()?, ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

fn build_reviewer(ctx: &AgentContext) -> Result<Arc<dyn Agent>, AgentInitError> {
    let handler = ReviewerAgent::new(ctx.require_llm()?, ctx.events.clone());
    Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
}

/// Priority-ordered agent definitions; user_manager comes first because
/// every other agent assumes authenticated identity exists
fn builtin_agents() -> &'static [AgentDefinition] {
    &[
        AgentDefinition { id: user_manager::AGENT_ID, build: build_user_manager },
        AgentDefinition { id: project_manager::AGENT_ID, build: build_project_manager },
        AgentDefinition { id: socratic::AGENT_ID, build: build_socratic },
        AgentDefinition { id: spec_writer::AGENT_ID, build: build_spec_writer },
        AgentDefinition { id: code_generator::AGENT_ID, build: build_code_generator },
        AgentDefinition { id: reviewer::AGENT_ID, build: build_reviewer },
    ]
}

/// Registry state; read-only after initialization, cleared on shutdown
#[derive(Default)]
struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
    capabilities: CapabilityRegistry,
    failures: HashMap<String, String>,
}

/// Central dispatcher over the live agents
///
/// A value of this type is only obtainable fully initialized: the
/// constructor runs the whole initialization protocol before returning,
/// so callers never observe a partially-built orchestrator.
pub struct Orchestrator {
    registry: RwLock<AgentRegistry>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Build the orchestrator and all its dependencies from configuration
    pub async fn from_config(config: &OrchestratorConfig) -> maieutic_core::Result<Self> {
        let directory: Arc<dyn Directory> = match &config.database_url {
            Some(url) => {
                let manager = StorageManager::connect(url).await.map_err(maieutic_core::Error::from)?;
                manager.migrate().await.map_err(maieutic_core::Error::from)?;
                Arc::new(manager)
            }
            None => Arc::new(InMemoryDirectory::new()),
        };

        let events: Arc<dyn EventSink> = match config.events {
            EventSinkKind::Tracing => Arc::new(TracingEventSink),
            EventSinkKind::Broadcast => Arc::new(BroadcastEventSink::new(config.event_buffer)),
            EventSinkKind::Null => Arc::new(NullEventSink),
        };

        let llm: Option<Arc<dyn LlmClient>> = config
            .llm
            .enabled
            .then(|| Arc::new(ScriptedLlmClient::new(config.llm.model.clone())) as Arc<dyn LlmClient>);

        Ok(Self::initialize(config, directory, events, llm).await)
    }

    /// Build the orchestrator with injected dependencies
    ///
    /// Attempts every known agent in priority order; a failure records a
    /// reason and moves on, it never aborts the remaining agents.
    pub async fn initialize(
        config: &OrchestratorConfig,
        directory: Arc<dyn Directory>,
        events: Arc<dyn EventSink>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self::initialize_from_defs(builtin_agents(), config, directory, events, llm)
    }

    fn initialize_from_defs(
        defs: &[AgentDefinition],
        config: &OrchestratorConfig,
        directory: Arc<dyn Directory>,
        events: Arc<dyn EventSink>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let ctx = AgentContext {
            directory,
            events: events.clone(),
            llm,
        };

        let mut registry = AgentRegistry::default();
        for def in defs {
            if config.disabled_agents.iter().any(|id| id == def.id) {
                info!(agent = def.id, "agent disabled by configuration");
                registry
                    .failures
                    .insert(def.id.to_string(), AgentInitError::Disabled.to_string());
                continue;
            }

            // A panicking constructor is recorded like any other
            // construction failure.
            let built = std::panic::catch_unwind(AssertUnwindSafe(|| (def.build)(&ctx)))
                .unwrap_or_else(|panic| {
                    Err(AgentInitError::Construction(panic_message(panic.as_ref())))
                });

            match built {
                Ok(agent) => {
                    info!(agent = def.id, "agent registered");
                    registry.order.push(def.id.to_string());
                    registry.agents.insert(def.id.to_string(), agent);
                }
                Err(err) => {
                    warn!(agent = def.id, reason = %err, "agent failed to initialize");
                    registry.failures.insert(def.id.to_string(), err.to_string());
                }
            }
        }

        let snapshots = registry.order.iter().filter_map(|id| {
            let agent = registry.agents.get(id)?;
            match agent.capabilities() {
                Ok(capabilities) => Some((id.clone(), capabilities)),
                Err(err) => {
                    warn!(agent = %id, error = %err, "capability snapshot failed; agent has no routes");
                    None
                }
            }
        });
        registry.capabilities = CapabilityRegistry::build(snapshots.collect::<Vec<_>>());

        info!(
            agents = registry.agents.len(),
            failed = registry.failures.len(),
            capabilities = registry.capabilities.len(),
            "orchestrator ready"
        );

        Self {
            registry: RwLock::new(registry),
            events,
        }
    }

    /// Route a request directly to one agent
    pub async fn route_request(&self, agent_id: &str, action: &str, payload: Value) -> Envelope {
        let agent = {
            let registry = self.registry.read().await;
            match registry.agents.get(agent_id) {
                Some(agent) => agent.clone(),
                None => {
                    let mut available = registry.order.clone();
                    available.sort();
                    return Envelope::error(
                        ORCHESTRATOR_ID,
                        format!("unknown agent '{}'", agent_id),
                        None,
                    )
                    .with_detail("requested_agent", json!(agent_id))
                    .with_detail("agent_count", json!(available.len()))
                    .with_detail("available_agents", json!(available));
                }
            }
        };

        // Diagnostic-only check; a failing probe never blocks dispatch.
        match agent.capabilities() {
            Ok(capabilities) => {
                if !capabilities.iter().any(|c| c == action) {
                    return Envelope::error(
                        agent_id.to_string(),
                        format!("agent '{}' does not support action '{}'", agent_id, action),
                        None,
                    )
                    .with_detail("requested_action", json!(action))
                    .with_detail("supported_actions", json!(capabilities));
                }
            }
            Err(err) => {
                warn!(agent = agent_id, error = %err, "capability probe failed; dispatching anyway");
            }
        }

        let dispatched = AssertUnwindSafe(agent.process_request(action, payload))
            .catch_unwind()
            .await;
        let mut envelope = match dispatched {
            Ok(envelope) => envelope,
            Err(panic) => Envelope::error(
                agent_id.to_string(),
                format!(
                    "agent '{}' panicked during dispatch: {}",
                    agent_id,
                    panic_message(panic.as_ref())
                ),
                None,
            )
            .with_detail("exception_type", json!("panic")),
        };

        envelope.orchestrator_metadata = Some(RoutingMetadata {
            routed_by: ORCHESTRATOR_ID.to_string(),
            agent_id: agent_id.to_string(),
            action: action.to_string(),
            timestamp: Utc::now(),
        });

        self.emit(Event::new(
            EventType::RequestRouted,
            ORCHESTRATOR_ID,
            json!({"agent_id": agent_id, "action": action, "success": envelope.success}),
        ))
        .await;

        envelope
    }

    /// Route a request to whichever agent provides `capability`
    ///
    /// The capability name doubles as the action name by convention.
    pub async fn route_by_capability(&self, capability: &str, payload: Value) -> Envelope {
        let resolved = {
            let registry = self.registry.read().await;
            match registry.capabilities.lookup(capability) {
                Some(agent_id) => Ok(agent_id.to_string()),
                None => Err(Envelope::error(
                    ORCHESTRATOR_ID,
                    format!("no agent provides capability '{}'", capability),
                    None,
                )
                .with_detail("requested_capability", json!(capability))
                .with_detail(
                    "available_capabilities",
                    json!(registry.capabilities.all_capabilities()),
                )),
            }
        };

        match resolved {
            Ok(agent_id) => self.route_request(&agent_id, capability, payload).await,
            Err(envelope) => envelope,
        }
    }

    /// Status blocks for every live and every failed agent; never raises
    pub async fn get_agent_status(&self) -> Value {
        let registry = self.registry.read().await;
        let mut agents = Map::new();

        for id in &registry.order {
            let Some(agent) = registry.agents.get(id) else { continue };
            let block = std::panic::catch_unwind(AssertUnwindSafe(|| agent.status()))
                .unwrap_or_else(|panic| {
                    json!({
                        "agent_id": id,
                        "status": "error",
                        "error": format!("status probe panicked: {}", panic_message(panic.as_ref())),
                    })
                });
            agents.insert(id.clone(), block);
        }

        for (id, reason) in &registry.failures {
            agents.insert(
                id.clone(),
                json!({"agent_id": id, "status": "failed", "error": reason}),
            );
        }

        json!({
            "agents": agents,
            "agent_count": registry.agents.len(),
            "failed_count": registry.failures.len(),
        })
    }

    /// Sorted list of every routable capability
    pub async fn get_available_capabilities(&self) -> Vec<String> {
        self.registry.read().await.capabilities.all_capabilities()
    }

    /// Probe every live agent and derive an overall health score
    ///
    /// Each agent scores 100 (responsive) or 0; `healthy` >= 80,
    /// `degraded` >= 50, otherwise `unhealthy`. Zero live agents is
    /// score 0.0 and `unhealthy`, not an error.
    pub async fn health_check(&self) -> Value {
        let registry = self.registry.read().await;
        let mut agents = Map::new();
        let mut total = 0.0;

        for id in &registry.order {
            let Some(agent) = registry.agents.get(id) else { continue };
            let score = match agent.capabilities() {
                Ok(_) => 100.0,
                Err(err) => {
                    warn!(agent = %id, error = %err, "agent failed health probe");
                    0.0
                }
            };
            total += score;
            agents.insert(
                id.clone(),
                json!({"score": score, "responsive": score > 0.0}),
            );
        }

        let overall_score = if registry.order.is_empty() {
            0.0
        } else {
            total / registry.order.len() as f64
        };
        let status = if overall_score >= 80.0 {
            "healthy"
        } else if overall_score >= 50.0 {
            "degraded"
        } else {
            "unhealthy"
        };

        json!({
            "status": status,
            "overall_score": overall_score,
            "agents": agents,
        })
    }

    /// Shut down every live agent and clear the registry; idempotent
    pub async fn shutdown(&self) -> Value {
        let mut registry = self.registry.write().await;
        let mut outcomes = Map::new();

        for id in registry.order.clone() {
            let Some(agent) = registry.agents.get(&id) else { continue };
            let outcome = match AssertUnwindSafe(agent.shutdown()).catch_unwind().await {
                Err(panic) => format!("error: shutdown panicked: {}", panic_message(panic.as_ref())),
                Ok(None) => "no_shutdown_method".to_string(),
                Ok(Some(envelope)) if envelope.success => "success".to_string(),
                Ok(Some(envelope)) => format!(
                    "error: {}",
                    envelope.error.unwrap_or_else(|| "unknown failure".to_string())
                ),
            };
            outcomes.insert(id, json!(outcome));
        }

        let stopped = registry.agents.len();
        registry.agents.clear();
        registry.order.clear();
        registry.capabilities = CapabilityRegistry::default();
        registry.failures.clear();
        drop(registry);

        info!(stopped, "orchestrator shut down");
        self.emit(Event::new(
            EventType::OrchestratorShutdown,
            ORCHESTRATOR_ID,
            json!({"agents_stopped": stopped}),
        ))
        .await;

        json!({"success": true, "agents": outcomes})
    }

    async fn emit(&self, event: Event) {
        if let Err(err) = self.events.emit(event).await {
            warn!(error = %err, "failed to emit orchestrator event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maieutic_core::access::AccessPolicy;
    use maieutic_core::agent::{ActionHandler, ActionSpec};
    use maieutic_core::event::CollectingEventSink;
    use maieutic_core::{Error, Result};

    fn context() -> (Arc<InMemoryDirectory>, Arc<CollectingEventSink>) {
        (Arc::new(InMemoryDirectory::new()), Arc::new(CollectingEventSink::new()))
    }

    async fn full_orchestrator() -> (Orchestrator, Arc<InMemoryDirectory>, Arc<CollectingEventSink>) {
        let (directory, sink) = context();
        let orchestrator = Orchestrator::initialize(
            &OrchestratorConfig::default(),
            directory.clone(),
            sink.clone(),
            Some(Arc::new(ScriptedLlmClient::new("scripted-v1"))),
        )
        .await;
        (orchestrator, directory, sink)
    }

    // --- test-only agent definitions for registry-level behavior ---

    struct StaticHandler {
        id: &'static str,
        actions: &'static [ActionSpec],
    }

    #[async_trait]
    impl ActionHandler for StaticHandler {
        fn agent_id(&self) -> &str {
            self.id
        }

        fn actions(&self) -> &'static [ActionSpec] {
            self.actions
        }

        async fn handle(&self, _action: &str, _payload: Map<String, Value>) -> Result<Value> {
            Ok(json!({"handled_by": self.id}))
        }
    }

    const FOO_ACTIONS: &[ActionSpec] = &[ActionSpec::new("foo", AccessPolicy::Public)];

    fn build_first_foo(ctx: &AgentContext) -> std::result::Result<Arc<dyn Agent>, AgentInitError> {
        let handler = StaticHandler { id: "first_foo", actions: FOO_ACTIONS };
        Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
    }

    fn build_second_foo(ctx: &AgentContext) -> std::result::Result<Arc<dyn Agent>, AgentInitError> {
        let handler = StaticHandler { id: "second_foo", actions: FOO_ACTIONS };
        Ok(AgentRuntime::new(handler, ctx.directory.clone(), ctx.events.clone()).into_agent())
    }

    fn build_panicking(_ctx: &AgentContext) -> std::result::Result<Arc<dyn Agent>, AgentInitError> {
        panic!("constructor exploded");
    }

    struct WedgedAgent;

    #[async_trait]
    impl Agent for WedgedAgent {
        fn agent_id(&self) -> &str {
            "wedged"
        }

        fn kind(&self) -> &'static str {
            "WedgedAgent"
        }

        fn capabilities(&self) -> Result<Vec<String>> {
            Err(Error::internal("capability probe wedged"))
        }

        async fn process_request(&self, _action: &str, _payload: Value) -> Envelope {
            Envelope::success("wedged", json!({}))
        }

        fn status(&self) -> Value {
            json!({"agent_id": "wedged", "responsive": false})
        }

        async fn shutdown(&self) -> Option<Envelope> {
            None
        }
    }

    fn build_wedged(_ctx: &AgentContext) -> std::result::Result<Arc<dyn Agent>, AgentInitError> {
        Ok(Arc::new(WedgedAgent))
    }

    fn orchestrator_from(defs: &[AgentDefinition]) -> Orchestrator {
        let (directory, sink) = context();
        Orchestrator::initialize_from_defs(
            defs,
            &OrchestratorConfig::default(),
            directory,
            sink,
            None,
        )
    }

    #[tokio::test]
    async fn test_full_initialization_registers_all_agents() {
        let (orchestrator, _, _) = full_orchestrator().await;
        let status = orchestrator.get_agent_status().await;
        assert_eq!(status["agent_count"], json!(6));
        assert_eq!(status["failed_count"], json!(0));

        let capabilities = orchestrator.get_available_capabilities().await;
        assert!(capabilities.contains(&"create_user".to_string()));
        assert!(capabilities.contains(&"generate_questions".to_string()));
        assert!(capabilities.contains(&"propose_corrections".to_string()));
    }

    // Without an LLM client the four workflow agents fail construction,
    // the directory agents keep working, and the failures are observable.
    #[tokio::test]
    async fn test_degraded_initialization_without_llm() {
        let (directory, sink) = context();
        let orchestrator = Orchestrator::initialize(
            &OrchestratorConfig::default(),
            directory,
            sink,
            None,
        )
        .await;

        let status = orchestrator.get_agent_status().await;
        assert_eq!(status["agent_count"], json!(2));
        assert_eq!(status["failed_count"], json!(4));
        assert_eq!(status["agents"]["socratic"]["status"], json!("failed"));
        assert!(status["agents"]["socratic"]["error"]
            .as_str()
            .unwrap()
            .contains("dependency unavailable"));
        assert_eq!(status["agents"]["user_manager"]["responsive"], json!(true));

        // Live agents still route fine.
        let envelope = orchestrator
            .route_request("user_manager", "create_user", json!({"username": "alice"}))
            .await;
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn test_disabled_agent_recorded() {
        let (directory, sink) = context();
        let config = OrchestratorConfig {
            disabled_agents: vec!["reviewer".to_string()],
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::initialize(
            &config,
            directory,
            sink,
            Some(Arc::new(ScriptedLlmClient::new("scripted-v1"))),
        )
        .await;

        let status = orchestrator.get_agent_status().await;
        assert_eq!(status["agents"]["reviewer"]["status"], json!("failed"));
        assert_eq!(
            status["agents"]["reviewer"]["error"],
            json!("disabled by configuration")
        );
        assert_eq!(status["agent_count"], json!(5));
    }

    #[tokio::test]
    async fn test_panicking_constructor_is_contained() {
        let defs = [
            AgentDefinition { id: "boom", build: build_panicking },
            AgentDefinition { id: "first_foo", build: build_first_foo },
        ];
        let orchestrator = orchestrator_from(&defs);

        let status = orchestrator.get_agent_status().await;
        assert_eq!(status["agent_count"], json!(1));
        assert!(status["agents"]["boom"]["error"]
            .as_str()
            .unwrap()
            .contains("construction failed"));
        assert!(status["agents"]["boom"]["error"]
            .as_str()
            .unwrap()
            .contains("constructor exploded"));

        // The survivor still routes.
        let envelope = orchestrator.route_request("first_foo", "foo", json!({})).await;
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn test_capability_collision_first_registrant_wins() {
        let defs = [
            AgentDefinition { id: "first_foo", build: build_first_foo },
            AgentDefinition { id: "second_foo", build: build_second_foo },
        ];
        let orchestrator = orchestrator_from(&defs);

        // The collided capability is listed exactly once.
        let capabilities = orchestrator.get_available_capabilities().await;
        assert_eq!(capabilities.iter().filter(|c| c.as_str() == "foo").count(), 1);

        // Dispatch is deterministic across repeated calls.
        for _ in 0..8 {
            let envelope = orchestrator.route_by_capability("foo", json!({})).await;
            assert!(envelope.success);
            assert_eq!(envelope.data.unwrap()["handled_by"], json!("first_foo"));
            assert_eq!(envelope.agent_id, "first_foo");
        }
    }

    #[tokio::test]
    async fn test_unknown_agent_diagnostics() {
        let (orchestrator, _, _) = full_orchestrator().await;
        let envelope = orchestrator.route_request("unknown_agent", "noop", json!({})).await;

        assert!(!envelope.success);
        assert!(envelope.error_code.is_none());
        assert_eq!(envelope.detail("requested_agent"), Some(&json!("unknown_agent")));
        assert_eq!(envelope.detail("agent_count"), Some(&json!(6)));
        let available = envelope.detail("available_agents").unwrap().as_array().unwrap();
        assert!(available.contains(&json!("user_manager")));
    }

    #[tokio::test]
    async fn test_unsupported_action_diagnostics() {
        let (orchestrator, _, _) = full_orchestrator().await;
        let envelope = orchestrator
            .route_request("user_manager", "launch_rockets", json!({}))
            .await;

        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("does not support"));
        let supported = envelope.detail("supported_actions").unwrap().as_array().unwrap();
        assert!(supported.contains(&json!("create_user")));
    }

    #[tokio::test]
    async fn test_unknown_capability_diagnostics() {
        let (orchestrator, _, _) = full_orchestrator().await;
        let envelope = orchestrator.route_by_capability("levitate", json!({})).await;

        assert!(!envelope.success);
        assert_eq!(envelope.detail("requested_capability"), Some(&json!("levitate")));
        assert!(envelope
            .detail("available_capabilities")
            .unwrap()
            .as_array()
            .unwrap()
            .contains(&json!("create_user")));
    }

    #[tokio::test]
    async fn test_routing_metadata_stamped_once() {
        let (orchestrator, _, sink) = full_orchestrator().await;
        let envelope = orchestrator
            .route_request("user_manager", "create_user", json!({"username": "alice"}))
            .await;

        let metadata = envelope.orchestrator_metadata.unwrap();
        assert_eq!(metadata.routed_by, "orchestrator");
        assert_eq!(metadata.agent_id, "user_manager");
        assert_eq!(metadata.action, "create_user");

        let routed = sink.events_of(EventType::RequestRouted);
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].data["success"], json!(true));
    }

    #[tokio::test]
    async fn test_wedged_capability_probe_does_not_block_dispatch() {
        let defs = [AgentDefinition { id: "wedged", build: build_wedged }];
        let orchestrator = orchestrator_from(&defs);

        // The probe fails, dispatch proceeds anyway.
        let envelope = orchestrator.route_request("wedged", "anything", json!({})).await;
        assert!(envelope.success);

        // And the health check scores it zero.
        let health = orchestrator.health_check().await;
        assert_eq!(health["status"], json!("unhealthy"));
        assert_eq!(health["overall_score"], json!(0.0));
        assert_eq!(health["agents"]["wedged"]["responsive"], json!(false));
    }

    #[tokio::test]
    async fn test_health_tiers() {
        let (orchestrator, _, _) = full_orchestrator().await;
        let health = orchestrator.health_check().await;
        assert_eq!(health["status"], json!("healthy"));
        assert_eq!(health["overall_score"], json!(100.0));

        let mixed = orchestrator_from(&[
            AgentDefinition { id: "first_foo", build: build_first_foo },
            AgentDefinition { id: "wedged", build: build_wedged },
        ]);
        let health = mixed.health_check().await;
        assert_eq!(health["status"], json!("degraded"));
        assert_eq!(health["overall_score"], json!(50.0));
    }

    #[tokio::test]
    async fn test_health_check_with_zero_agents() {
        let orchestrator = orchestrator_from(&[]);
        let health = orchestrator.health_check().await;
        assert_eq!(health["overall_score"], json!(0.0));
        assert_eq!(health["status"], json!("unhealthy"));
    }

    #[tokio::test]
    async fn test_shutdown_outcomes_and_idempotence() {
        let (orchestrator, _, _) = full_orchestrator().await;

        let report = orchestrator.shutdown().await;
        assert_eq!(report["success"], json!(true));
        // Directory agents have no shutdown behavior; LLM agents do.
        assert_eq!(report["agents"]["user_manager"], json!("no_shutdown_method"));
        assert_eq!(report["agents"]["project_manager"], json!("no_shutdown_method"));
        assert_eq!(report["agents"]["socratic"], json!("success"));
        assert_eq!(report["agents"]["reviewer"], json!("success"));

        // The registry is empty afterwards.
        let status = orchestrator.get_agent_status().await;
        assert_eq!(status["agent_count"], json!(0));
        assert!(orchestrator.get_available_capabilities().await.is_empty());

        // A second shutdown is a clean no-op.
        let report = orchestrator.shutdown().await;
        assert_eq!(report["success"], json!(true));
        assert_eq!(report["agents"], json!({}));
    }

    #[tokio::test]
    async fn test_routing_after_shutdown_reports_unknown_agent() {
        let (orchestrator, _, _) = full_orchestrator().await;
        orchestrator.shutdown().await;

        let envelope = orchestrator
            .route_request("user_manager", "create_user", json!({"username": "alice"}))
            .await;
        assert!(!envelope.success);
        assert_eq!(envelope.detail("agent_count"), Some(&json!(0)));
    }
}
