//! Orchestrator configuration
//!
//! Optional-dependency wiring is decided here, at startup, not by
//! import-failure fallbacks: no `database_url` selects the in-memory
//! directory, `llm.enabled = false` leaves the LLM-backed agents
//! unconstructed (the orchestrator records the reason and runs
//! degraded).
//!
//! Values come from an optional `maieutic.toml` next to the process,
//! overridden by `MAIEUTIC_*` environment variables
//! (e.g. `MAIEUTIC_DATABASE_URL`, `MAIEUTIC_LLM__ENABLED`).

use maieutic_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which event sink the orchestrator wires into the agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    /// Structured log emission (default)
    Tracing,
    /// In-process broadcast channel for subscribers
    Broadcast,
    /// Drop everything
    Null,
}

/// LLM client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "scripted-v1".to_string(),
        }
    }
}

/// Top-level orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// SQLite URL for the directory; `None` selects the in-memory backend
    pub database_url: Option<String>,
    pub events: EventSinkKind,
    /// Buffer size when `events` is `broadcast`
    pub event_buffer: usize,
    pub llm: LlmConfig,
    /// Agent ids excluded from construction
    pub disabled_agents: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            events: EventSinkKind::Tracing,
            event_buffer: 256,
            llm: LlmConfig::default(),
            disabled_agents: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from `maieutic.toml` (if present) and the
    /// environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("maieutic").required(false))
            .add_source(config::Environment::with_prefix("MAIEUTIC").separator("__"))
            .build()
            .map_err(|e| Error::configuration(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::configuration(e.to_string()))
    }
}
