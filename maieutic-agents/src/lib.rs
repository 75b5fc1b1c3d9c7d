//! Concrete agents and the routing orchestrator for Maieutic
//!
//! The orchestrator owns agent construction (with per-agent failure
//! isolation), the capability registry, the two routing entry points,
//! and health/shutdown aggregation. The agents implement the Socratic
//! workflow: user and project management backed by the directory, and
//! the question/spec/code/review pipeline backed by an opaque LLM
//! client.

pub mod agents;
pub mod config;
pub mod llm;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use orchestrator::Orchestrator;
