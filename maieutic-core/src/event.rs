//! Event model and the event-sink contract
//!
//! The platform emits best-effort events for observability: routing
//! decisions, agent action outcomes, and directory changes. There is a
//! single sink interface — [`EventSink::emit`] — and emission failures
//! are always swallowed by callers, never propagated into request
//! handling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::Result;

/// Event categories emitted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgentActionCompleted,
    AgentActionFailed,
    RequestRouted,
    UserCreated,
    UserStatusChanged,
    ProjectCreated,
    CollaboratorAdded,
    CollaboratorRemoved,
    ArtifactGenerated,
    OrchestratorShutdown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AgentActionCompleted => "agent_action_completed",
            EventType::AgentActionFailed => "agent_action_failed",
            EventType::RequestRouted => "request_routed",
            EventType::UserCreated => "user_created",
            EventType::UserStatusChanged => "user_status_changed",
            EventType::ProjectCreated => "project_created",
            EventType::CollaboratorAdded => "collaborator_added",
            EventType::CollaboratorRemoved => "collaborator_removed",
            EventType::ArtifactGenerated => "artifact_generated",
            EventType::OrchestratorShutdown => "orchestrator_shutdown",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single emitted event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub source: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new<S: Into<String>>(event_type: EventType, source: S, data: Value) -> Self {
        Self {
            event_type,
            source: source.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Best-effort event sink
///
/// Implementations must not block request handling; callers treat a
/// returned error as a log-and-continue situation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event) -> Result<()>;
}

/// Sink that drops every event; the documented null object used when
/// observability is disabled by configuration
#[derive(Debug, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: Event) -> Result<()> {
        Ok(())
    }
}

/// Sink that forwards events to the structured log
#[derive(Debug, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) -> Result<()> {
        info!(
            target: "maieutic::events",
            event_type = %event.event_type,
            source = %event.source,
            data = %event.data,
            "event emitted"
        );
        Ok(())
    }
}

/// Sink that fans events out to in-process subscribers
///
/// Lagging or absent subscribers never fail emission.
#[derive(Debug)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<Event>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: Event) -> Result<()> {
        // A send error only means there are no receivers right now.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Sink that records every event in memory; intended for tests and
/// short-lived diagnostics
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("event sink poisoned").clone()
    }

    /// Events of one type, in emission order
    pub fn events_of(&self, event_type: EventType) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: Event) -> Result<()> {
        self.events.lock().expect("event sink poisoned").push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        sink.emit(Event::new(EventType::UserCreated, "user_manager", json!({"id": 1})))
            .await
            .unwrap();
        sink.emit(Event::new(EventType::RequestRouted, "orchestrator", json!({"id": 2})))
            .await
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::UserCreated);
        assert_eq!(events[1].source, "orchestrator");
        assert_eq!(sink.events_of(EventType::RequestRouted).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_sink_without_subscribers() {
        let sink = BroadcastEventSink::new(16);
        // No receivers; emission is still best-effort success.
        let result = sink
            .emit(Event::new(EventType::RequestRouted, "orchestrator", json!({})))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscriber() {
        let sink = BroadcastEventSink::new(16);
        let mut receiver = sink.subscribe();
        sink.emit(Event::new(EventType::ArtifactGenerated, "socratic", json!({"kind": "questions"})))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::ArtifactGenerated);
        assert_eq!(event.data["kind"], json!("questions"));
    }

    #[test]
    fn test_event_type_serialization() {
        assert_eq!(
            serde_json::to_value(EventType::AgentActionFailed).unwrap(),
            json!("agent_action_failed")
        );
        assert_eq!(EventType::RequestRouted.as_str(), "request_routed");
    }
}
