//! Walk one Socratic session through the orchestrator: bootstrap a user
//! and a project, route a question round, then shut down.
//!
//! Run with: cargo run --example socratic_session

use maieutic_agents::{Orchestrator, OrchestratorConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let orchestrator = Orchestrator::from_config(&OrchestratorConfig::default()).await?;
    println!("capabilities: {:?}", orchestrator.get_available_capabilities().await);

    let envelope = orchestrator
        .route_request("user_manager", "create_user", json!({"username": "demo"}))
        .await;
    let user_id = envelope.data.as_ref().and_then(|d| d["user"]["id"].as_str()).unwrap().to_string();

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "create_project",
            json!({"user_id": user_id, "name": "checkout-service"}),
        )
        .await;
    let project_id = envelope
        .data
        .as_ref()
        .and_then(|d| d["project"]["id"].as_str())
        .unwrap()
        .to_string();

    let envelope = orchestrator
        .route_by_capability(
            "generate_questions",
            json!({"user_id": user_id, "project_id": project_id, "topic": "payment flows"}),
        )
        .await;
    println!("questions: {}", serde_json::to_string_pretty(&envelope)?);

    let health = orchestrator.health_check().await;
    println!("health: {}", health["status"]);

    let report = orchestrator.shutdown().await;
    println!("shutdown: {}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
