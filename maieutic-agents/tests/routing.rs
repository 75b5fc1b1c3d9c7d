//! End-to-end routing tests over a fully initialized orchestrator

use maieutic_agents::config::{EventSinkKind, OrchestratorConfig};
use maieutic_agents::Orchestrator;
use maieutic_core::ErrorCode;
use serde_json::json;

fn quiet_config() -> OrchestratorConfig {
    OrchestratorConfig {
        events: EventSinkKind::Null,
        ..OrchestratorConfig::default()
    }
}

async fn orchestrator() -> Orchestrator {
    Orchestrator::from_config(&quiet_config())
        .await
        .expect("orchestrator should initialize")
}

async fn create_user(orchestrator: &Orchestrator, username: &str) -> String {
    let envelope = orchestrator
        .route_request("user_manager", "create_user", json!({"username": username}))
        .await;
    assert!(envelope.success, "create_user failed: {:?}", envelope.error);
    envelope.data.unwrap()["user"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_project(orchestrator: &Orchestrator, owner_id: &str, name: &str) -> String {
    let envelope = orchestrator
        .route_request(
            "project_manager",
            "create_project",
            json!({"user_id": owner_id, "name": name}),
        )
        .await;
    assert!(envelope.success, "create_project failed: {:?}", envelope.error);
    envelope.data.unwrap()["project"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn add_collaborator(orchestrator: &Orchestrator, owner_id: &str, project_id: &str, user_id: &str) {
    let envelope = orchestrator
        .route_request(
            "project_manager",
            "add_collaborator",
            json!({
                "user_id": owner_id,
                "project_id": project_id,
                "collaborator_id": user_id,
                "role": "developer",
            }),
        )
        .await;
    assert!(envelope.success, "add_collaborator failed: {:?}", envelope.error);
}

#[tokio::test]
async fn unknown_agent_reports_available_agents() {
    let orchestrator = orchestrator().await;
    let envelope = orchestrator.route_request("unknown_agent", "noop", json!({})).await;

    assert!(!envelope.success);
    assert!(envelope.error_code.is_none());
    assert_eq!(envelope.detail("requested_agent"), Some(&json!("unknown_agent")));
    let available = envelope
        .detail("available_agents")
        .and_then(|v| v.as_array())
        .expect("available_agents should be listed");
    assert!(available.contains(&json!("user_manager")));
    assert!(available.contains(&json!("project_manager")));
}

#[tokio::test]
async fn create_user_without_username_cites_missing_parameter() {
    let orchestrator = orchestrator().await;
    let envelope = orchestrator
        .route_request("user_manager", "create_user", json!({}))
        .await;

    assert!(!envelope.success);
    assert!(envelope
        .error
        .unwrap()
        .contains("missing required parameter 'username'"));
}

#[tokio::test]
async fn owner_reads_project_info() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": owner_id, "project_id": project_id}),
        )
        .await;

    assert!(envelope.success);
    let data = envelope.data.unwrap();
    assert_eq!(data["project"]["id"], json!(project_id));
    assert_eq!(data["role"], json!("owner"));
}

// A payload missing user_id must fail authentication first, even with a
// valid project_id present.
#[tokio::test]
async fn authentication_precedes_project_checks() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"project_id": project_id}),
        )
        .await;
    assert_eq!(envelope.error_code, Some(ErrorCode::AuthRequired));

    let envelope = orchestrator
        .route_request("project_manager", "get_project_info", json!({"user_id": owner_id}))
        .await;
    assert_eq!(envelope.error_code, Some(ErrorCode::ProjectIdRequired));
}

#[tokio::test]
async fn access_grants_are_role_scoped() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let dev_id = create_user(&orchestrator, "dev").await;
    let outsider_id = create_user(&orchestrator, "outsider").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;
    add_collaborator(&orchestrator, &owner_id, &project_id, &dev_id).await;

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": owner_id, "project_id": project_id}),
        )
        .await;
    assert_eq!(envelope.data.unwrap()["role"], json!("owner"));

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": dev_id, "project_id": project_id}),
        )
        .await;
    assert_eq!(envelope.data.unwrap()["role"], json!("developer"));

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": outsider_id, "project_id": project_id}),
        )
        .await;
    assert!(!envelope.success);
    assert_eq!(envelope.error_code, Some(ErrorCode::AccessDenied));
}

// A deactivated grant behaves exactly like no grant at all.
#[tokio::test]
async fn removed_collaborator_is_denied() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let dev_id = create_user(&orchestrator, "dev").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;
    add_collaborator(&orchestrator, &owner_id, &project_id, &dev_id).await;

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "remove_collaborator",
            json!({"user_id": owner_id, "project_id": project_id, "collaborator_id": dev_id}),
        )
        .await;
    assert!(envelope.success);

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": dev_id, "project_id": project_id}),
        )
        .await;
    assert_eq!(envelope.error_code, Some(ErrorCode::AccessDenied));
}

#[tokio::test]
async fn suspended_user_cannot_authenticate() {
    let orchestrator = orchestrator().await;
    let admin_id = create_user(&orchestrator, "admin").await;
    let target_id = create_user(&orchestrator, "target").await;

    let envelope = orchestrator
        .route_request(
            "user_manager",
            "set_user_status",
            json!({"user_id": admin_id, "id": target_id, "status": "suspended"}),
        )
        .await;
    assert!(envelope.success);

    let envelope = orchestrator
        .route_request("user_manager", "get_user", json!({"user_id": target_id}))
        .await;
    assert_eq!(envelope.error_code, Some(ErrorCode::UserInactive));
}

#[tokio::test]
async fn capability_routing_reaches_the_workflow_agents() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;

    let envelope = orchestrator
        .route_by_capability(
            "generate_questions",
            json!({
                "user_id": owner_id,
                "project_id": project_id,
                "topic": "session handling",
            }),
        )
        .await;

    assert!(envelope.success, "generate_questions failed: {:?}", envelope.error);
    assert_eq!(envelope.agent_id, "socratic");
    let metadata = envelope.orchestrator_metadata.unwrap();
    assert_eq!(metadata.action, "generate_questions");
    assert_eq!(envelope.data.unwrap()["kind"], json!("questions"));
}

#[tokio::test]
async fn workflow_chain_passes_artifacts_forward() {
    let orchestrator = orchestrator().await;
    let owner_id = create_user(&orchestrator, "owner").await;
    let project_id = create_project(&orchestrator, &owner_id, "demo").await;
    let scope = json!({"user_id": owner_id, "project_id": project_id});

    let mut payload = scope.clone();
    payload["requirements"] = json!(["users sign up", "owners share projects"]);
    let spec = orchestrator
        .route_by_capability("generate_specification", payload)
        .await;
    assert!(spec.success);
    let spec_text = spec.data.unwrap()["content"].as_str().unwrap().to_string();

    let mut payload = scope.clone();
    payload["specification"] = json!(spec_text);
    let architecture = orchestrator.route_by_capability("design_architecture", payload).await;
    assert!(architecture.success);
    let architecture_text = architecture.data.unwrap()["content"].as_str().unwrap().to_string();

    let mut payload = scope.clone();
    payload["architecture"] = json!(architecture_text);
    let code = orchestrator.route_by_capability("generate_code", payload).await;
    assert!(code.success);
    let code_text = code.data.unwrap()["content"].as_str().unwrap().to_string();

    let mut payload = scope.clone();
    payload["code"] = json!(code_text);
    let tests = orchestrator.route_by_capability("design_tests", payload).await;
    assert!(tests.success);
    assert_eq!(tests.agent_id, "reviewer");
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let orchestrator = orchestrator().await;

    let report = orchestrator.shutdown().await;
    assert_eq!(report["success"], json!(true));
    let status = orchestrator.get_agent_status().await;
    assert_eq!(status["agent_count"], json!(0));

    let report = orchestrator.shutdown().await;
    assert_eq!(report["success"], json!(true));
    let status = orchestrator.get_agent_status().await;
    assert_eq!(status["agent_count"], json!(0));
}

#[tokio::test]
async fn sqlite_backed_orchestrator_round_trip() {
    let temp_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config = OrchestratorConfig {
        database_url: Some(format!("sqlite://{}", temp_file.path().display())),
        events: EventSinkKind::Null,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::from_config(&config)
        .await
        .expect("orchestrator should initialize against sqlite");

    let owner_id = create_user(&orchestrator, "owner").await;
    let project_id = create_project(&orchestrator, &owner_id, "persistent-demo").await;

    let envelope = orchestrator
        .route_request(
            "project_manager",
            "get_project_info",
            json!({"user_id": owner_id, "project_id": project_id}),
        )
        .await;
    assert!(envelope.success);
    assert_eq!(envelope.data.unwrap()["project"]["name"], json!("persistent-demo"));
}
