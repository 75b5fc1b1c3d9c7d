//! User management agent
//!
//! Account bootstrap and lifecycle. `create_user` is the one public
//! action in the platform — every other call needs an authenticated
//! caller, and callers have to come from somewhere.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use maieutic_core::access::AccessPolicy;
use maieutic_core::agent::{ActionHandler, ActionSpec};
use maieutic_core::directory::{Directory, User, UserStatus};
use maieutic_core::event::{Event, EventSink, EventType};
use maieutic_core::{Error, Result};

use super::{authenticated_user, emit_best_effort, optional_str, require_str, require_uuid};

pub const AGENT_ID: &str = "user_manager";

const ACTIONS: &[ActionSpec] = &[
    ActionSpec::new("create_user", AccessPolicy::Public),
    ActionSpec::new("get_user", AccessPolicy::Authenticated),
    ActionSpec::new("set_user_status", AccessPolicy::Authenticated),
];

/// Agent owning user records
pub struct UserManagerAgent {
    directory: Arc<dyn Directory>,
    events: Arc<dyn EventSink>,
}

impl UserManagerAgent {
    pub fn new(directory: Arc<dyn Directory>, events: Arc<dyn EventSink>) -> Self {
        Self { directory, events }
    }

    async fn create_user(&self, payload: &Map<String, Value>) -> Result<Value> {
        let username = require_str(payload, "username")?;
        let display_name = optional_str(payload, "display_name").map(str::to_string);

        if self.directory.user_by_username(username).await?.is_some() {
            return Err(Error::conflict(format!(
                "User with username '{}' already exists",
                username
            )));
        }

        let user = User::new(username, display_name)?;
        self.directory.create_user(&user).await?;
        info!("Created user: {} ({})", user.username, user.id);

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::UserCreated,
                AGENT_ID,
                json!({"user_id": user.id, "username": user.username}),
            ),
        )
        .await;

        Ok(json!({"user": user}))
    }

    /// Look up a user by `id`, defaulting to the caller
    async fn get_user(&self, payload: &Map<String, Value>) -> Result<Value> {
        let user = match optional_str(payload, "id") {
            Some(raw) => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| Error::validation("parameter 'id' must be a valid id"))?;
                self.directory
                    .user_by_id(id)
                    .await?
                    .ok_or_else(|| Error::not_found("User", raw))?
            }
            None => authenticated_user(payload)?,
        };
        Ok(json!({"user": user}))
    }

    async fn set_user_status(&self, payload: &Map<String, Value>) -> Result<Value> {
        let id = require_uuid(payload, "id")?;
        let status: UserStatus = require_str(payload, "status")?.parse()?;

        self.directory.set_user_status(id, status).await?;
        info!("Updated user status: {} -> {}", id, status);

        emit_best_effort(
            self.events.as_ref(),
            Event::new(
                EventType::UserStatusChanged,
                AGENT_ID,
                json!({"user_id": id, "status": status.as_str()}),
            ),
        )
        .await;

        Ok(json!({"user_id": id.to_string(), "status": status.as_str()}))
    }
}

#[async_trait]
impl ActionHandler for UserManagerAgent {
    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    async fn handle(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        match action {
            "create_user" => self.create_user(&payload).await,
            "get_user" => self.get_user(&payload).await,
            "set_user_status" => self.set_user_status(&payload).await,
            other => Err(Error::validation(format!("unknown action '{}'", other))),
        }
    }
}
