//! The uniform success/error response envelope
//!
//! Every operation in the platform returns an [`Envelope`]: agents build
//! one at their dispatch boundary, and the orchestrator stamps routing
//! metadata on top. The envelope is the only externally-visible contract
//! of the core.
//!
//! # Examples
//!
//! ```rust
//! use maieutic_core::envelope::{Envelope, ErrorCode};
//! use serde_json::json;
//!
//! let ok = Envelope::success("user_manager", json!({"user_id": "42"}));
//! assert!(ok.success);
//!
//! let denied = Envelope::error("project_manager", "user_id is required", Some(ErrorCode::AuthRequired));
//! assert_eq!(denied.error_code, Some(ErrorCode::AuthRequired));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Machine-matchable failure tokens surfaced through [`Envelope::error_code`]
///
/// Structural routing failures (unknown agent, unknown capability,
/// unsupported action) intentionally carry no code; they are distinguished
/// by message plus diagnostic details instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthRequired,
    InvalidUser,
    UserInactive,
    ProjectIdRequired,
    ProjectNotFound,
    AccessDenied,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidUser => "INVALID_USER",
            ErrorCode::UserInactive => "USER_INACTIVE",
            ErrorCode::ProjectIdRequired => "PROJECT_ID_REQUIRED",
            ErrorCode::ProjectNotFound => "PROJECT_NOT_FOUND",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing metadata stamped by the orchestrator, exactly once per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub routed_by: String,
    pub agent_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Uniform result shape returned by every operation in the platform
///
/// `agent_id` and `timestamp` are stamped at the agent layer;
/// `orchestrator_metadata` only by the orchestrator. Structural routing
/// diagnostics (`available_agents`, `supported_actions`, ...) live in the
/// flattened `details` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestrator_metadata: Option<RoutingMetadata>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Envelope {
    /// Build a success envelope carrying `data`
    pub fn success<S: Into<String>>(agent_id: S, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            orchestrator_metadata: None,
            details: Map::new(),
        }
    }

    /// Build an error envelope with a human-readable message and an
    /// optional machine-matchable code
    pub fn error<S1: Into<String>, S2: Into<String>>(
        agent_id: S1,
        message: S2,
        error_code: Option<ErrorCode>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            orchestrator_metadata: None,
            details: Map::new(),
        }
    }

    /// Attach a diagnostic detail without disturbing any existing key
    pub fn with_detail<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.details.entry(key.into()).or_insert(value);
        self
    }

    /// Read back a diagnostic detail
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}
