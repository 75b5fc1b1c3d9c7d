//! Repository implementations for directory entities

mod collaborator;
mod project;
mod user;

pub use collaborator::CollaboratorRepository;
pub use project::ProjectRepository;
pub use user::UserRepository;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

/// Decode an RFC3339 timestamp column
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(anyhow::anyhow!("invalid timestamp '{}': {}", raw, e)))
}

/// Decode a UUID column
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::Internal(anyhow::anyhow!("invalid uuid '{}': {}", raw, e)))
}
