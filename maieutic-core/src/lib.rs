//! Core domain models and traits for the Maieutic orchestration platform
//!
//! This crate contains the building blocks shared by every agent in the
//! system: the uniform response envelope, the access-control pipeline,
//! the agent dispatch contract, the capability registry, and the narrow
//! interfaces for the user/project directory and the event sink.

pub mod access;
pub mod agent;
pub mod capability;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod event;

pub use envelope::{Envelope, ErrorCode, RoutingMetadata};
pub use error::{Error, Result};
