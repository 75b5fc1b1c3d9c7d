//! Persistence layer for the Maieutic directory
//!
//! This crate provides the SQLite-backed implementation of the
//! [`maieutic_core::directory::Directory`] contract: repositories for
//! users, projects, and collaborator records, plus the
//! [`StorageManager`] that owns the connection pool and migrations.

pub mod error;
pub mod manager;
pub mod repositories;

pub use error::{Error, Result};
pub use manager::StorageManager;

/// Re-export core types for convenience
pub use maieutic_core as core;
