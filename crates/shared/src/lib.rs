//! Shared library for the manga-popularity workspace.
//!
//! This crate provides common functionality used by the binary crate:
//! - Configuration and credential loading
//! - Domain models (tokens, manga list entries)
//! - Output path utilities
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;
pub mod paths;

// Re-export commonly used types
pub use config::{ChallengeMethod, Config, Credentials, CredentialsError};
pub use logging::LogConfig;
pub use models::*;
pub use paths::OutputPaths;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
