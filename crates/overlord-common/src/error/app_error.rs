//! Application error types
//!
//! Unified error handling for the bot runtime.

use overlord_core::DomainError;
use std::fmt;

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Startup ordering
    #[error("Startup aborted: {0}")]
    Startup(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Platform client errors
    #[error("Platform error: {0}")]
    Platform(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// Get error code for logs and operator notices
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Startup(_) => "STARTUP_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Platform(_) => "PLATFORM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Errors that must stop the process instead of aborting a single handler
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Startup(_) => true,
            Self::Domain(e) => e.is_config(),
            Self::Database(_) | Self::Platform(_) | Self::Internal(_) => false,
        }
    }

    /// Process exit code for fatal errors
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,
            Self::Domain(e) if e.is_config() => 78,
            _ => 1,
        }
    }

    /// Create a startup error
    #[must_use]
    pub fn startup(msg: impl fmt::Display) -> Self {
        Self::Startup(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
