//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use overlord_common::{AppError, ConfigError};
use overlord_core::DomainError;
use std::fmt;

use super::state::SyncState;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation or repository failure
    Domain(DomainError),

    /// Bot configuration could not be turned into a rank table
    Config(ConfigError),

    /// Operation needs a later synchronization state
    PrerequisiteNotMet {
        operation: &'static str,
        state: SyncState,
    },

    /// Platform call failed; the handler is aborted
    Platform(String),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Validation error
    Validation(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::PrerequisiteNotMet { operation, state } => {
                write!(f, "Cannot {operation}: awaiting synchronization (state {state})")
            }
            Self::Platform(msg) => write!(f, "Platform error: {msg}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors that abort one handler but leave the bot running
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::PrerequisiteNotMet { .. } | Self::Platform(_) | Self::NotFound { .. } => true,
            Self::Validation(_) | Self::Internal(_) => false,
        }
    }

    /// Already reported to operators when it was raised
    pub fn is_prerequisite(&self) -> bool {
        matches!(self, Self::PrerequisiteNotMet { .. })
    }

    /// Get the error code for logs and operator notices
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::PrerequisiteNotMet { .. } => "PREREQUISITE_NOT_MET",
            Self::Platform(_) => "PLATFORM_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::PlatformError(msg) => Self::Platform(msg),
            other => Self::Domain(other),
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::Config(e) => AppError::Config(e),
            ServiceError::PrerequisiteNotMet { operation, state } => AppError::startup(format!(
                "cannot {operation} in state {state}"
            )),
            ServiceError::Platform(msg) => AppError::Platform(msg),
            ServiceError::NotFound { resource, id } => {
                AppError::Domain(DomainError::ValidationError(format!("{resource} {id} not found")))
            }
            ServiceError::Validation(msg) => AppError::Domain(DomainError::ValidationError(msg)),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
