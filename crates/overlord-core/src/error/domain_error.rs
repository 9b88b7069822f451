//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Member not found in guild: {0}")]
    MemberNotFound(Snowflake),

    #[error("Event not found: {0}")]
    EventNotFound(i64),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid configuration at {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get a stable error code string for logs and operator notices
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",
            Self::MemberNotFound(_) => "UNKNOWN_MEMBER",
            Self::EventNotFound(_) => "UNKNOWN_EVENT",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::PlatformError(_) => "PLATFORM_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::RoleNotFound(_)
                | Self::MemberNotFound(_)
                | Self::EventNotFound(_)
        )
    }

    /// Check if this is a configuration error (fatal at startup)
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Errors that abort the current handler only
    pub fn is_recoverable(&self) -> bool {
        !self.is_config()
    }
}
