//! Error handling utilities for repositories

use overlord_core::error::DomainError;
use overlord_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Create a "user not found" error
pub fn user_not_found(id: Snowflake) -> DomainError {
    DomainError::UserNotFound(id)
}

/// Create an "event not found" error
pub fn event_not_found(id: i64) -> DomainError {
    DomainError::EventNotFound(id)
}
