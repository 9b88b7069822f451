//! Platform port - what the bot needs from the chat platform client

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::entities::{MemberSnapshot, RoleSnapshot};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for platform calls
pub type PlatformResult<T> = Result<T, DomainError>;

/// Severity of an operator notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message posted to the operators' channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{}] {}", prefix, self.message)
    }
}

/// The connected guild, as seen through the platform client.
///
/// Timeouts and retries are the client's concern; a failed call surfaces
/// as `DomainError::PlatformError`.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Current role list of the guild
    async fn fetch_roles(&self) -> PlatformResult<Vec<RoleSnapshot>>;

    /// Stream every guild member
    fn fetch_members(&self) -> BoxStream<'_, PlatformResult<MemberSnapshot>>;

    /// A single member, `None` when not in the guild
    async fn fetch_member(&self, user_id: Snowflake) -> PlatformResult<Option<MemberSnapshot>>;

    async fn add_roles(&self, user_id: Snowflake, role_ids: &[Snowflake]) -> PlatformResult<()>;

    async fn remove_roles(&self, user_id: Snowflake, role_ids: &[Snowflake]) -> PlatformResult<()>;

    /// Post a notice to the operators
    async fn notify(&self, notice: Notice) -> PlatformResult<()>;
}
