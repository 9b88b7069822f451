//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Event, EventRecord, NewEvent, Role, StatKind, User, UserStats};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    /// Find user by name and discriminator
    async fn find_by_tag(&self, name: &str, discriminator: &str) -> RepoResult<Option<User>>;

    /// List users currently in the guild
    async fn list_present(&self) -> RepoResult<Vec<User>>;

    /// Insert or replace a user row
    async fn upsert(&self, user: &User) -> RepoResult<()>;

    /// Clear display name and roles of a single user
    async fn mark_absent(&self, id: Snowflake) -> RepoResult<()>;

    /// Clear display name and roles of every user, returns affected rows
    async fn mark_all_absent(&self) -> RepoResult<u64>;

    /// Hard delete a user together with their events and stats
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Hard delete every absent user, returns affected rows
    async fn purge_absent(&self) -> RepoResult<u64>;
}

// ============================================================================
// Role Repository
// ============================================================================

/// Row counts of a full-table role sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub inserted: u64,
    pub updated: u64,
    pub removed: u64,
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find role by name
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>>;

    /// List all roles ordered by index
    async fn list(&self) -> RepoResult<Vec<Role>>;

    /// Replace the role table with `roles`: upsert by id, delete the rest
    async fn sync_all(&self, roles: &[Role]) -> RepoResult<SyncSummary>;
}

// ============================================================================
// Event Repository
// ============================================================================

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append an event without stat changes
    async fn append(&self, event: &NewEvent) -> RepoResult<Event>;

    /// Append an event, consume the matched join and apply the stat deltas
    /// in a single transaction
    async fn record(&self, record: &EventRecord) -> RepoResult<Event>;

    /// Latest member join/leave event of a user
    async fn last_member_event(&self, user_id: Snowflake) -> RepoResult<Option<Event>>;

    /// Latest voice join/leave event of a user in a channel
    async fn last_voice_event(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<Option<Event>>;

    /// The message-new event logged for a message
    async fn find_message(&self, message_id: Snowflake) -> RepoResult<Option<Event>>;

    /// Delete a single event
    async fn delete(&self, id: i64) -> RepoResult<()>;

    /// Move an event to a different point in time
    async fn set_created_at(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()>;

    /// Time of the latest member join for every present user
    async fn latest_joins(&self) -> RepoResult<Vec<(Snowflake, DateTime<Utc>)>>;
}

// ============================================================================
// Stat Repository
// ============================================================================

#[async_trait]
pub trait StatRepository: Send + Sync {
    /// Read a single stat, 0 when unset
    async fn get(&self, user_id: Snowflake, kind: StatKind) -> RepoResult<i64>;

    /// Read every stat of a user
    async fn load(&self, user_id: Snowflake) -> RepoResult<UserStats>;

    /// Overwrite a single stat
    async fn set(&self, user_id: Snowflake, kind: StatKind, value: i64) -> RepoResult<()>;

    /// Overwrite one stat for many users in a single transaction
    async fn set_many(&self, kind: StatKind, values: &[(Snowflake, i64)]) -> RepoResult<()>;
}
