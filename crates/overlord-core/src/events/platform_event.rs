//! Platform events - notifications delivered by the platform client
//!
//! These are the inputs of the bot: the dispatcher feeds them, in arrival
//! order, to the aggregator and the sync state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{MemberSnapshot, RoleSnapshot};
use crate::value_objects::Snowflake;

/// All platform notifications the bot reacts to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformEvent {
    // =========================================================================
    // Member Events
    // =========================================================================
    MemberJoined(MemberJoinedEvent),
    MemberLeft(MemberLeftEvent),
    MemberUpdated(MemberUpdatedEvent),

    // =========================================================================
    // Message Events
    // =========================================================================
    MessageCreated(MessageCreatedEvent),
    MessageEdited(MessageEditedEvent),
    MessageDeleted(MessageDeletedEvent),

    // =========================================================================
    // Voice Events
    // =========================================================================
    VoiceStateUpdated(VoiceStateUpdatedEvent),

    // =========================================================================
    // Role Events
    // =========================================================================
    RoleCreated(RoleCreatedEvent),
    RoleUpdated(RoleUpdatedEvent),
    RoleDeleted(RoleDeletedEvent),
}

impl PlatformEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MemberJoined(_) => "MEMBER_JOINED",
            Self::MemberLeft(_) => "MEMBER_LEFT",
            Self::MemberUpdated(_) => "MEMBER_UPDATED",
            Self::MessageCreated(_) => "MESSAGE_CREATED",
            Self::MessageEdited(_) => "MESSAGE_EDITED",
            Self::MessageDeleted(_) => "MESSAGE_DELETED",
            Self::VoiceStateUpdated(_) => "VOICE_STATE_UPDATED",
            Self::RoleCreated(_) => "ROLE_CREATED",
            Self::RoleUpdated(_) => "ROLE_UPDATED",
            Self::RoleDeleted(_) => "ROLE_DELETED",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MemberJoined(e) => e.timestamp,
            Self::MemberLeft(e) => e.timestamp,
            Self::MemberUpdated(e) => e.timestamp,
            Self::MessageCreated(e) => e.timestamp,
            Self::MessageEdited(e) => e.timestamp,
            Self::MessageDeleted(e) => e.timestamp,
            Self::VoiceStateUpdated(e) => e.timestamp,
            Self::RoleCreated(e) => e.timestamp,
            Self::RoleUpdated(e) => e.timestamp,
            Self::RoleDeleted(e) => e.timestamp,
        }
    }

    /// Structural changes invalidate the snapshot
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::RoleCreated(_) | Self::RoleUpdated(_) | Self::RoleDeleted(_)
        )
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberJoinedEvent {
    pub member: MemberSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberLeftEvent {
    pub user_id: Snowflake,
    #[serde(default)]
    pub bot: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpdatedEvent {
    pub before: MemberSnapshot,
    pub after: MemberSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreatedEvent {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub author_id: Snowflake,
    #[serde(default)]
    pub author_bot: bool,
    /// Direct messages carry no guild
    #[serde(default)]
    pub in_guild: bool,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEditedEvent {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeletedEvent {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub timestamp: DateTime<Utc>,
}

/// Voice connection of a member at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub channel_id: Snowflake,
    /// The channel is the guild's AFK channel
    #[serde(default)]
    pub afk: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateUpdatedEvent {
    pub user_id: Snowflake,
    #[serde(default)]
    pub bot: bool,
    pub before: Option<VoiceState>,
    pub after: Option<VoiceState>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreatedEvent {
    pub role: RoleSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdatedEvent {
    pub before: RoleSnapshot,
    pub after: RoleSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDeletedEvent {
    pub role: RoleSnapshot,
    pub timestamp: DateTime<Utc>,
}
