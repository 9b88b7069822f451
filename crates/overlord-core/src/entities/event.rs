//! Event log entries

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::StatDelta;
use crate::value_objects::Snowflake;

/// Kind of a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MemberJoin,
    MemberLeave,
    MessageNew,
    MessageEdit,
    MessageDelete,
    VcJoin,
    VcLeave,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::MemberJoin,
        EventKind::MemberLeave,
        EventKind::MessageNew,
        EventKind::MessageEdit,
        EventKind::MessageDelete,
        EventKind::VcJoin,
        EventKind::VcLeave,
    ];

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemberJoin => "member_join",
            Self::MemberLeave => "member_leave",
            Self::MessageNew => "message_new",
            Self::MessageEdit => "message_edit",
            Self::MessageDelete => "message_delete",
            Self::VcJoin => "vc_join",
            Self::VcLeave => "vc_leave",
        }
    }

    #[inline]
    pub fn is_member(&self) -> bool {
        matches!(self, Self::MemberJoin | Self::MemberLeave)
    }

    #[inline]
    pub fn is_voice(&self) -> bool {
        matches!(self, Self::VcJoin | Self::VcLeave)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind: {s}"))
    }
}

/// A row of the append-only event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub kind: EventKind,
    pub user_id: Snowflake,
    pub message_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    /// Set on a voice join once a leave has been matched against it
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// A voice join that no leave has been matched against yet
    #[inline]
    pub fn is_open_vc_join(&self) -> bool {
        self.kind == EventKind::VcJoin && !self.consumed
    }
}

/// Event about to be appended to the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub user_id: Snowflake,
    pub message_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn member(kind: EventKind, user_id: Snowflake, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            user_id,
            message_id: None,
            channel_id: None,
            created_at: at,
        }
    }

    pub fn message(
        kind: EventKind,
        user_id: Snowflake,
        message_id: Snowflake,
        channel_id: Snowflake,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            user_id,
            message_id: Some(message_id),
            channel_id: Some(channel_id),
            created_at: at,
        }
    }

    pub fn voice(kind: EventKind, user_id: Snowflake, channel_id: Snowflake, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            user_id,
            message_id: None,
            channel_id: Some(channel_id),
            created_at: at,
        }
    }
}

/// An event append plus the stat changes it causes, committed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event: NewEvent,
    /// Voice join matched by this event, marked consumed in the same transaction
    pub consumes: Option<i64>,
    pub deltas: Vec<StatDelta>,
}

impl EventRecord {
    pub fn new(event: NewEvent) -> Self {
        Self {
            event,
            consumes: None,
            deltas: Vec::new(),
        }
    }

    pub fn with_delta(mut self, delta: StatDelta) -> Self {
        self.deltas.push(delta);
        self
    }

    pub fn consuming(mut self, join_id: i64) -> Self {
        self.consumes = Some(join_id);
        self
    }
}
