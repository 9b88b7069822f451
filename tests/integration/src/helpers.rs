//! Test helpers for integration tests
//!
//! Builds a service context over the in-memory fixtures and provides
//! constructors for the platform events the bot consumes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use overlord_common::{BotConfig, GuildConfig};
use overlord_core::entities::{MemberSnapshot, RoleSnapshot, StatKind};
use overlord_core::events::{
    MemberJoinedEvent, MemberLeftEvent, MessageCreatedEvent, MessageDeletedEvent,
    MessageEditedEvent, PlatformEvent, RoleCreatedEvent, RoleDeletedEvent, VoiceState,
    VoiceStateUpdatedEvent,
};
use overlord_core::Snowflake;
use overlord_service::{
    EventAggregator, Outcome, ServiceContext, ServiceContextBuilder, ServiceResult, SyncService,
};

use crate::fixtures::{unique_id, MemoryStore, MockPlatform};

pub const GUILD_ID: Snowflake = Snowflake::new(1);
pub const CONTROL_CHANNEL: Snowflake = Snowflake::new(10);
pub const ERROR_CHANNEL: Snowflake = Snowflake::new(11);
pub const TEXT_CHANNEL: Snowflake = Snowflake::new(20);
pub const VOICE_CHANNEL: Snowflake = Snowflake::new(30);
pub const OTHER_VOICE_CHANNEL: Snowflake = Snowflake::new(31);
pub const AFK_CHANNEL: Snowflake = Snowflake::new(39);

/// Ranks with `vc = 0`, so voice time never holds a member back
pub const BASIC_RANKS: &str = r#"
    [rank.role.Bronze]
    weight = 1
    membership = 0
    messages = 3
    vc = 0

    [rank.role.Silver]
    weight = 2
    membership = 0
    messages = 10
    vc = 0

    [control]
    roles = ["Admin"]
"#;

/// Ranks where messages and voice time both matter
pub const ACTIVITY_RANKS: &str = r#"
    [rank]
    ignored = ["Muted"]

    [rank.role.Bronze]
    weight = 1
    membership = 0
    messages = 3
    vc = 600

    [rank.role.Silver]
    weight = 2
    membership = 0
    messages = 10
    vc = 3600

    [control]
    roles = ["Admin"]
"#;

/// Roles every test guild starts with
pub const GUILD_ROLES: [&str; 5] = ["@everyone", "Bronze", "Silver", "Admin", "Muted"];

pub fn guild() -> GuildConfig {
    GuildConfig {
        guild_id: GUILD_ID,
        control_channel_id: Some(CONTROL_CHANNEL),
        error_channel_id: Some(ERROR_CHANNEL),
    }
}

/// A service context wired to in-memory storage and a scripted platform
pub struct TestBot {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub platform: Arc<MockPlatform>,
}

impl TestBot {
    /// Build the context without synchronizing; the state is `UNSYNCED`
    pub fn new(config: &str, platform: MockPlatform) -> Result<Self> {
        Self::build(config, platform, None)
    }

    /// Fully synced, writing rank edits to `path`
    pub async fn persisted(config: &str, platform: MockPlatform, path: &Path) -> Result<Self> {
        let bot = Self::build(config, platform, Some(path))?;
        SyncService::new(&bot.ctx).resync().await?;
        Ok(bot)
    }

    fn build(config: &str, platform: MockPlatform, path: Option<&Path>) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let platform = Arc::new(platform);
        let mut builder = ServiceContextBuilder::new()
            .user_repo(store.clone())
            .role_repo(store.clone())
            .event_repo(store.clone())
            .stat_repo(store.clone())
            .platform(platform.clone())
            .config(BotConfig::from_toml_str(config)?)
            .guild(guild());
        if let Some(path) = path {
            builder = builder.config_path(path);
        }
        let ctx = builder.build()?;
        Ok(Self {
            ctx,
            store,
            platform,
        })
    }

    /// Build the context and run a full resync
    pub async fn ready(config: &str, platform: MockPlatform) -> Result<Self> {
        let bot = Self::new(config, platform)?;
        SyncService::new(&bot.ctx).resync().await?;
        Ok(bot)
    }

    /// Standard guild roles and the given rank config, fully synced
    pub async fn with_ranks(config: &str) -> Result<Self> {
        Self::ready(config, MockPlatform::with_roles(&GUILD_ROLES)).await
    }

    pub fn role(&self, name: &str) -> Snowflake {
        self.platform
            .role_id(name)
            .unwrap_or_else(|| panic!("role {name} is not in the test guild"))
    }

    pub async fn handle(&self, event: PlatformEvent) -> ServiceResult<Outcome> {
        EventAggregator::new(&self.ctx).handle(&event).await
    }

    /// Put the member in the guild and deliver the join event
    pub async fn join(&self, member: MemberSnapshot) -> ServiceResult<Outcome> {
        self.platform.add_member(member.clone());
        self.handle(joined(member)).await
    }

    /// A fresh member joins with the given roles; returns their id
    pub async fn join_new(&self, roles: &[&str]) -> Result<Snowflake> {
        let roles = roles.iter().map(|name| self.role(name)).collect();
        let member = crate::fixtures::unique_member(roles);
        let id = member.id;
        self.join(member).await?;
        Ok(id)
    }

    /// Send `count` guild messages from `author`
    pub async fn chat(&self, author: Snowflake, count: usize) -> Result<()> {
        for _ in 0..count {
            self.handle(message(author, TEXT_CHANNEL)).await?;
        }
        Ok(())
    }

    pub fn stat(&self, user_id: Snowflake, kind: StatKind) -> i64 {
        self.store.stat(user_id, kind)
    }

    /// `(name, weight)` of every live rank, lowest weight first
    pub fn ranks(&self) -> Vec<(String, i64)> {
        self.ctx
            .rank_table()
            .ranks()
            .iter()
            .map(|r| (r.name.clone(), r.weight))
            .collect()
    }

    /// Names of the roles the platform currently has on the member
    pub fn held_roles(&self, user_id: Snowflake) -> Vec<String> {
        self.platform
            .member(user_id)
            .map(|m| self.ctx.snapshot().role_names(&m.role_ids))
            .unwrap_or_default()
    }
}

// ============================================================================
// Platform event constructors
// ============================================================================

pub fn joined(member: MemberSnapshot) -> PlatformEvent {
    PlatformEvent::MemberJoined(MemberJoinedEvent {
        timestamp: member.joined_at,
        member,
    })
}

pub fn left(user_id: Snowflake) -> PlatformEvent {
    PlatformEvent::MemberLeft(MemberLeftEvent {
        user_id,
        bot: false,
        timestamp: Utc::now(),
    })
}

/// A guild message with a fresh id
pub fn message(author_id: Snowflake, channel_id: Snowflake) -> PlatformEvent {
    message_with_id(unique_id(), author_id, channel_id)
}

pub fn message_with_id(
    message_id: Snowflake,
    author_id: Snowflake,
    channel_id: Snowflake,
) -> PlatformEvent {
    PlatformEvent::MessageCreated(MessageCreatedEvent {
        message_id,
        channel_id,
        author_id,
        author_bot: false,
        in_guild: true,
        content: "hello".to_string(),
        timestamp: Utc::now(),
    })
}

/// A message in the control channel
pub fn command(author_id: Snowflake, content: &str) -> PlatformEvent {
    PlatformEvent::MessageCreated(MessageCreatedEvent {
        message_id: unique_id(),
        channel_id: CONTROL_CHANNEL,
        author_id,
        author_bot: false,
        in_guild: true,
        content: content.to_string(),
        timestamp: Utc::now(),
    })
}

pub fn edited(message_id: Snowflake, channel_id: Snowflake) -> PlatformEvent {
    PlatformEvent::MessageEdited(MessageEditedEvent {
        message_id,
        channel_id,
        timestamp: Utc::now(),
    })
}

pub fn deleted(message_id: Snowflake, channel_id: Snowflake) -> PlatformEvent {
    PlatformEvent::MessageDeleted(MessageDeletedEvent {
        message_id,
        channel_id,
        timestamp: Utc::now(),
    })
}

/// Voice transition; `AFK_CHANNEL` is reported as the AFK channel
pub fn voice(
    user_id: Snowflake,
    before: Option<Snowflake>,
    after: Option<Snowflake>,
    at: DateTime<Utc>,
) -> PlatformEvent {
    let state = |channel_id: Snowflake| VoiceState {
        channel_id,
        afk: channel_id == AFK_CHANNEL,
    };
    PlatformEvent::VoiceStateUpdated(VoiceStateUpdatedEvent {
        user_id,
        bot: false,
        before: before.map(state),
        after: after.map(state),
        timestamp: at,
    })
}

pub fn role_created(name: &str) -> PlatformEvent {
    PlatformEvent::RoleCreated(RoleCreatedEvent {
        role: RoleSnapshot::new(unique_id(), name),
        timestamp: Utc::now(),
    })
}

pub fn role_deleted(role: RoleSnapshot) -> PlatformEvent {
    PlatformEvent::RoleDeleted(RoleDeletedEvent {
        role,
        timestamp: Utc::now(),
    })
}
