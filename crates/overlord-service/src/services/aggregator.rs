//! Event aggregator
//!
//! Turns platform events into event-log rows and stat deltas, then triggers
//! rank reconciliation for the affected user. Each public entry point takes
//! the gate once; everything below it runs on the `*_locked` forms.

use std::fmt;

use chrono::{DateTime, Utc};
use overlord_core::entities::{EventKind, EventRecord, NewEvent, StatDelta, StatKind, User};
use overlord_core::events::{
    MemberJoinedEvent, MemberLeftEvent, MemberUpdatedEvent, MessageCreatedEvent,
    MessageDeletedEvent, MessageEditedEvent, PlatformEvent, VoiceState, VoiceStateUpdatedEvent,
};
use overlord_core::Snowflake;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::gate::GateGuard;
use super::ranking::RankingService;
use super::state::SyncState;
use super::sync::SyncService;

/// Why an event left no trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tracking for this event kind is switched off
    Disabled,
    /// Authored by or about a bot account
    Bot,
    /// Outside the guild, or in the control/error channel
    Filtered,
    /// Nothing the store tracks changed
    NoChange,
    /// Subject user is not in the user table
    UnknownUser,
    /// Edit or delete of a message that was never logged
    UnknownMessage,
    /// Voice leave without an open join for that channel
    UnmatchedVoiceLeave,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "tracking disabled",
            Self::Bot => "bot account",
            Self::Filtered => "filtered",
            Self::NoChange => "no change",
            Self::UnknownUser => "unknown user",
            Self::UnknownMessage => "unknown message",
            Self::UnmatchedVoiceLeave => "unmatched voice leave",
        };
        f.write_str(s)
    }
}

/// Result of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Applied if either side was
    fn or(self, other: Outcome) -> Outcome {
        if self.is_applied() {
            self
        } else {
            other
        }
    }
}

/// Event aggregator
pub struct EventAggregator<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> EventAggregator<'a> {
    /// Create a new EventAggregator
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Handle one platform event as a single critical section
    pub async fn handle(&self, event: &PlatformEvent) -> ServiceResult<Outcome> {
        let gate = self.ctx.gate().acquire().await;
        self.handle_locked(&gate, event).await
    }

    #[instrument(skip_all, fields(event = event.event_type()))]
    pub async fn handle_locked(
        &self,
        gate: &GateGuard<'_>,
        event: &PlatformEvent,
    ) -> ServiceResult<Outcome> {
        match event {
            PlatformEvent::MemberJoined(e) => self.member_joined_locked(gate, e).await,
            PlatformEvent::MemberLeft(e) => self.member_left_locked(gate, e).await,
            PlatformEvent::MemberUpdated(e) => self.member_updated_locked(gate, e).await,
            PlatformEvent::MessageCreated(e) => self.message_created_locked(gate, e).await,
            PlatformEvent::MessageEdited(e) => self.message_edited_locked(gate, e).await,
            PlatformEvent::MessageDeleted(e) => self.message_deleted_locked(gate, e).await,
            PlatformEvent::VoiceStateUpdated(e) => self.voice_state_locked(gate, e).await,
            PlatformEvent::RoleCreated(_) => {
                self.invalidate(gate, "New role detected").await
            }
            PlatformEvent::RoleDeleted(_) => {
                self.invalidate(gate, "Role remove detected").await
            }
            PlatformEvent::RoleUpdated(_) => {
                self.invalidate(gate, "Role change detected").await
            }
        }
    }

    async fn invalidate(&self, gate: &GateGuard<'_>, reason: &str) -> ServiceResult<Outcome> {
        SyncService::new(self.ctx).invalidate_locked(gate, reason).await;
        Ok(Outcome::Applied)
    }

    async fn find_user(&self, user_id: Snowflake, event: &str) -> ServiceResult<Option<User>> {
        let user = self.ctx.user_repo().find_by_id(user_id).await?;
        if user.is_none() {
            warn!(%user_id, event, "User does not exist, skipping event");
        }
        Ok(user)
    }

    async fn update_rank(&self, gate: &GateGuard<'_>, user_id: Snowflake) -> ServiceResult<()> {
        RankingService::new(self.ctx)
            .update_rank_locked(gate, user_id)
            .await?;
        Ok(())
    }

    // === Members ===

    /// Upsert the member as present, log the join, restart membership at 0
    pub async fn member_joined_locked(
        &self,
        _gate: &GateGuard<'_>,
        event: &MemberJoinedEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.member_join {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        let member = &event.member;
        if member.bot {
            self.ctx.snapshot().mark_bot(member.id);
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        self.ctx
            .require_state("track member join", SyncState::FullySynced)
            .await?;

        let mask = self.ctx.snapshot().mask_for(&member.role_ids);
        self.ctx
            .user_repo()
            .upsert(&User::from_member(member, mask))
            .await?;

        let record = EventRecord::new(NewEvent::member(
            EventKind::MemberJoin,
            member.id,
            member.joined_at,
        ))
        .with_delta(StatDelta::Set(StatKind::Membership, 0));
        self.ctx.event_repo().record(&record).await?;

        debug!(user_id = %member.id, tag = %member.tag(), "User join");
        Ok(Outcome::Applied)
    }

    /// Clear the user (or delete them) depending on `user.leave.keep`
    pub async fn member_left_locked(
        &self,
        _gate: &GateGuard<'_>,
        event: &MemberLeftEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.member_leave {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        if event.bot {
            self.ctx.snapshot().mark_bot(event.user_id);
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        if self.find_user(event.user_id, "member leave").await?.is_none() {
            return Ok(Outcome::Skipped(SkipReason::UnknownUser));
        }

        if self.ctx.config().user.leave.keep {
            self.ctx.user_repo().mark_absent(event.user_id).await?;
            self.ctx
                .event_repo()
                .append(&NewEvent::member(
                    EventKind::MemberLeave,
                    event.user_id,
                    event.timestamp,
                ))
                .await?;
            debug!(user_id = %event.user_id, "User leave");
        } else {
            self.ctx.user_repo().delete(event.user_id).await?;
            debug!(user_id = %event.user_id, "User leave (deleted)");
        }
        Ok(Outcome::Applied)
    }

    /// Track role, nickname and name changes on the stored user
    pub async fn member_updated_locked(
        &self,
        _gate: &GateGuard<'_>,
        event: &MemberUpdatedEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.member_update {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        let after = &event.after;
        if after.bot {
            self.ctx.snapshot().mark_bot(after.id);
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        if !event.before.differs_from(after) {
            return Ok(Outcome::Skipped(SkipReason::NoChange));
        }
        self.ctx
            .require_state("track member update", SyncState::FullySynced)
            .await?;

        let Some(mut user) = self.find_user(after.id, "member update").await? else {
            return Ok(Outcome::Skipped(SkipReason::UnknownUser));
        };
        user.name.clone_from(&after.name);
        user.discriminator.clone_from(&after.discriminator);
        user.display_name = Some(after.display_name.clone());
        user.set_roles(self.ctx.snapshot().mask_for(&after.role_ids));
        self.ctx.user_repo().upsert(&user).await?;

        debug!(user_id = %after.id, "User update");
        Ok(Outcome::Applied)
    }

    // === Messages ===

    pub async fn message_created_locked(
        &self,
        gate: &GateGuard<'_>,
        event: &MessageCreatedEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.message_new {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        if event.author_bot {
            self.ctx.snapshot().mark_bot(event.author_id);
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        if !event.in_guild || self.ctx.guild().is_special_channel(event.channel_id) {
            return Ok(Outcome::Skipped(SkipReason::Filtered));
        }
        self.ctx
            .require_state("track new message", SyncState::FullySynced)
            .await?;

        if self.find_user(event.author_id, "new message").await?.is_none() {
            return Ok(Outcome::Skipped(SkipReason::UnknownUser));
        }

        let record = EventRecord::new(NewEvent::message(
            EventKind::MessageNew,
            event.author_id,
            event.message_id,
            event.channel_id,
            event.timestamp,
        ))
        .with_delta(StatDelta::Add(StatKind::NewMessageCount, 1));
        self.ctx.event_repo().record(&record).await?;
        debug!(user_id = %event.author_id, message_id = %event.message_id, "New message");

        self.update_rank(gate, event.author_id).await?;
        Ok(Outcome::Applied)
    }

    pub async fn message_edited_locked(
        &self,
        gate: &GateGuard<'_>,
        event: &MessageEditedEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.message_edit {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        self.message_changed_locked(
            gate,
            EventKind::MessageEdit,
            StatKind::EditMessageCount,
            event.message_id,
            event.channel_id,
            event.timestamp,
        )
        .await
    }

    pub async fn message_deleted_locked(
        &self,
        gate: &GateGuard<'_>,
        event: &MessageDeletedEvent,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.message_delete {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        self.message_changed_locked(
            gate,
            EventKind::MessageDelete,
            StatKind::DeleteMessageCount,
            event.message_id,
            event.channel_id,
            event.timestamp,
        )
        .await
    }

    /// Edits and deletes carry no author: attribute them through the logged
    /// message-new event for the same message id.
    async fn message_changed_locked(
        &self,
        gate: &GateGuard<'_>,
        kind: EventKind,
        counter: StatKind,
        message_id: Snowflake,
        channel_id: Snowflake,
        at: DateTime<Utc>,
    ) -> ServiceResult<Outcome> {
        if self.ctx.guild().is_special_channel(channel_id) {
            return Ok(Outcome::Skipped(SkipReason::Filtered));
        }
        self.ctx
            .require_state("track message change", SyncState::FullySynced)
            .await?;

        let Some(original) = self.ctx.event_repo().find_message(message_id).await? else {
            debug!(%message_id, "Message was never logged, ignoring");
            return Ok(Outcome::Skipped(SkipReason::UnknownMessage));
        };
        let author = original.user_id;
        if self.ctx.snapshot().is_bot(author) {
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        match self.find_user(author, kind.as_str()).await? {
            None => return Ok(Outcome::Skipped(SkipReason::UnknownUser)),
            Some(user) if user.is_absent() => {
                debug!(user_id = %author, "Author has left, ignoring message change");
                return Ok(Outcome::Skipped(SkipReason::UnknownUser));
            }
            Some(_) => {}
        }

        let record = EventRecord::new(NewEvent::message(kind, author, message_id, channel_id, at))
            .with_delta(StatDelta::Add(counter, 1));
        self.ctx.event_repo().record(&record).await?;
        debug!(user_id = %author, %message_id, kind = %kind, "Message change");

        self.update_rank(gate, author).await?;
        Ok(Outcome::Applied)
    }

    // === Voice ===

    /// Split a voice transition into a leave of the old channel and a join
    /// of the new one. AFK channels count as no channel when configured.
    pub async fn voice_state_locked(
        &self,
        gate: &GateGuard<'_>,
        event: &VoiceStateUpdatedEvent,
    ) -> ServiceResult<Outcome> {
        if event.bot {
            self.ctx.snapshot().mark_bot(event.user_id);
            return Ok(Outcome::Skipped(SkipReason::Bot));
        }
        let before = event.before.as_ref().map(|s| s.channel_id);
        let after = event.after.as_ref().map(|s| s.channel_id);
        if before == after {
            return Ok(Outcome::Skipped(SkipReason::NoChange));
        }

        let mut outcome = Outcome::Skipped(SkipReason::Filtered);
        if let Some(state) = event.before.as_ref().filter(|s| self.is_tracked(s)) {
            let left = self
                .vc_left_locked(gate, event.user_id, state.channel_id, event.timestamp)
                .await?;
            outcome = outcome.or(left);
        }
        if let Some(state) = event.after.as_ref().filter(|s| self.is_tracked(s)) {
            let joined = self
                .vc_joined_locked(gate, event.user_id, state.channel_id, event.timestamp)
                .await?;
            outcome = outcome.or(joined);
        }
        Ok(outcome)
    }

    fn is_tracked(&self, state: &VoiceState) -> bool {
        !state.afk || !self.ctx.config().event.voice_afk_ignore
    }

    /// Open a voice session. A still-open join for the same channel means the
    /// leave was missed: that stale join is dropped instead of being matched.
    #[instrument(skip(self, _gate))]
    pub async fn vc_joined_locked(
        &self,
        _gate: &GateGuard<'_>,
        user_id: Snowflake,
        channel_id: Snowflake,
        at: DateTime<Utc>,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.voice_join {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        self.ctx
            .require_state("track voice join", SyncState::FullySynced)
            .await?;
        if self.find_user(user_id, "voice join").await?.is_none() {
            return Ok(Outcome::Skipped(SkipReason::UnknownUser));
        }

        let events = self.ctx.event_repo();
        if let Some(stale) = events.last_voice_event(user_id, channel_id).await? {
            if stale.is_open_vc_join() {
                warn!(%user_id, %channel_id, "Voice leave event is absent, removing last voice join");
                events.delete(stale.id).await?;
            }
        }

        events
            .append(&NewEvent::voice(EventKind::VcJoin, user_id, channel_id, at))
            .await?;
        debug!(%user_id, %channel_id, "Voice join");
        Ok(Outcome::Applied)
    }

    /// Close the open voice session and add its duration to `vc_time`
    #[instrument(skip(self, gate))]
    pub async fn vc_left_locked(
        &self,
        gate: &GateGuard<'_>,
        user_id: Snowflake,
        channel_id: Snowflake,
        at: DateTime<Utc>,
    ) -> ServiceResult<Outcome> {
        if !self.ctx.config().event.voice_leave {
            return Ok(Outcome::Skipped(SkipReason::Disabled));
        }
        self.ctx
            .require_state("track voice leave", SyncState::FullySynced)
            .await?;
        if self.find_user(user_id, "voice leave").await?.is_none() {
            return Ok(Outcome::Skipped(SkipReason::UnknownUser));
        }

        let join = match self.ctx.event_repo().last_voice_event(user_id, channel_id).await? {
            Some(join) if join.is_open_vc_join() => join,
            _ => {
                warn!(%user_id, %channel_id, "Voice join event is absent, skipping voice leave");
                return Ok(Outcome::Skipped(SkipReason::UnmatchedVoiceLeave));
            }
        };

        let seconds = (at - join.created_at).num_seconds().max(0);
        let record = EventRecord::new(NewEvent::voice(EventKind::VcLeave, user_id, channel_id, at))
            .consuming(join.id)
            .with_delta(StatDelta::Add(StatKind::VcTime, seconds));
        self.ctx.event_repo().record(&record).await?;
        debug!(%user_id, %channel_id, seconds, "Voice leave");

        self.update_rank(gate, user_id).await?;
        Ok(Outcome::Applied)
    }
}
