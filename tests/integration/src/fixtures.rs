//! Test fixtures
//!
//! An in-memory store implementing every repository port, and a scripted
//! platform client that records the role changes and notices it receives.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use overlord_core::entities::{
    Event, EventKind, EventRecord, MemberSnapshot, NewEvent, Role, RoleSnapshot, StatDelta,
    StatKind, User, UserStats,
};
use overlord_core::traits::{
    EventRepository, Notice, Platform, PlatformResult, RepoResult, RoleRepository,
    StatRepository, SyncSummary, UserRepository,
};
use overlord_core::{DomainError, Snowflake};
use parking_lot::Mutex;

/// Counter for unique test ids
static COUNTER: AtomicI64 = AtomicI64::new(1_000_000);

/// Get a unique snowflake for test data
pub fn unique_id() -> Snowflake {
    Snowflake::new(COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// A member with a unique id and tag
pub fn unique_member(roles: Vec<Snowflake>) -> MemberSnapshot {
    let id = unique_id();
    MemberSnapshot::new(id, format!("user{id}"), "0001").with_roles(roles)
}

// ============================================================================
// In-memory repositories
// ============================================================================

#[derive(Debug, Default)]
struct StoreData {
    users: BTreeMap<Snowflake, User>,
    roles: Vec<Role>,
    events: Vec<Event>,
    stats: HashMap<(Snowflake, StatKind), i64>,
    next_event_id: i64,
}

impl StoreData {
    fn insert_event(&mut self, event: &NewEvent) -> Event {
        self.next_event_id += 1;
        let row = Event {
            id: self.next_event_id,
            kind: event.kind,
            user_id: event.user_id,
            message_id: event.message_id,
            channel_id: event.channel_id,
            consumed: false,
            created_at: event.created_at,
        };
        self.events.push(row.clone());
        row
    }

    fn apply(&mut self, user_id: Snowflake, delta: StatDelta) {
        let slot = self.stats.entry((user_id, delta.kind())).or_insert(0);
        match delta {
            StatDelta::Add(_, amount) => *slot += amount,
            StatDelta::Set(_, value) => *slot = value,
        }
    }

    fn latest<F>(&self, filter: F) -> Option<Event>
    where
        F: Fn(&Event) -> bool,
    {
        self.events
            .iter()
            .filter(|e| filter(e))
            .max_by_key(|e| (e.created_at, e.id))
            .cloned()
    }
}

/// Every repository port over one shared map, so deleting a user drops its
/// events and stats the way the database cascade does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, id: Snowflake) -> Option<User> {
        self.data.lock().users.get(&id).cloned()
    }

    pub fn insert_user(&self, user: User) {
        self.data.lock().users.insert(user.id, user);
    }

    pub fn stat(&self, user_id: Snowflake, kind: StatKind) -> i64 {
        self.data
            .lock()
            .stats
            .get(&(user_id, kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_stat(&self, user_id: Snowflake, kind: StatKind, value: i64) {
        self.data.lock().stats.insert((user_id, kind), value);
    }

    /// Events of one user, oldest first
    pub fn events_for(&self, user_id: Snowflake) -> Vec<Event> {
        self.data
            .lock()
            .events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.data.lock().events.len()
    }

    pub fn role_names(&self) -> Vec<String> {
        self.data.lock().roles.iter().map(|r| r.name.clone()).collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_by_tag(&self, name: &str, discriminator: &str) -> RepoResult<Option<User>> {
        Ok(self
            .data
            .lock()
            .users
            .values()
            .find(|u| u.name == name && u.discriminator == discriminator)
            .cloned())
    }

    async fn list_present(&self) -> RepoResult<Vec<User>> {
        Ok(self
            .data
            .lock()
            .users
            .values()
            .filter(|u| !u.is_absent())
            .cloned()
            .collect())
    }

    async fn upsert(&self, user: &User) -> RepoResult<()> {
        self.insert_user(user.clone());
        Ok(())
    }

    async fn mark_absent(&self, id: Snowflake) -> RepoResult<()> {
        if let Some(user) = self.data.lock().users.get_mut(&id) {
            user.mark_absent();
        }
        Ok(())
    }

    async fn mark_all_absent(&self) -> RepoResult<u64> {
        let mut data = self.data.lock();
        for user in data.users.values_mut() {
            user.mark_absent();
        }
        Ok(data.users.len() as u64)
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let mut data = self.data.lock();
        data.users.remove(&id);
        data.events.retain(|e| e.user_id != id);
        data.stats.retain(|(user_id, _), _| *user_id != id);
        Ok(())
    }

    async fn purge_absent(&self) -> RepoResult<u64> {
        let absent: Vec<Snowflake> = self
            .data
            .lock()
            .users
            .values()
            .filter(|u| u.is_absent())
            .map(|u| u.id)
            .collect();
        for id in &absent {
            UserRepository::delete(self, *id).await?;
        }
        Ok(absent.len() as u64)
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        Ok(self
            .data
            .lock()
            .roles
            .iter()
            .filter(|r| r.name == name)
            .min_by_key(|r| r.idx)
            .cloned())
    }

    async fn list(&self) -> RepoResult<Vec<Role>> {
        let mut roles = self.data.lock().roles.clone();
        roles.sort_by_key(|r| r.idx);
        Ok(roles)
    }

    async fn sync_all(&self, roles: &[Role]) -> RepoResult<SyncSummary> {
        let mut data = self.data.lock();
        let mut summary = SyncSummary::default();
        for role in roles {
            if data.roles.iter().any(|r| r.id == role.id) {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }
        summary.removed = data
            .roles
            .iter()
            .filter(|old| roles.iter().all(|r| r.id != old.id))
            .count() as u64;
        data.roles = roles.to_vec();
        Ok(summary)
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn append(&self, event: &NewEvent) -> RepoResult<Event> {
        Ok(self.data.lock().insert_event(event))
    }

    async fn record(&self, record: &EventRecord) -> RepoResult<Event> {
        let mut data = self.data.lock();

        // Check before mutating so a failed record leaves nothing behind
        let consumed = match record.consumes {
            Some(join_id) => Some(
                data.events
                    .iter()
                    .position(|e| e.id == join_id)
                    .ok_or(DomainError::EventNotFound(join_id))?,
            ),
            None => None,
        };

        let event = data.insert_event(&record.event);
        if let Some(pos) = consumed {
            data.events[pos].consumed = true;
        }
        for delta in &record.deltas {
            data.apply(record.event.user_id, *delta);
        }
        Ok(event)
    }

    async fn last_member_event(&self, user_id: Snowflake) -> RepoResult<Option<Event>> {
        Ok(self
            .data
            .lock()
            .latest(|e| e.user_id == user_id && e.kind.is_member()))
    }

    async fn last_voice_event(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<Option<Event>> {
        Ok(self.data.lock().latest(|e| {
            e.user_id == user_id && e.kind.is_voice() && e.channel_id == Some(channel_id)
        }))
    }

    async fn find_message(&self, message_id: Snowflake) -> RepoResult<Option<Event>> {
        Ok(self
            .data
            .lock()
            .events
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::MessageNew && e.message_id == Some(message_id))
            .cloned())
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        self.data.lock().events.retain(|e| e.id != id);
        Ok(())
    }

    async fn set_created_at(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()> {
        let mut data = self.data.lock();
        let event = data
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(DomainError::EventNotFound(id))?;
        event.created_at = at;
        Ok(())
    }

    async fn latest_joins(&self) -> RepoResult<Vec<(Snowflake, DateTime<Utc>)>> {
        let data = self.data.lock();
        let mut joins: BTreeMap<Snowflake, DateTime<Utc>> = BTreeMap::new();
        for event in data.events.iter().filter(|e| e.kind == EventKind::MemberJoin) {
            let present = data
                .users
                .get(&event.user_id)
                .is_some_and(|u| u.roles.is_some());
            if !present {
                continue;
            }
            joins
                .entry(event.user_id)
                .and_modify(|at| *at = (*at).max(event.created_at))
                .or_insert(event.created_at);
        }
        Ok(joins.into_iter().collect())
    }
}

#[async_trait]
impl StatRepository for MemoryStore {
    async fn get(&self, user_id: Snowflake, kind: StatKind) -> RepoResult<i64> {
        Ok(self.stat(user_id, kind))
    }

    async fn load(&self, user_id: Snowflake) -> RepoResult<UserStats> {
        let data = self.data.lock();
        let mut stats = UserStats::default();
        for ((id, kind), value) in &data.stats {
            if *id == user_id {
                stats.set(*kind, *value);
            }
        }
        Ok(stats)
    }

    async fn set(&self, user_id: Snowflake, kind: StatKind, value: i64) -> RepoResult<()> {
        self.set_stat(user_id, kind, value);
        Ok(())
    }

    async fn set_many(&self, kind: StatKind, values: &[(Snowflake, i64)]) -> RepoResult<()> {
        let mut data = self.data.lock();
        for (user_id, value) in values {
            data.stats.insert((*user_id, kind), *value);
        }
        Ok(())
    }
}

// ============================================================================
// Scripted platform
// ============================================================================

/// A role change sent to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Add(Snowflake, Vec<Snowflake>),
    Remove(Snowflake, Vec<Snowflake>),
}

/// Guild state served to the bot, plus a log of what the bot asked for.
///
/// Role changes are applied to the stored members, so a later fetch sees them.
#[derive(Debug, Default)]
pub struct MockPlatform {
    roles: Mutex<Vec<RoleSnapshot>>,
    members: Mutex<BTreeMap<Snowflake, MemberSnapshot>>,
    calls: Mutex<Vec<RoleCall>>,
    notices: Mutex<Vec<Notice>>,
    unavailable: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create roles with ids `base`, `base + 1`, ... in the given order
    pub fn with_roles(names: &[&str]) -> Self {
        let platform = Self::new();
        let base = unique_id().into_inner() * 100;
        for (i, name) in names.iter().enumerate() {
            platform.add_role(RoleSnapshot::new(Snowflake::new(base + i as i64), *name));
        }
        platform
    }

    pub fn add_role(&self, role: RoleSnapshot) {
        self.roles.lock().push(role);
    }

    pub fn role_id(&self, name: &str) -> Option<Snowflake> {
        self.roles.lock().iter().find(|r| r.name == name).map(|r| r.id)
    }

    pub fn add_member(&self, member: MemberSnapshot) {
        self.members.lock().insert(member.id, member);
    }

    pub fn remove_member(&self, id: Snowflake) {
        self.members.lock().remove(&id);
    }

    pub fn member(&self, id: Snowflake) -> Option<MemberSnapshot> {
        self.members.lock().get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<RoleCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Make every fetch fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> PlatformResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::PlatformError("service unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_roles(&self) -> PlatformResult<Vec<RoleSnapshot>> {
        self.check()?;
        Ok(self.roles.lock().clone())
    }

    fn fetch_members(&self) -> BoxStream<'_, PlatformResult<MemberSnapshot>> {
        if let Err(e) = self.check() {
            return stream::once(async move { Err(e) }).boxed();
        }
        let members: Vec<_> = self.members.lock().values().cloned().collect();
        stream::iter(members.into_iter().map(Ok)).boxed()
    }

    async fn fetch_member(&self, user_id: Snowflake) -> PlatformResult<Option<MemberSnapshot>> {
        self.check()?;
        Ok(self.member(user_id))
    }

    async fn add_roles(&self, user_id: Snowflake, role_ids: &[Snowflake]) -> PlatformResult<()> {
        self.calls
            .lock()
            .push(RoleCall::Add(user_id, role_ids.to_vec()));
        if let Some(member) = self.members.lock().get_mut(&user_id) {
            member.apply_role_changes(&[], role_ids);
        }
        Ok(())
    }

    async fn remove_roles(&self, user_id: Snowflake, role_ids: &[Snowflake]) -> PlatformResult<()> {
        self.calls
            .lock()
            .push(RoleCall::Remove(user_id, role_ids.to_vec()));
        if let Some(member) = self.members.lock().get_mut(&user_id) {
            member.apply_role_changes(role_ids, &[]);
        }
        Ok(())
    }

    async fn notify(&self, notice: Notice) -> PlatformResult<()> {
        self.notices.lock().push(notice);
        Ok(())
    }
}
