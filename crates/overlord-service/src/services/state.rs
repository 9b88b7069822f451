//! Synchronization state machine
//!
//! `UNSYNCED -> ROLES_SYNCED -> FULLY_SYNCED`, with any structural role change
//! dropping back to `UNSYNCED`. Alongside the state it remembers whether an
//! operator notice was already posted for the current state, so skipped
//! operations surface one notice per transition instead of one per event.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

/// Trust level of the snapshot cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Unsynced,
    RolesSynced,
    FullySynced,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsynced => "UNSYNCED",
            Self::RolesSynced => "ROLES_SYNCED",
            Self::FullySynced => "FULLY_SYNCED",
        }
    }

    #[inline]
    pub fn is_fully_synced(&self) -> bool {
        matches!(self, Self::FullySynced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    state: SyncState,
    notified: bool,
}

/// Owner of the snapshot validity flag
#[derive(Debug)]
pub struct SyncStateMachine {
    inner: Mutex<Inner>,
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateMachine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SyncState::Unsynced,
                notified: false,
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    /// At least `minimum` has been reached
    pub fn satisfies(&self, minimum: SyncState) -> bool {
        self.state() >= minimum
    }

    /// Role index rebuilt. User masks depend on it, so a fully synced state
    /// also falls back here until users are reloaded.
    pub fn roles_synced(&self) {
        self.transition(SyncState::RolesSynced);
    }

    /// Returns `false` (and stays put) unless roles are synced
    pub fn users_synced(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state < SyncState::RolesSynced {
            return false;
        }
        if inner.state != SyncState::FullySynced {
            inner.state = SyncState::FullySynced;
            inner.notified = false;
        }
        true
    }

    /// Drop to `UNSYNCED`; `false` when already there
    pub fn invalidate(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == SyncState::Unsynced {
            return false;
        }
        inner.state = SyncState::Unsynced;
        inner.notified = false;
        true
    }

    /// First caller since the last transition gets `true`
    pub fn claim_notice(&self) -> bool {
        let mut inner = self.inner.lock();
        !std::mem::replace(&mut inner.notified, true)
    }

    fn transition(&self, next: SyncState) {
        let mut inner = self.inner.lock();
        if inner.state != next {
            inner.state = next;
            inner.notified = false;
        }
    }
}
