//! Concurrency gate
//!
//! One FIFO mutex shared by every event handler, admin command and scheduled
//! job. It is not reentrant: code already holding it calls the `*_locked`
//! variants of service operations and passes its [`GateGuard`] along as proof.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Global serialization primitive
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<Mutex<()>>,
}

/// Held for the whole critical section; released on drop
#[derive(Debug)]
pub struct GateGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate. Waiters are served in arrival order.
    pub async fn acquire(&self) -> GateGuard<'_> {
        GateGuard {
            _guard: self.inner.lock().await,
        }
    }

    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| GateGuard { _guard: guard })
    }

    /// Some operation currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
