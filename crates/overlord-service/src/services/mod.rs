//! Application services
//!
//! Synchronization, event aggregation, rank reconciliation and stat rebuilds,
//! all coordinated through one shared [`Gate`].

pub mod aggregator;
pub mod context;
pub mod error;
pub mod gate;
pub mod ranking;
pub mod snapshot;
pub mod state;
pub mod stats;
pub mod sync;

// Re-export all services for convenience
pub use aggregator::{EventAggregator, Outcome, SkipReason};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use gate::{Gate, GateGuard};
pub use ranking::{RankOutcome, RankingService};
pub use snapshot::Snapshot;
pub use state::{SyncState, SyncStateMachine};
pub use stats::StatService;
pub use sync::SyncService;
