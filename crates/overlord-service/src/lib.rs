//! # overlord-service
//!
//! Application layer: the synchronization state machine, the event
//! aggregator, rank reconciliation and the concurrency gate they share.

pub mod dto;
pub mod services;

pub use services::{
    EventAggregator, Gate, GateGuard, Outcome, RankOutcome, RankingService, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SkipReason, StatService, SyncService,
    SyncState,
};
