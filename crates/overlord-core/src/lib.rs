//! # overlord-core
//!
//! Domain layer containing entities, value objects, ports, platform events and
//! the rank resolver. This crate has zero dependencies on infrastructure
//! (database, platform client, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod ranking;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Event, EventKind, EventRecord, MemberSnapshot, NewEvent, Rank, RankTable, Role, RoleFilter,
    RoleSnapshot, StatDelta, StatKind, User, UserStats,
};
pub use error::DomainError;
pub use events::PlatformEvent;
pub use ranking::RankPlan;
pub use traits::{
    EventRepository, Notice, NoticeLevel, Platform, PlatformResult, RepoResult, RoleRepository,
    StatRepository, SyncSummary, UserRepository,
};
pub use value_objects::{RoleMask, Snowflake, SnowflakeParseError};
