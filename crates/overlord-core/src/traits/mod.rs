//! Ports implemented by the infrastructure layers

mod platform;
mod repositories;

pub use platform::{Notice, NoticeLevel, Platform, PlatformResult};
pub use repositories::{
    EventRepository, RepoResult, RoleRepository, StatRepository, SyncSummary, UserRepository,
};
