//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in overlord-core.
//! Each repository handles database operations for a specific domain entity.

mod error;
mod event;
mod role;
mod stat;
mod user;

pub use event::PgEventRepository;
pub use role::PgRoleRepository;
pub use stat::PgStatRepository;
pub use user::PgUserRepository;
