//! Database models - SQLx-compatible structs for PostgreSQL tables

mod event;
mod role;
mod stat;
mod user;

pub use event::EventModel;
pub use role::RoleModel;
pub use stat::StatModel;
pub use user::UserModel;
