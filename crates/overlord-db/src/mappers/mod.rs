//! Entity to model mappers
//!
//! This module provides conversions between domain entities (overlord-core) and database models.
//! - `From<Model> for Entity` / `TryFrom<Model>`: Convert database rows to domain objects
//! - `*Insert` structs: Prepare entity data for database operations

mod event;
mod role;
mod user;

pub use event::EventInsert;
pub use role::RoleInsert;
pub use user::UserInsert;
