//! Integration test utilities for the rank bot
//!
//! In-memory repositories and a scripted platform client, so the service and
//! bot layers can be driven end to end without PostgreSQL.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
