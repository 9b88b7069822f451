//! Data Transfer Objects
//!
//! Reports returned by service operations and shown to operators.

mod responses;

pub use responses::*;
