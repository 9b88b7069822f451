//! Value objects - immutable types that represent domain concepts

mod role_mask;
mod snowflake;

pub use role_mask::RoleMask;
pub use snowflake::{Snowflake, SnowflakeParseError};
