//! Value objects - immutable types that represent domain concepts

mod capabilities;
mod role;
mod snowflake;

pub use capabilities::Capabilities;
pub use role::{Role, RoleParseError};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
