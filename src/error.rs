//! Errors raised by the allocator core.
//!
//! Every variant is fatal for the procedure being compiled: the allocator either
//! produces a complete assignment or stops with the offending location.

use crate::ala::{DataType, Location};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
  #[error("no known type for `{0}`")]
  UnknownLocation(Location),
  #[error("`{location}` is simultaneously typed {first} and {second}")]
  InconsistentTyping {
    location: Location,
    first: DataType,
    second: DataType,
  },
  #[error("`{0}` has not been assigned a physical location")]
  UnresolvedLocation(Location),
  #[error("invalid allocator configuration: {0}")]
  InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AllocationError>;
