use std::fmt;

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::registers::Register;

/// A storage location without a fixed home, to be assigned a register or a frame
/// slot by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbstractLocation(String);

impl AbstractLocation {
  pub fn new(name: impl Into<String>) -> Self {
    AbstractLocation(name.into())
  }

  pub fn name(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for AbstractLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A datum on the current call frame, `offset` bytes from the frame base.
///
/// Allocated cells live below the frame base, so their offsets are negative. A cell
/// at offset `o` of type `t` covers bytes `o..o + t.byte_size()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameLocation {
  pub offset: i64,
}

impl FrameLocation {
  pub const fn new(offset: i64) -> Self {
    FrameLocation { offset }
  }
}

impl fmt::Display for FrameLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "fp[{}]", self.offset)
  }
}

/// A location referenced by an effect or predicate.
///
/// Registers and frame locations are *physical*, abstract locations are *virtual*.
/// The derived ordering is the canonical location order.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumAsInner, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Location {
  Abstract(AbstractLocation),
  Register(Register),
  Frame(FrameLocation),
}

impl Location {
  /// Shorthand for an abstract location with the given name.
  pub fn abs(name: impl Into<String>) -> Self {
    Location::Abstract(AbstractLocation::new(name))
  }

  pub fn is_physical(&self) -> bool {
    !self.is_abstract()
  }
}

impl From<AbstractLocation> for Location {
  fn from(location: AbstractLocation) -> Self {
    Location::Abstract(location)
  }
}

impl From<Register> for Location {
  fn from(register: Register) -> Self {
    Location::Register(register)
  }
}

impl From<PhysicalLocation> for Location {
  fn from(location: PhysicalLocation) -> Self {
    match location {
      PhysicalLocation::Register(reg) => Location::Register(reg),
      PhysicalLocation::Frame(cell) => Location::Frame(cell),
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Location::Abstract(loc) => write!(f, "{}", loc),
      Location::Register(reg) => write!(f, "{}", reg),
      Location::Frame(cell) => write!(f, "{}", cell),
    }
  }
}

/// The home of an abstract location after allocation.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumAsInner, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalLocation {
  Register(Register),
  Frame(FrameLocation),
}

impl fmt::Display for PhysicalLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PhysicalLocation::Register(reg) => write!(f, "{}", reg),
      PhysicalLocation::Frame(cell) => write!(f, "{}", cell),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_physical_locations() {
    assert!(!Location::abs("x").is_physical());
    assert!(Location::Register(Register::A0).is_physical());
    assert!(Location::Frame(FrameLocation::new(-8)).is_physical());
  }

  #[test]
  fn test_canonical_order() {
    let mut locations = vec![
      Location::Frame(FrameLocation::new(-16)),
      Location::Register(Register::S1),
      Location::abs("b"),
      Location::abs("a"),
    ];
    locations.sort();
    assert_eq!(
      locations,
      vec![
        Location::abs("a"),
        Location::abs("b"),
        Location::Register(Register::S1),
        Location::Frame(FrameLocation::new(-16)),
      ]
    );
  }

  #[test]
  fn test_location_json_shape() {
    let loc: Location = serde_json::from_str(r#"{"abstract":"x"}"#).unwrap();
    assert_eq!(loc, Location::abs("x"));
    let loc: Location = serde_json::from_str(r#"{"frame":{"offset":-8}}"#).unwrap();
    assert_eq!(loc, Location::Frame(FrameLocation::new(-8)));
    assert_eq!(
      serde_json::to_string(&Location::Register(Register::A1)).unwrap(),
      r#"{"register":"a1"}"#
    );
  }
}
