use std::fmt;

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::{
  ala::{location::FrameLocation, AbstractLocation, DataType, Location},
  registers::Register,
};

/// A name of a procedure or a static memory location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
  pub fn new(name: impl Into<String>) -> Self {
    Label(name.into())
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// An operand of an effect or predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumAsInner, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
  Constant(i64),
  Abstract(AbstractLocation),
  /// A register read as a datum of the given type.
  Register(Register, DataType),
  Frame(FrameLocation),
  /// A capability to the memory location with the given label.
  Capability(Label),
}

impl Source {
  /// Shorthand for reading the abstract location with the given name.
  pub fn abs(name: impl Into<String>) -> Self {
    Source::Abstract(AbstractLocation::new(name))
  }

  /// The location the operand is read from, or `None` for constants and labels.
  pub fn location(&self) -> Option<Location> {
    match self {
      Source::Constant(_) | Source::Capability(_) => None,
      Source::Abstract(loc) => Some(Location::Abstract(loc.clone())),
      Source::Register(reg, _) => Some(Location::Register(*reg)),
      Source::Frame(cell) => Some(Location::Frame(*cell)),
    }
  }
}

impl From<i64> for Source {
  fn from(value: i64) -> Self {
    Source::Constant(value)
  }
}

impl From<i32> for Source {
  fn from(value: i32) -> Self {
    Source::Constant(value as i64)
  }
}

/// An arithmetic or logical operation of a compute effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
  Add,
  Sub,
  Mul,
  And,
  Or,
  Xor,
  Sll,
  Srl,
  Sra,
}

/// A relation between two operands of a relation predicate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchRelation {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}
