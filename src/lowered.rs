//! The lower language: the effect language after allocation.
//!
//!   Every location is physical, copies carry the type of the copied datum and
//!   scopes have become frame pushes and pops.

use serde::{Deserialize, Serialize};

use crate::{
  ala::{BinaryOperator, BranchRelation, DataType, FrameLocation, Label, PhysicalLocation},
  registers::Register,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
  Constant(i64),
  Register(Register),
  Frame(FrameLocation),
  Capability(Label),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
  Do(Vec<Effect>),
  Set {
    data_type: DataType,
    destination: PhysicalLocation,
    source: Source,
  },
  Compute {
    destination: PhysicalLocation,
    lhs: Source,
    operation: BinaryOperator,
    rhs: Source,
  },
  CreateBuffer {
    bytes: i64,
    capability: PhysicalLocation,
    on_frame: bool,
  },
  DestroyBuffer {
    capability: Source,
  },
  GetElement {
    data_type: DataType,
    buffer: PhysicalLocation,
    offset: Source,
    destination: PhysicalLocation,
  },
  SetElement {
    data_type: DataType,
    buffer: PhysicalLocation,
    offset: Source,
    element: Source,
  },
  CreateSeal {
    destination: PhysicalLocation,
  },
  If {
    condition: Box<Predicate>,
    affirmative: Box<Effect>,
    negative: Box<Effect>,
  },
  /// Pushes a call frame of `byte_size` bytes.
  PushFrame {
    byte_size: i64,
  },
  PopFrame,
  ClearAll {
    spared: Vec<Register>,
  },
  Call {
    callee: Label,
  },
  Invoke {
    target: Source,
    data: Source,
  },
  Return,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
  Constant(bool),
  Relation {
    lhs: Source,
    relation: BranchRelation,
    rhs: Source,
  },
  If {
    condition: Box<Predicate>,
    affirmative: Box<Predicate>,
    negative: Box<Predicate>,
  },
  Do {
    effects: Vec<Effect>,
    then: Box<Predicate>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
  pub name: Label,
  /// The size of the procedure's call frame, as pushed.
  pub frame_byte_size: i64,
  pub effect: Effect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
  pub procedures: Vec<Procedure>,
}
