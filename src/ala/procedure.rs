use serde::{Deserialize, Serialize};

use crate::ala::{Declarations, Effect, Label};

/// A program element that can be invoked by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
  pub name: Label,
  /// The declared locations.
  #[serde(default)]
  pub locals: Declarations,
  /// The procedure's body.
  pub effect: Effect,
}

impl Procedure {
  pub fn new(name: &str, locals: Declarations, effect: Effect) -> Self {
    Procedure {
      name: Label::new(name),
      locals,
      effect,
    }
  }
}

/// A set of independently allocated procedures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
  pub procedures: Vec<Procedure>,
}
