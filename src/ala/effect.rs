use serde::{Deserialize, Serialize};

use crate::{
  ala::{BinaryOperator, DataType, Label, Location, Predicate, Source},
  regalloc::Analysis,
  registers::Register,
};

/// An effect node together with the analysis at its entry.
///
/// Freshly built effects carry an empty analysis; it is filled in by the liveness
/// pass, which rebuilds the tree bottom-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
  pub kind: EffectKind,
  #[serde(default, skip_serializing_if = "Analysis::is_empty")]
  pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
  /// Performs the effects in order.
  Do(Vec<Effect>),
  /// Copies the datum from `source` into `destination`.
  ///
  /// `data_type` is filled in once the copy's type is fixed, which is no later
  /// than resolution.
  Set {
    destination: Location,
    source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_type: Option<DataType>,
  },
  Compute {
    destination: Location,
    lhs: Source,
    operation: BinaryOperator,
    rhs: Source,
  },
  /// Creates an uninitialised buffer of `bytes` bytes and puts a capability for it
  /// in `capability`. A scoped buffer dies with the current scope.
  CreateBuffer {
    bytes: i64,
    capability: Location,
    scoped: bool,
  },
  DestroyBuffer {
    capability: Source,
  },
  /// Reads the element at `offset` in `buffer` into `destination`.
  GetElement {
    data_type: DataType,
    buffer: Location,
    offset: Source,
    destination: Location,
  },
  /// Writes `element` at `offset` in `buffer`.
  SetElement {
    data_type: DataType,
    buffer: Location,
    offset: Source,
    element: Source,
  },
  /// Creates a sealing capability and puts it in `destination`.
  CreateSeal {
    destination: Location,
  },
  If {
    condition: Box<Predicate>,
    affirmative: Box<Effect>,
    negative: Box<Effect>,
  },
  /// Pushes a scope, which defines every callee-saved register.
  PushScope,
  /// Pops a scope, which uses every callee-saved register.
  PopScope,
  /// Clears every non-structural register except `spared`.
  ClearAll {
    spared: Vec<Register>,
  },
  /// Calls `callee`. The parameter registers only matter for liveness.
  Call {
    callee: Label,
    parameters: Vec<Register>,
  },
  /// Unseals `target` and `data` and jumps to the former.
  Invoke {
    target: Source,
    data: Source,
  },
  Return,
}

impl Effect {
  pub fn new(kind: EffectKind) -> Self {
    Effect {
      kind,
      analysis: Analysis::default(),
    }
  }

  /// The empty effect.
  pub fn nothing() -> Self {
    Effect::new(EffectKind::Do(vec![]))
  }

  pub fn sequence(effects: Vec<Effect>) -> Self {
    Effect::new(EffectKind::Do(effects))
  }

  pub fn set(destination: Location, source: impl Into<Source>) -> Self {
    Effect::new(EffectKind::Set {
      destination,
      source: source.into(),
      data_type: None,
    })
  }

  pub fn compute(
    destination: Location,
    lhs: impl Into<Source>,
    operation: BinaryOperator,
    rhs: impl Into<Source>,
  ) -> Self {
    Effect::new(EffectKind::Compute {
      destination,
      lhs: lhs.into(),
      operation,
      rhs: rhs.into(),
    })
  }

  pub fn conditional(condition: Predicate, affirmative: Effect, negative: Effect) -> Self {
    Effect::new(EffectKind::If {
      condition: Box::new(condition),
      affirmative: Box::new(affirmative),
      negative: Box::new(negative),
    })
  }

  pub fn call(callee: &str, parameters: Vec<Register>) -> Self {
    Effect::new(EffectKind::Call {
      callee: Label::new(callee),
      parameters,
    })
  }

  pub fn ret() -> Self {
    Effect::new(EffectKind::Return)
  }

  /// Whether the effect is a `do` without subeffects.
  pub fn does_nothing(&self) -> bool {
    matches!(&self.kind, EffectKind::Do(effects) if effects.is_empty())
  }
}

impl From<EffectKind> for Effect {
  fn from(kind: EffectKind) -> Self {
    Effect::new(kind)
  }
}
