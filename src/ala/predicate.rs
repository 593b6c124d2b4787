use serde::{Deserialize, Serialize};

use crate::{
  ala::{BranchRelation, Effect, Source},
  regalloc::Analysis,
};

/// A predicate node together with the analysis at its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  pub kind: PredicateKind,
  #[serde(default, skip_serializing_if = "Analysis::is_empty")]
  pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
  Constant(bool),
  /// Holds iff `lhs relation rhs`.
  Relation {
    lhs: Source,
    relation: BranchRelation,
    rhs: Source,
  },
  /// Evaluates to `affirmative` if `condition` holds, to `negative` otherwise.
  If {
    condition: Box<Predicate>,
    affirmative: Box<Predicate>,
    negative: Box<Predicate>,
  },
  /// Performs `effects`, then evaluates to `then`.
  Do {
    effects: Vec<Effect>,
    then: Box<Predicate>,
  },
}

impl Predicate {
  pub fn new(kind: PredicateKind) -> Self {
    Predicate {
      kind,
      analysis: Analysis::default(),
    }
  }

  pub fn constant(holds: bool) -> Self {
    Predicate::new(PredicateKind::Constant(holds))
  }

  pub fn relation(lhs: impl Into<Source>, relation: BranchRelation, rhs: impl Into<Source>) -> Self {
    Predicate::new(PredicateKind::Relation {
      lhs: lhs.into(),
      relation,
      rhs: rhs.into(),
    })
  }

  pub fn conditional(condition: Predicate, affirmative: Predicate, negative: Predicate) -> Self {
    Predicate::new(PredicateKind::If {
      condition: Box::new(condition),
      affirmative: Box::new(affirmative),
      negative: Box::new(negative),
    })
  }

  pub fn after(effects: Vec<Effect>, then: Predicate) -> Self {
    Predicate::new(PredicateKind::Do {
      effects,
      then: Box::new(then),
    })
  }
}
