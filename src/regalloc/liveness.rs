// Effect tree -> backward fold -> every node annotated with its Analysis at entry
// Root Analysis -> whole-procedure ConflictGraph, used by assignment and coalescing

use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
  ala::{Effect, EffectKind, Location, Predicate, PredicateKind, Procedure, Source},
  config::AllocatorConfig,
  error::Result,
  regalloc::interference::ConflictGraph,
  registers::Register,
};

/// The liveness set and conflict graph at the entry of the node it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
  /// Grows while traversing the procedure backwards. A defined location conflicts
  /// with every other location possibly live after its definition.
  pub conflicts: ConflictGraph,
  /// The locations whose values are possibly used by a successor.
  pub possibly_live_locations: BTreeSet<Location>,
}

impl Analysis {
  pub fn is_empty(&self) -> bool {
    self.conflicts.is_empty() && self.possibly_live_locations.is_empty()
  }

  /// Turns the analysis at exit of a node into the analysis at its entry.
  pub fn update(&mut self, defined: &[Location], possibly_used: &[Location]) {
    let live_at_exit = self.possibly_live_locations.clone();
    for loc in defined {
      self.possibly_live_locations.remove(loc);
    }
    self
      .possibly_live_locations
      .extend(possibly_used.iter().cloned());
    for loc in defined {
      self.conflicts.insert_between(loc, &live_at_exit);
    }
  }

  /// Merges the analysis at entry of a sibling branch.
  pub fn form_union(&mut self, other: &Analysis) {
    self.conflicts.form_union(&other.conflicts);
    self
      .possibly_live_locations
      .extend(other.possibly_live_locations.iter().cloned());
  }

  pub fn safely_coalescable(&self, a: &Location, b: &Location, k: usize) -> bool {
    self.conflicts.safely_coalescable(a, b, k)
  }

  /// Abstract locations that may be read before any definition. Only meaningful
  /// on the analysis at entry of a procedure.
  pub fn undefined_uses(&self) -> impl Iterator<Item = &Location> {
    self
      .possibly_live_locations
      .iter()
      .filter(|loc| loc.is_abstract())
  }

  /// Treats the procedure's entry as the definition of every undefined use, so
  /// that such locations conflict with everything else live at entry.
  pub fn define_undefined_uses(&mut self) {
    let undefined = self.undefined_uses().cloned().collect::<Vec<_>>();
    for loc in &undefined {
      self
        .conflicts
        .insert_between(loc, &self.possibly_live_locations);
    }
  }
}

fn registers(regs: &[Register]) -> Vec<Location> {
  regs.iter().map(|reg| Location::Register(*reg)).collect()
}

fn source_locations<'a>(sources: impl IntoIterator<Item = &'a Source>) -> Vec<Location> {
  sources.into_iter().filter_map(Source::location).collect()
}

impl EffectKind {
  /// The locations written by the effect itself, excluding subeffects.
  pub fn defined_locations(&self, config: &AllocatorConfig) -> Vec<Location> {
    match self {
      EffectKind::Do(_)
      | EffectKind::DestroyBuffer { .. }
      | EffectKind::SetElement { .. }
      | EffectKind::If { .. }
      | EffectKind::PopScope
      | EffectKind::Invoke { .. }
      | EffectKind::Return => vec![],
      EffectKind::Set { destination, .. }
      | EffectKind::Compute { destination, .. }
      | EffectKind::GetElement { destination, .. }
      | EffectKind::CreateBuffer {
        capability: destination,
        ..
      }
      | EffectKind::CreateSeal { destination } => vec![destination.clone()],
      EffectKind::PushScope => registers(&config.callee_saved_registers),
      EffectKind::ClearAll { spared } => Register::ALL
        .iter()
        .filter(|reg| !reg.is_structural() && !spared.contains(reg))
        .map(|reg| Location::Register(*reg))
        .collect(),
      EffectKind::Call { .. } => registers(&config.caller_saved_registers),
    }
  }

  /// The locations read by the effect itself, excluding subeffects.
  pub fn possibly_used_locations(&self, config: &AllocatorConfig) -> Vec<Location> {
    match self {
      EffectKind::Do(_)
      | EffectKind::CreateBuffer { .. }
      | EffectKind::CreateSeal { .. }
      | EffectKind::If { .. }
      | EffectKind::PushScope
      | EffectKind::ClearAll { .. } => vec![],
      EffectKind::Set { source, .. } | EffectKind::DestroyBuffer { capability: source } => {
        source_locations(Some(source))
      }
      EffectKind::Compute { lhs, rhs, .. } => source_locations(vec![lhs, rhs]),
      EffectKind::GetElement { buffer, offset, .. } => {
        let mut used = vec![buffer.clone()];
        used.extend(offset.location());
        used
      }
      EffectKind::SetElement {
        buffer,
        offset,
        element,
        ..
      } => {
        let mut used = vec![buffer.clone()];
        used.extend(source_locations(vec![offset, element]));
        used
      }
      EffectKind::PopScope => registers(&config.callee_saved_registers),
      EffectKind::Call { parameters, .. } => registers(parameters),
      EffectKind::Invoke { target, data } => {
        let mut used = source_locations(vec![target, data]);
        used.push(Location::Register(Register::result()));
        used
      }
      EffectKind::Return => vec![Location::Register(Register::result())],
    }
  }
}

impl PredicateKind {
  /// The locations read by the predicate itself, excluding subnodes.
  pub fn possibly_used_locations(&self) -> Vec<Location> {
    match self {
      PredicateKind::Constant(_) | PredicateKind::If { .. } | PredicateKind::Do { .. } => vec![],
      PredicateKind::Relation { lhs, rhs, .. } => source_locations(vec![lhs, rhs]),
    }
  }
}

/// A local rewrite applied to every node of a tree before it is re-analysed.
///
/// The fold applies the transformation to a parent first, then recurses into the
/// children of the result. A transformation must not recurse by itself.
pub trait Transformation {
  fn effect(&self, effect: Effect) -> Result<Effect>;
  fn predicate(&self, predicate: Predicate) -> Result<Predicate>;
}

/// Leaves every node as it is, so folding with it only recomputes analyses.
pub struct Identity;

impl Transformation for Identity {
  fn effect(&self, effect: Effect) -> Result<Effect> {
    Ok(effect)
  }

  fn predicate(&self, predicate: Predicate) -> Result<Predicate> {
    Ok(predicate)
  }
}

/// Transforms `effect` and recomputes its analysis.
///
/// On entry `analysis` is the analysis at exit of `effect`, on return the
/// analysis at its entry, which is also attached to the returned node.
pub fn update_effect(
  effect: Effect,
  transform: &dyn Transformation,
  analysis: &mut Analysis,
  config: &AllocatorConfig,
) -> Result<Effect> {
  let kind = transform.effect(effect)?.kind;
  analysis.update(
    &kind.defined_locations(config),
    &kind.possibly_used_locations(config),
  );
  let kind = match kind {
    EffectKind::Do(effects) => {
      EffectKind::Do(update_effects(effects, transform, analysis, config)?)
    }
    EffectKind::If {
      condition,
      affirmative,
      negative,
    } => {
      let mut analysis_at_affirmative_entry = analysis.clone();
      let affirmative = update_effect(
        *affirmative,
        transform,
        &mut analysis_at_affirmative_entry,
        config,
      )?;
      let negative = update_effect(*negative, transform, analysis, config)?;
      analysis.form_union(&analysis_at_affirmative_entry);
      let condition = update_predicate(*condition, transform, analysis, config)?;
      EffectKind::If {
        condition: Box::new(condition),
        affirmative: Box::new(affirmative),
        negative: Box::new(negative),
      }
    }
    kind => kind,
  };
  Ok(Effect {
    kind,
    analysis: analysis.clone(),
  })
}

/// Folds a sequence back to front, keeping it in program order.
fn update_effects(
  effects: Vec<Effect>,
  transform: &dyn Transformation,
  analysis: &mut Analysis,
  config: &AllocatorConfig,
) -> Result<Vec<Effect>> {
  let mut updated = Vec::with_capacity(effects.len());
  for effect in effects.into_iter().rev() {
    updated.push(update_effect(effect, transform, analysis, config)?);
  }
  updated.reverse();
  Ok(updated)
}

/// Same as `update_effect`, for predicates.
pub fn update_predicate(
  predicate: Predicate,
  transform: &dyn Transformation,
  analysis: &mut Analysis,
  config: &AllocatorConfig,
) -> Result<Predicate> {
  let kind = transform.predicate(predicate)?.kind;
  analysis.update(&[], &kind.possibly_used_locations());
  let kind = match kind {
    PredicateKind::If {
      condition,
      affirmative,
      negative,
    } => {
      let mut analysis_at_affirmative_entry = analysis.clone();
      let affirmative = update_predicate(
        *affirmative,
        transform,
        &mut analysis_at_affirmative_entry,
        config,
      )?;
      let negative = update_predicate(*negative, transform, analysis, config)?;
      analysis.form_union(&analysis_at_affirmative_entry);
      let condition = update_predicate(*condition, transform, analysis, config)?;
      PredicateKind::If {
        condition: Box::new(condition),
        affirmative: Box::new(affirmative),
        negative: Box::new(negative),
      }
    }
    PredicateKind::Do { effects, then } => {
      let then = update_predicate(*then, transform, analysis, config)?;
      let effects = update_effects(effects, transform, analysis, config)?;
      PredicateKind::Do {
        effects,
        then: Box::new(then),
      }
    }
    kind => kind,
  };
  Ok(Predicate {
    kind,
    analysis: analysis.clone(),
  })
}

/// Rewrites the body of `procedure` with `transform`, annotating every node.
pub fn transform_procedure(
  procedure: Procedure,
  transform: &dyn Transformation,
  config: &AllocatorConfig,
) -> Result<Procedure> {
  let Procedure {
    name,
    locals,
    effect,
  } = procedure;
  let mut effect = update_effect(effect, transform, &mut Analysis::default(), config)?;
  effect.analysis.define_undefined_uses();
  Ok(Procedure {
    name,
    locals,
    effect,
  })
}

/// Annotates every node of `procedure` with its analysis at entry.
pub fn analyse(procedure: Procedure, config: &AllocatorConfig) -> Result<Procedure> {
  let procedure = transform_procedure(procedure, &Identity, config)?;
  for loc in procedure.effect.analysis.undefined_uses() {
    warn!(
      "`{}` is possibly used before it is defined in {}",
      loc, procedure.name
    );
  }
  Ok(procedure)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ala::{BinaryOperator, BranchRelation, DataType, Declarations};

  fn abs(name: &str) -> Location {
    Location::abs(name)
  }

  fn reg(reg: Register) -> Location {
    Location::Register(reg)
  }

  fn subeffects(effect: &Effect) -> &[Effect] {
    match &effect.kind {
      EffectKind::Do(effects) => effects,
      other => panic!("expected a sequence, got {:?}", other),
    }
  }

  fn analysed(effect: Effect) -> Effect {
    let procedure = Procedure::new("test", Declarations::default(), effect);
    analyse(procedure, &AllocatorConfig::default())
      .unwrap()
      .effect
  }

  #[test]
  fn test_update_rule() {
    let mut analysis = Analysis::default();
    analysis.possibly_live_locations.insert(abs("x"));
    analysis.possibly_live_locations.insert(abs("y"));

    // set(x, x) keeps x live
    analysis.update(&[abs("x")], &[abs("x")]);
    assert!(analysis.possibly_live_locations.contains(&abs("x")));
    assert!(analysis.conflicts.contains(&abs("x"), [abs("y")].iter()));

    analysis.update(&[abs("y")], &[]);
    assert!(!analysis.possibly_live_locations.contains(&abs("y")));
  }

  #[test]
  fn test_operands_conflict() {
    let effect = analysed(Effect::sequence(vec![
      Effect::set(abs("a"), 1),
      Effect::set(abs("b"), 2),
      Effect::compute(abs("c"), Source::abs("a"), BinaryOperator::Add, Source::abs("b")),
    ]));

    let conflicts = &effect.analysis.conflicts;
    assert!(conflicts.contains(&abs("a"), [abs("b")].iter()));
    assert!(conflicts.contains(&abs("b"), [abs("a")].iter()));
    assert!(!conflicts.contains(&abs("c"), [abs("a"), abs("b")].iter()));
    assert!(effect.analysis.possibly_live_locations.is_empty());

    let effects = subeffects(&effect);
    assert_eq!(
      effects[2].analysis.possibly_live_locations,
      vec![abs("a"), abs("b")].into_iter().collect()
    );
  }

  #[test]
  fn test_definition_conflicts_with_live_values() {
    let effect = analysed(Effect::sequence(vec![
      Effect::set(abs("d"), 1),
      Effect::set(abs("x"), 2),
      Effect::set(abs("d"), Source::abs("d")),
      Effect::compute(abs("r"), Source::abs("d"), BinaryOperator::Add, Source::abs("x")),
      Effect::set(reg(Register::A0), Source::abs("r")),
      Effect::ret(),
    ]));

    let conflicts = &effect.analysis.conflicts;
    assert!(conflicts.contains(&abs("d"), [abs("x")].iter()));
    assert!(!conflicts.contains(&abs("r"), [abs("d")].iter()));
    assert!(!conflicts.contains(&abs("r"), [reg(Register::A0)].iter()));
  }

  #[test]
  fn test_branches_are_unioned() {
    let effect = analysed(Effect::sequence(vec![
      Effect::set(abs("b"), 3),
      Effect::conditional(
        Predicate::relation(Source::abs("b"), BranchRelation::Lt, 10),
        Effect::sequence(vec![
          Effect::set(abs("t"), 1),
          Effect::set(abs("a"), Source::abs("t")),
        ]),
        Effect::set(abs("a"), Source::abs("u")),
      ),
      Effect::compute(abs("c"), Source::abs("a"), BinaryOperator::Add, Source::abs("b")),
      Effect::set(reg(Register::A0), Source::abs("c")),
      Effect::ret(),
    ]));

    let conditional = &subeffects(&effect)[1];
    assert_eq!(
      conditional.analysis.possibly_live_locations,
      vec![abs("b"), abs("u")].into_iter().collect()
    );
    let conflicts = &effect.analysis.conflicts;
    assert!(conflicts.contains(&abs("a"), [abs("b")].iter()));
    assert!(conflicts.contains(&abs("t"), [abs("b")].iter()));
    assert!(!conflicts.contains(&abs("t"), [abs("u")].iter()));
    assert_eq!(effect.analysis.undefined_uses().collect::<Vec<_>>(), vec![&abs("u")]);
  }

  #[test]
  fn test_undefined_uses_conflict_at_entry() {
    let effect = analysed(Effect::sequence(vec![
      Effect::compute(
        reg(Register::A0),
        Source::abs("u"),
        BinaryOperator::Add,
        Source::abs("v"),
      ),
      Effect::ret(),
    ]));

    let conflicts = &effect.analysis.conflicts;
    assert!(conflicts.contains(&abs("u"), [abs("v")].iter()));
    assert_eq!(
      effect.analysis.undefined_uses().collect::<Vec<_>>(),
      vec![&abs("u"), &abs("v")]
    );
  }

  #[test]
  fn test_predicate_do_runs_effects_first() {
    let effect = analysed(Effect::conditional(
      Predicate::after(
        vec![Effect::set(abs("p"), Source::abs("q"))],
        Predicate::relation(Source::abs("p"), BranchRelation::Eq, 0),
      ),
      Effect::nothing(),
      Effect::nothing(),
    ));
    assert_eq!(
      effect.analysis.possibly_live_locations,
      vec![abs("q")].into_iter().collect()
    );
  }

  #[test]
  fn test_values_live_across_calls_conflict_with_caller_saved() {
    let config = AllocatorConfig::default();
    let effect = analysed(Effect::sequence(vec![
      Effect::set(abs("x"), 1),
      Effect::set(reg(Register::A0), 2),
      Effect::call("f", vec![Register::A0]),
      Effect::set(reg(Register::A0), Source::abs("x")),
      Effect::ret(),
    ]));

    let conflicts = &effect.analysis.conflicts;
    for caller_saved in config.caller_saved_registers.iter() {
      assert!(conflicts.contains(&abs("x"), [reg(*caller_saved)].iter()));
    }
    assert!(!conflicts.contains(&abs("x"), [reg(Register::S1)].iter()));
  }

  #[test]
  fn test_scope_brackets_callee_saved() {
    let config = AllocatorConfig::default();
    let effect = analysed(Effect::sequence(vec![
      Effect::new(EffectKind::PushScope),
      Effect::set(abs("x"), 1),
      Effect::set(reg(Register::A0), Source::abs("x")),
      Effect::new(EffectKind::PopScope),
      Effect::ret(),
    ]));
    for callee_saved in config.callee_saved_registers.iter() {
      assert!(effect
        .analysis
        .conflicts
        .contains(&abs("x"), [reg(*callee_saved)].iter()));
    }
  }

  #[test]
  fn test_clear_all_spares_structural_registers() {
    let kind = EffectKind::ClearAll {
      spared: vec![Register::A0],
    };
    let defined = kind.defined_locations(&AllocatorConfig::default());
    assert!(!defined.contains(&reg(Register::A0)));
    assert!(!defined.contains(&reg(Register::Sp)));
    assert!(!defined.contains(&reg(Register::Fp)));
    assert!(defined.contains(&reg(Register::T0)));
  }

  #[test]
  fn test_element_access_uses() {
    let kind = EffectKind::SetElement {
      data_type: DataType::S32,
      buffer: abs("buf"),
      offset: Source::abs("i"),
      element: Source::Register(Register::A1, DataType::S32),
    };
    assert_eq!(
      kind.possibly_used_locations(&AllocatorConfig::default()),
      vec![abs("buf"), abs("i"), reg(Register::A1)]
    );
  }

  #[test]
  fn test_invoke_uses_operands_and_result() {
    let kind = EffectKind::Invoke {
      target: Source::abs("t"),
      data: Source::abs("d"),
    };
    assert_eq!(
      kind.possibly_used_locations(&AllocatorConfig::default()),
      vec![abs("t"), abs("d"), reg(Register::A0)]
    );
  }

  #[test]
  fn test_reanalysis_is_stable() {
    let effect = analysed(Effect::sequence(vec![
      Effect::set(abs("a"), 1),
      Effect::set(reg(Register::A0), Source::abs("a")),
      Effect::ret(),
    ]));
    let again = analysed(effect.clone());
    assert_eq!(again, effect);
  }
}
