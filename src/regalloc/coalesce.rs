//! Implements copy coalescing for the register allocator

use log::debug;

use crate::{
  ala::{
    AbstractLocation, Declarations, Effect, EffectKind, Location, Predicate, PredicateKind,
    Procedure, Source,
  },
  config::AllocatorConfig,
  error::Result,
  regalloc::{
    interference::ConflictGraph,
    liveness::{analyse, transform_procedure, Transformation},
  },
};

/// Replaces every occurrence of `removed` by `retained`.
///
/// Copies that become trivial are replaced by an empty `do`.
struct CoalesceLocations<'a> {
  removed: AbstractLocation,
  retained: Location,
  /// Still contains the declaration of `removed`.
  declarations: &'a Declarations,
}

impl CoalesceLocations<'_> {
  fn is_removed(&self, location: &Location) -> bool {
    matches!(location, Location::Abstract(loc) if *loc == self.removed)
  }

  fn location(&self, location: Location) -> Location {
    if self.is_removed(&location) {
      self.retained.clone()
    } else {
      location
    }
  }

  fn source(&self, source: Source) -> Result<Source> {
    match source {
      Source::Abstract(loc) if loc == self.removed => Ok(match &self.retained {
        Location::Abstract(retained) => Source::Abstract(retained.clone()),
        Location::Register(reg) => {
          let data_type = self.declarations.type_of(&Location::Abstract(loc))?;
          Source::Register(*reg, data_type)
        }
        Location::Frame(cell) => Source::Frame(*cell),
      }),
      source => Ok(source),
    }
  }
}

impl Transformation for CoalesceLocations<'_> {
  fn effect(&self, effect: Effect) -> Result<Effect> {
    let kind = match effect.kind {
      EffectKind::Set {
        destination,
        source,
        data_type,
      } => {
        // a register never carries a declaration, so it takes over the removed one's type
        let data_type = match (&self.retained, self.is_removed(&destination)) {
          (Location::Register(_), true) if data_type.is_none() => Some(
            self
              .declarations
              .type_of(&Location::Abstract(self.removed.clone()))?,
          ),
          _ => data_type,
        };
        let destination = self.location(destination);
        let source = self.source(source)?;
        if source.location().as_ref() == Some(&destination) {
          EffectKind::Do(vec![])
        } else {
          EffectKind::Set {
            destination,
            source,
            data_type,
          }
        }
      }
      EffectKind::Compute {
        destination,
        lhs,
        operation,
        rhs,
      } => EffectKind::Compute {
        destination: self.location(destination),
        lhs: self.source(lhs)?,
        operation,
        rhs: self.source(rhs)?,
      },
      EffectKind::CreateBuffer {
        bytes,
        capability,
        scoped,
      } => EffectKind::CreateBuffer {
        bytes,
        capability: self.location(capability),
        scoped,
      },
      EffectKind::DestroyBuffer { capability } => EffectKind::DestroyBuffer {
        capability: self.source(capability)?,
      },
      EffectKind::GetElement {
        data_type,
        buffer,
        offset,
        destination,
      } => EffectKind::GetElement {
        data_type,
        buffer: self.location(buffer),
        offset: self.source(offset)?,
        destination: self.location(destination),
      },
      EffectKind::SetElement {
        data_type,
        buffer,
        offset,
        element,
      } => EffectKind::SetElement {
        data_type,
        buffer: self.location(buffer),
        offset: self.source(offset)?,
        element: self.source(element)?,
      },
      EffectKind::CreateSeal { destination } => EffectKind::CreateSeal {
        destination: self.location(destination),
      },
      EffectKind::Invoke { target, data } => EffectKind::Invoke {
        target: self.source(target)?,
        data: self.source(data)?,
      },
      kind => kind,
    };
    Ok(Effect {
      kind,
      analysis: effect.analysis,
    })
  }

  fn predicate(&self, predicate: Predicate) -> Result<Predicate> {
    let kind = match predicate.kind {
      PredicateKind::Relation { lhs, relation, rhs } => PredicateKind::Relation {
        lhs: self.source(lhs)?,
        relation,
        rhs: self.source(rhs)?,
      },
      kind => kind,
    };
    Ok(Predicate {
      kind,
      analysis: predicate.analysis,
    })
  }
}

/// Finds the next pair (removed, retained) of copied locations that can be merged.
///
/// Sequences are scanned from their last effect to their first, conditionals
/// from the negative branch to the condition.
struct CandidateSearch<'a> {
  conflicts: &'a ConflictGraph,
  k: usize,
}

impl CandidateSearch<'_> {
  fn coalescable(&self, a: &Location, b: &Location) -> bool {
    a != b && self.conflicts.safely_coalescable(a, b, self.k)
  }

  fn effects(&self, effects: &[Effect]) -> Option<(AbstractLocation, Location)> {
    effects.iter().rev().find_map(|effect| self.effect(effect))
  }

  fn effect(&self, effect: &Effect) -> Option<(AbstractLocation, Location)> {
    match &effect.kind {
      EffectKind::Do(effects) => self.effects(effects),
      EffectKind::Set {
        destination: Location::Abstract(dest),
        source,
        ..
      } => {
        let src = source.location()?;
        let dest_loc = Location::Abstract(dest.clone());
        if self.coalescable(&src, &dest_loc) {
          Some((dest.clone(), src))
        } else {
          None
        }
      }
      EffectKind::Set {
        destination,
        source: Source::Abstract(src),
        ..
      } => {
        let src_loc = Location::Abstract(src.clone());
        if self.coalescable(&src_loc, destination) {
          Some((src.clone(), destination.clone()))
        } else {
          None
        }
      }
      EffectKind::If {
        condition,
        affirmative,
        negative,
      } => self
        .effect(negative)
        .or_else(|| self.effect(affirmative))
        .or_else(|| self.predicate(condition)),
      _ => None,
    }
  }

  fn predicate(&self, predicate: &Predicate) -> Option<(AbstractLocation, Location)> {
    match &predicate.kind {
      PredicateKind::Constant(_) | PredicateKind::Relation { .. } => None,
      PredicateKind::If {
        condition,
        affirmative,
        negative,
      } => self
        .predicate(negative)
        .or_else(|| self.predicate(affirmative))
        .or_else(|| self.predicate(condition)),
      PredicateKind::Do { effects, then } => {
        self.effects(effects).or_else(|| self.predicate(then))
      }
    }
  }
}

/// Coalesces copies in `procedure` until no safely coalescable copy remains.
///
/// Returns the analysed procedure and the number of eliminated copies.
pub fn coalesce(procedure: Procedure, config: &AllocatorConfig) -> Result<(Procedure, usize)> {
  let mut procedure = analyse(procedure, config)?;
  if !config.coalescing {
    return Ok((procedure, 0));
  }

  let mut count = 0;
  loop {
    let search = CandidateSearch {
      conflicts: &procedure.effect.analysis.conflicts,
      k: config.k(),
    };
    let (removed, retained) = match search.effect(&procedure.effect) {
      Some(candidate) => candidate,
      None => break,
    };
    debug!(
      "coalescing {} into {} in {}",
      removed, retained, procedure.name
    );

    let locals = procedure.locals.clone();
    let transform = CoalesceLocations {
      removed: removed.clone(),
      retained,
      declarations: &locals,
    };
    procedure = transform_procedure(procedure, &transform, config)?;
    procedure.locals.remove(&Location::Abstract(removed));
    count += 1;
  }

  debug!("coalesced {} copies in {}", count, procedure.name);
  Ok((procedure, count))
}
