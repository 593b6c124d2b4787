//! Lowering emission
//!
//! Resolves every abstract location to its home, then lowers the resolved tree
//! into the lower language.

use std::{
  fs::File,
  io::{self, prelude::*},
};

use crate::{
  ala::{
    Declarations, Effect, EffectKind, Location, PhysicalLocation, Predicate, PredicateKind,
    Procedure, Source,
  },
  error::{AllocationError, Result},
  lowered,
  regalloc::{Analysis, Assignments},
};

/// Emits one procedure using its final assignments.
pub struct Emitter {
  assignments: Assignments,
  /// The procedure's declarations plus the spill cells handed out so far.
  declarations: Declarations,
}

impl Emitter {
  pub fn new(assignments: Assignments, declarations: Declarations) -> Self {
    Emitter {
      assignments,
      declarations,
    }
  }

  fn home(&mut self, location: &Location) -> Result<Option<PhysicalLocation>> {
    let abs = match location {
      Location::Abstract(abs) => abs,
      _ => return Ok(None),
    };
    let home = self.assignments.home(abs, &self.declarations)?;
    if let PhysicalLocation::Frame(cell) = home {
      let data_type = self.declarations.type_of(location)?;
      self.declarations.declare(Location::Frame(cell), data_type)?;
    }
    Ok(Some(home))
  }

  fn resolve_location(&mut self, location: Location) -> Result<Location> {
    Ok(match self.home(&location)? {
      Some(home) => Location::from(home),
      None => location,
    })
  }

  fn resolve_source(&mut self, source: Source) -> Result<Source> {
    let location = match &source {
      Source::Abstract(abs) => Location::Abstract(abs.clone()),
      _ => return Ok(source),
    };
    Ok(match self.home(&location)? {
      Some(PhysicalLocation::Register(reg)) => {
        Source::Register(reg, self.declarations.type_of(&location)?)
      }
      Some(PhysicalLocation::Frame(cell)) => Source::Frame(cell),
      None => source,
    })
  }

  /// Replaces every abstract location in `effect` by its home. Analyses are
  /// dropped, physical references are left untouched.
  pub fn resolve_effect(&mut self, effect: Effect) -> Result<Effect> {
    let kind = match effect.kind {
      EffectKind::Do(effects) => EffectKind::Do(
        effects
          .into_iter()
          .map(|effect| self.resolve_effect(effect))
          .collect::<Result<_>>()?,
      ),
      EffectKind::Set {
        destination,
        source,
        data_type,
      } => {
        // fixed before the destination loses its declaration to a register
        let data_type = match data_type {
          Some(data_type) => data_type,
          None => self.declarations.type_of_copy(&destination, &source)?,
        };
        EffectKind::Set {
          destination: self.resolve_location(destination)?,
          source: self.resolve_source(source)?,
          data_type: Some(data_type),
        }
      }
      EffectKind::Compute {
        destination,
        lhs,
        operation,
        rhs,
      } => EffectKind::Compute {
        destination: self.resolve_location(destination)?,
        lhs: self.resolve_source(lhs)?,
        operation,
        rhs: self.resolve_source(rhs)?,
      },
      EffectKind::CreateBuffer {
        bytes,
        capability,
        scoped,
      } => EffectKind::CreateBuffer {
        bytes,
        capability: self.resolve_location(capability)?,
        scoped,
      },
      EffectKind::DestroyBuffer { capability } => EffectKind::DestroyBuffer {
        capability: self.resolve_source(capability)?,
      },
      EffectKind::GetElement {
        data_type,
        buffer,
        offset,
        destination,
      } => EffectKind::GetElement {
        data_type,
        buffer: self.resolve_location(buffer)?,
        offset: self.resolve_source(offset)?,
        destination: self.resolve_location(destination)?,
      },
      EffectKind::SetElement {
        data_type,
        buffer,
        offset,
        element,
      } => EffectKind::SetElement {
        data_type,
        buffer: self.resolve_location(buffer)?,
        offset: self.resolve_source(offset)?,
        element: self.resolve_source(element)?,
      },
      EffectKind::CreateSeal { destination } => EffectKind::CreateSeal {
        destination: self.resolve_location(destination)?,
      },
      EffectKind::If {
        condition,
        affirmative,
        negative,
      } => EffectKind::If {
        condition: Box::new(self.resolve_predicate(*condition)?),
        affirmative: Box::new(self.resolve_effect(*affirmative)?),
        negative: Box::new(self.resolve_effect(*negative)?),
      },
      EffectKind::Invoke { target, data } => EffectKind::Invoke {
        target: self.resolve_source(target)?,
        data: self.resolve_source(data)?,
      },
      kind @ EffectKind::PushScope
      | kind @ EffectKind::PopScope
      | kind @ EffectKind::ClearAll { .. }
      | kind @ EffectKind::Call { .. }
      | kind @ EffectKind::Return => kind,
    };
    Ok(Effect {
      kind,
      analysis: Analysis::default(),
    })
  }

  pub fn resolve_predicate(&mut self, predicate: Predicate) -> Result<Predicate> {
    let kind = match predicate.kind {
      PredicateKind::Constant(holds) => PredicateKind::Constant(holds),
      PredicateKind::Relation { lhs, relation, rhs } => PredicateKind::Relation {
        lhs: self.resolve_source(lhs)?,
        relation,
        rhs: self.resolve_source(rhs)?,
      },
      PredicateKind::If {
        condition,
        affirmative,
        negative,
      } => PredicateKind::If {
        condition: Box::new(self.resolve_predicate(*condition)?),
        affirmative: Box::new(self.resolve_predicate(*affirmative)?),
        negative: Box::new(self.resolve_predicate(*negative)?),
      },
      PredicateKind::Do { effects, then } => PredicateKind::Do {
        effects: effects
          .into_iter()
          .map(|effect| self.resolve_effect(effect))
          .collect::<Result<_>>()?,
        then: Box::new(self.resolve_predicate(*then)?),
      },
    };
    Ok(Predicate {
      kind,
      analysis: Analysis::default(),
    })
  }

  /// The size of the call frame, final once the whole procedure is resolved.
  pub fn frame_byte_size(&self) -> i64 {
    self.assignments.frame().byte_size()
  }

  fn lower_location(&self, location: Location) -> Result<PhysicalLocation> {
    match location {
      Location::Register(reg) => Ok(PhysicalLocation::Register(reg)),
      Location::Frame(cell) => Ok(PhysicalLocation::Frame(cell)),
      abs @ Location::Abstract(_) => Err(AllocationError::UnresolvedLocation(abs)),
    }
  }

  fn lower_source(&self, source: Source) -> Result<lowered::Source> {
    match source {
      Source::Constant(value) => Ok(lowered::Source::Constant(value)),
      Source::Register(reg, _) => Ok(lowered::Source::Register(reg)),
      Source::Frame(cell) => Ok(lowered::Source::Frame(cell)),
      Source::Capability(label) => Ok(lowered::Source::Capability(label)),
      Source::Abstract(abs) => Err(AllocationError::UnresolvedLocation(Location::Abstract(abs))),
    }
  }

  /// Lowers a resolved effect.
  pub fn lower_effect(&self, effect: Effect) -> Result<lowered::Effect> {
    Ok(match effect.kind {
      EffectKind::Do(effects) => lowered::Effect::Do(
        effects
          .into_iter()
          .map(|effect| self.lower_effect(effect))
          .collect::<Result<_>>()?,
      ),
      EffectKind::Set {
        destination,
        source,
        data_type,
      } => {
        let data_type = data_type
          .map(Ok)
          .unwrap_or_else(|| self.declarations.type_of_copy(&destination, &source));
        lowered::Effect::Set {
          destination: self.lower_location(destination)?,
          source: self.lower_source(source)?,
          data_type: data_type?,
        }
      }
      EffectKind::Compute {
        destination,
        lhs,
        operation,
        rhs,
      } => lowered::Effect::Compute {
        destination: self.lower_location(destination)?,
        lhs: self.lower_source(lhs)?,
        operation,
        rhs: self.lower_source(rhs)?,
      },
      EffectKind::CreateBuffer {
        bytes,
        capability,
        scoped,
      } => lowered::Effect::CreateBuffer {
        bytes,
        capability: self.lower_location(capability)?,
        on_frame: scoped,
      },
      EffectKind::DestroyBuffer { capability } => lowered::Effect::DestroyBuffer {
        capability: self.lower_source(capability)?,
      },
      EffectKind::GetElement {
        data_type,
        buffer,
        offset,
        destination,
      } => lowered::Effect::GetElement {
        data_type,
        buffer: self.lower_location(buffer)?,
        offset: self.lower_source(offset)?,
        destination: self.lower_location(destination)?,
      },
      EffectKind::SetElement {
        data_type,
        buffer,
        offset,
        element,
      } => lowered::Effect::SetElement {
        data_type,
        buffer: self.lower_location(buffer)?,
        offset: self.lower_source(offset)?,
        element: self.lower_source(element)?,
      },
      EffectKind::CreateSeal { destination } => lowered::Effect::CreateSeal {
        destination: self.lower_location(destination)?,
      },
      EffectKind::If {
        condition,
        affirmative,
        negative,
      } => lowered::Effect::If {
        condition: Box::new(self.lower_predicate(*condition)?),
        affirmative: Box::new(self.lower_effect(*affirmative)?),
        negative: Box::new(self.lower_effect(*negative)?),
      },
      EffectKind::PushScope => lowered::Effect::PushFrame {
        byte_size: self.frame_byte_size(),
      },
      EffectKind::PopScope => lowered::Effect::PopFrame,
      EffectKind::ClearAll { spared } => lowered::Effect::ClearAll { spared },
      EffectKind::Call { callee, .. } => lowered::Effect::Call { callee },
      EffectKind::Invoke { target, data } => lowered::Effect::Invoke {
        target: self.lower_source(target)?,
        data: self.lower_source(data)?,
      },
      EffectKind::Return => lowered::Effect::Return,
    })
  }

  pub fn lower_predicate(&self, predicate: Predicate) -> Result<lowered::Predicate> {
    Ok(match predicate.kind {
      PredicateKind::Constant(holds) => lowered::Predicate::Constant(holds),
      PredicateKind::Relation { lhs, relation, rhs } => lowered::Predicate::Relation {
        lhs: self.lower_source(lhs)?,
        relation,
        rhs: self.lower_source(rhs)?,
      },
      PredicateKind::If {
        condition,
        affirmative,
        negative,
      } => lowered::Predicate::If {
        condition: Box::new(self.lower_predicate(*condition)?),
        affirmative: Box::new(self.lower_predicate(*affirmative)?),
        negative: Box::new(self.lower_predicate(*negative)?),
      },
      PredicateKind::Do { effects, then } => lowered::Predicate::Do {
        effects: effects
          .into_iter()
          .map(|effect| self.lower_effect(effect))
          .collect::<Result<_>>()?,
        then: Box::new(self.lower_predicate(*then)?),
      },
    })
  }
}

/// Resolves and lowers `procedure`.
pub fn emit_procedure(procedure: Procedure, assignments: Assignments) -> Result<lowered::Procedure> {
  let Procedure {
    name,
    locals,
    effect,
  } = procedure;
  let mut emitter = Emitter::new(assignments, locals);
  let resolved = emitter.resolve_effect(effect)?;
  let effect = emitter.lower_effect(resolved)?;
  Ok(lowered::Procedure {
    name,
    frame_byte_size: emitter.frame_byte_size(),
    effect,
  })
}

/// Writes `program` as JSON to `filename`, or to stdout if there is none.
pub fn emit_json(filename: Option<&str>, program: &lowered::Program) -> io::Result<()> {
  let json = serde_json::to_string_pretty(program)?;
  match filename {
    Some(filename) => {
      let mut file = File::create(filename)?;
      writeln!(file, "{}", json)
    }
    None => {
      println!("{}", json);
      Ok(())
    }
  }
}
