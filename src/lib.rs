//! Register allocation for the CHERI-RISC-V effect language.
//!
//! A procedure flows through the passes in order:
//!
//!   declarations + effect tree -> `regalloc::analyse` -> `regalloc::coalesce`
//!   (to a fixed point) -> `regalloc::Assignments` -> `emit::Emitter` -> lowered tree

pub mod ala;
pub mod config;
pub mod emit;
pub mod error;
pub mod lowered;
pub mod regalloc;
pub mod registers;
mod utils;

use anyhow::{Context, Result};
use log::info;

use crate::{
  ala::{Procedure, Program},
  config::AllocatorConfig,
  regalloc::Assignments,
};

/// An analysed, coalesced procedure together with its assignments.
pub struct Allocation {
  pub procedure: Procedure,
  pub assignments: Assignments,
  /// The number of copies eliminated by coalescing.
  pub coalesced: usize,
}

impl Allocation {
  /// Resolves and lowers the procedure.
  pub fn emit(self) -> Result<lowered::Procedure> {
    let name = self.procedure.name.clone();
    emit::emit_procedure(self.procedure, self.assignments)
      .with_context(|| format!("Failed to emit procedure {}", name))
  }
}

/// Runs liveness analysis, coalescing and assignment on `procedure`.
pub fn allocate(procedure: Procedure, config: &AllocatorConfig) -> Result<Allocation> {
  let name = procedure.name.clone();
  let (procedure, coalesced) = regalloc::coalesce(procedure, config)
    .with_context(|| format!("Failed to coalesce procedure {}", name))?;
  let assignments = Assignments::new(
    &procedure.effect.analysis.conflicts,
    &procedure.locals,
    config,
  )
  .with_context(|| format!("Failed to assign locations in procedure {}", name))?;

  info!(
    "{}: coalesced {} copies, {} locations assigned, frame of {} bytes",
    name,
    coalesced,
    assignments.iter().count(),
    assignments.frame().byte_size()
  );

  Ok(Allocation {
    procedure,
    assignments,
    coalesced,
  })
}

/// Allocates and lowers one procedure.
pub fn allocate_procedure(
  procedure: Procedure,
  config: &AllocatorConfig,
) -> Result<lowered::Procedure> {
  allocate(procedure, config)?.emit()
}

/// Allocates and lowers every procedure of `program` independently.
pub fn allocate_program(program: Program, config: &AllocatorConfig) -> Result<lowered::Program> {
  let procedures = program
    .procedures
    .into_iter()
    .map(|procedure| allocate_procedure(procedure, config))
    .collect::<Result<_>>()?;
  Ok(lowered::Program { procedures })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    ala::{
      AbstractLocation, BinaryOperator, DataType, Declaration, Declarations, Effect, EffectKind,
      FrameLocation, Location, PhysicalLocation, Source,
    },
    regalloc::Conflict,
    registers::Register,
  };

  fn abs(name: &str) -> Location {
    Location::abs(name)
  }

  fn declare(names: &[&str]) -> Declarations {
    Declarations::new(
      names
        .iter()
        .map(|name| Declaration::new(abs(name), DataType::S32))
        .collect(),
    )
    .unwrap()
  }

  /// The home of `location` and the number of bytes it occupies there.
  fn placement(allocation: &Allocation, location: &Location) -> (PhysicalLocation, i64) {
    let home = match location {
      Location::Abstract(abs) => allocation.assignments.get(abs).unwrap(),
      Location::Register(reg) => PhysicalLocation::Register(*reg),
      Location::Frame(cell) => PhysicalLocation::Frame(*cell),
    };
    let byte_size = allocation
      .procedure
      .locals
      .type_of(location)
      .map(|data_type| data_type.byte_size())
      .unwrap_or(8);
    (home, byte_size)
  }

  fn overlap(a: (PhysicalLocation, i64), b: (PhysicalLocation, i64)) -> bool {
    match (a.0, b.0) {
      (PhysicalLocation::Register(x), PhysicalLocation::Register(y)) => x == y,
      (PhysicalLocation::Frame(x), PhysicalLocation::Frame(y)) => {
        x.offset < y.offset + b.1 && y.offset < x.offset + a.1
      }
      _ => false,
    }
  }

  fn assert_valid(allocation: &Allocation) {
    for Conflict { first, second } in allocation.procedure.effect.analysis.conflicts.conflicts() {
      if first.is_physical() && second.is_physical() {
        continue;
      }
      assert!(
        !overlap(placement(allocation, &first), placement(allocation, &second)),
        "`{}` and `{}` conflict but share a home",
        first,
        second
      );
    }
  }

  #[test]
  fn test_copies_vanish_end_to_end() {
    let procedure = Procedure::new(
      "main",
      Declarations::new(vec![
        Declaration::new(abs("d"), DataType::S32),
        Declaration::new(abs("e"), DataType::S32),
      ])
      .unwrap(),
      Effect::sequence(vec![
        Effect::set(abs("d"), 5),
        Effect::set(abs("e"), Source::abs("d")),
        Effect::set(Location::Register(Register::A0), Source::abs("e")),
        Effect::ret(),
      ]),
    );
    let lowered = allocate_procedure(procedure, &AllocatorConfig::default()).unwrap();

    assert_eq!(lowered.frame_byte_size, 8);
    assert_eq!(
      lowered.effect,
      lowered::Effect::Do(vec![
        lowered::Effect::Set {
          data_type: DataType::S32,
          destination: PhysicalLocation::Register(Register::A0),
          source: lowered::Source::Constant(5),
        },
        lowered::Effect::Do(vec![]),
        lowered::Effect::Do(vec![]),
        lowered::Effect::Return,
      ])
    );
  }

  #[test]
  fn test_value_across_call_avoids_caller_saved() {
    let procedure = Procedure::new(
      "caller",
      Declarations::new(vec![Declaration::new(abs("x"), DataType::S32)]).unwrap(),
      Effect::sequence(vec![
        Effect::set(abs("x"), 1),
        Effect::call("f", vec![]),
        Effect::compute(
          Location::Register(Register::A0),
          Source::abs("x"),
          BinaryOperator::Add,
          1,
        ),
        Effect::ret(),
      ]),
    );
    let allocation = allocate(procedure, &AllocatorConfig::default()).unwrap();
    let home = allocation
      .assignments
      .get(&AbstractLocation::new("x"))
      .unwrap();
    match home {
      PhysicalLocation::Register(reg) => assert!(!reg.is_caller_saved()),
      PhysicalLocation::Frame(_) => {}
    }
  }

  #[test]
  fn test_coalescing_preserves_validity() {
    let procedure = Procedure::new(
      "busy",
      declare(&["x", "y", "z", "w", "s", "t", "u"]),
      Effect::sequence(vec![
        Effect::set(abs("x"), 1),
        Effect::set(abs("y"), 2),
        Effect::set(abs("z"), 3),
        Effect::set(abs("w"), Source::abs("x")),
        Effect::compute(abs("s"), Source::abs("w"), BinaryOperator::Add, Source::abs("y")),
        Effect::call("f", vec![]),
        Effect::compute(abs("t"), Source::abs("s"), BinaryOperator::Add, Source::abs("z")),
        Effect::set(abs("u"), Source::abs("t")),
        Effect::compute(
          Location::Register(Register::A0),
          Source::abs("u"),
          BinaryOperator::Add,
          Source::abs("x"),
        ),
        Effect::ret(),
      ]),
    );
    let config = AllocatorConfig {
      assignable_registers: vec![Register::S1, Register::S2, Register::A0],
      ..AllocatorConfig::default()
    };
    let allocation = allocate(procedure, &config).unwrap();

    assert!(allocation.coalesced > 0);
    assert!(!allocation.procedure.effect.analysis.conflicts.is_empty());
    assert_valid(&allocation);
    allocation.emit().unwrap();
  }

  #[test]
  fn test_undefined_uses_get_distinct_homes() {
    let procedure = Procedure::new(
      "params",
      declare(&["u", "v"]),
      Effect::sequence(vec![
        Effect::compute(
          Location::Register(Register::A0),
          Source::abs("u"),
          BinaryOperator::Add,
          Source::abs("v"),
        ),
        Effect::ret(),
      ]),
    );
    let allocation = allocate(procedure, &AllocatorConfig::default()).unwrap();
    let u = allocation.assignments.get(&AbstractLocation::new("u"));
    let v = allocation.assignments.get(&AbstractLocation::new("v"));
    assert!(u.is_some());
    assert_ne!(u, v);
    assert_valid(&allocation);
  }

  #[test]
  fn test_spills_stay_clear_of_declared_frame_cells() {
    let cell = Location::Frame(FrameLocation::new(-16));
    let mut locals = declare(&["a", "b", "c", "d"]);
    locals.declare(cell.clone(), DataType::S32).unwrap();
    let procedure = Procedure::new(
      "crowded",
      locals,
      Effect::sequence(vec![
        Effect::set(abs("a"), 1),
        Effect::set(abs("b"), 2),
        Effect::set(abs("c"), 3),
        Effect::set(cell, Source::abs("a")),
        Effect::compute(abs("d"), Source::abs("b"), BinaryOperator::Add, Source::abs("c")),
        Effect::set(Location::Register(Register::A0), Source::abs("d")),
        Effect::ret(),
      ]),
    );
    let config = AllocatorConfig {
      assignable_registers: vec![Register::S1],
      ..AllocatorConfig::default()
    };
    let allocation = allocate(procedure, &config).unwrap();

    let spills = allocation
      .assignments
      .iter()
      .filter_map(|(_, home)| home.as_frame().copied())
      .collect::<Vec<_>>();
    assert!(!spills.is_empty());
    for spill in spills {
      // the declared cell covers [-16, -12), the caller's capability [-8, 0)
      assert!(spill.offset + 4 <= -16, "spill at {} overlaps the frame cells", spill);
    }
    assert_valid(&allocation);
  }

  #[test]
  fn test_failing_procedure_names_itself() {
    let procedure = Procedure::new(
      "broken",
      Declarations::default(),
      Effect::sequence(vec![
        Effect::set(abs("a"), 1),
        Effect::set(abs("b"), 2),
        Effect::compute(abs("c"), Source::abs("a"), BinaryOperator::Add, Source::abs("b")),
        Effect::set(Location::Register(Register::A0), Source::abs("c")),
        Effect::new(EffectKind::Return),
      ]),
    );
    let config = AllocatorConfig {
      assignable_registers: vec![Register::A1],
      coalescing: false,
      ..AllocatorConfig::default()
    };
    let err = allocate_procedure(procedure, &config).unwrap_err();
    assert!(format!("{:#}", err).contains("broken"));
    assert!(format!("{:#}", err).contains("no known type"));
  }

  #[test]
  fn test_program_json_round_trip() {
    let json = r#"{
      "procedures": [{
        "name": "main",
        "locals": [{"location": {"abstract": "x"}, "data_type": "s32"}],
        "effect": {"kind": {"do": [
          {"kind": {"set": {"destination": {"abstract": "x"}, "source": {"constant": 3}}}},
          {"kind": {"set": {"destination": {"register": "a0"}, "source": {"abstract": "x"}}}},
          {"kind": "return"}
        ]}}
      }]
    }"#;
    let program: Program = serde_json::from_str(json).unwrap();
    let lowered = allocate_program(program, &AllocatorConfig::default()).unwrap();
    assert_eq!(lowered.procedures.len(), 1);
    assert_eq!(lowered.procedures[0].frame_byte_size, 8);
    let output = serde_json::to_value(&lowered).unwrap();
    assert_eq!(output["procedures"][0]["name"], "main");
    assert_eq!(output["procedures"][0]["frame_byte_size"], 8);
  }
}
