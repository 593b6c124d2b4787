use std::{
  collections::{BTreeMap, BTreeSet},
  iter,
};

use log::debug;

use crate::{
  ala::{AbstractLocation, Declarations, Location, PhysicalLocation},
  config::AllocatorConfig,
  error::Result,
  regalloc::{frame::Frame, interference::ConflictGraph},
  registers::{color_from_reg, Register},
};

/// The homes of the abstract locations of one procedure.
///
/// Built by first-fit colouring of the conflict graph, in order of increasing
/// degree. A location that fits no register is spilled to a fresh frame cell.
#[derive(Debug, Clone)]
pub struct Assignments {
  conflicts: ConflictGraph,
  /// The assignable registers; a register's position is its colour.
  registers: Vec<Register>,
  /// The locations assigned to each colour.
  assigned_to: Vec<BTreeSet<Location>>,
  homes: BTreeMap<AbstractLocation, PhysicalLocation>,
  frame: Frame,
}

impl Assignments {
  /// Assigns every abstract location in `conflicts`.
  pub fn new(
    conflicts: &ConflictGraph,
    declarations: &Declarations,
    config: &AllocatorConfig,
  ) -> Result<Self> {
    let mut assignments = Assignments {
      conflicts: conflicts.clone(),
      registers: config.assignable_registers.clone(),
      assigned_to: vec![BTreeSet::new(); config.assignable_registers.len()],
      homes: BTreeMap::new(),
      frame: Frame::reserving(declarations),
    };

    // Interference graph -> coloring order -> greedy coloring -> PhysicalLocation
    for loc in conflicts.locations_ordered_by_increasing_degree() {
      if let Location::Abstract(abs) = loc {
        assignments.assign(abs, declarations)?;
      }
    }

    Ok(assignments)
  }

  fn assign(
    &mut self,
    location: AbstractLocation,
    declarations: &Declarations,
  ) -> Result<PhysicalLocation> {
    let loc = Location::Abstract(location.clone());
    let color = self.registers.iter().enumerate().position(|(color, reg)| {
      let reg_loc = Location::Register(*reg);
      let taken = self.assigned_to[color].iter().chain(iter::once(&reg_loc));
      !self.conflicts.contains(&loc, taken)
    });

    let home = match color {
      Some(color) => {
        self.assigned_to[color].insert(loc.clone());
        PhysicalLocation::Register(self.registers[color])
      }
      None => {
        let data_type = declarations.type_of(&loc)?;
        PhysicalLocation::Frame(self.frame.allocate(data_type))
      }
    };

    debug!("assigned {} to {}", location, home);
    self.homes.insert(location, home);
    Ok(home)
  }

  /// The home of `location`, assigning one if it has no conflicts at all.
  pub fn home(
    &mut self,
    location: &AbstractLocation,
    declarations: &Declarations,
  ) -> Result<PhysicalLocation> {
    match self.homes.get(location) {
      Some(home) => Ok(*home),
      None => self.assign(location.clone(), declarations),
    }
  }

  pub fn get(&self, location: &AbstractLocation) -> Option<PhysicalLocation> {
    self.homes.get(location).copied()
  }

  /// The abstract locations assigned to `reg`, empty if it is not assignable.
  pub fn assigned_to(&self, reg: Register) -> impl Iterator<Item = &Location> {
    color_from_reg(reg, &self.registers)
      .map(|color| &self.assigned_to[color])
      .into_iter()
      .flatten()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&AbstractLocation, &PhysicalLocation)> {
    self.homes.iter()
  }

  pub fn frame(&self) -> &Frame {
    &self.frame
  }
}
