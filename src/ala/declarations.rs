use std::{collections::BTreeMap, convert::TryFrom, fmt};

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

use crate::{
  ala::{location::FrameLocation, Location, Source},
  error::{AllocationError, Result},
};

/// The type of a datum, which determines the size and alignment of its frame cell.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataType {
  /// An unsigned byte.
  U8,
  /// A signed 4-byte integer.
  S32,
  /// An 8-byte capability.
  Cap,
}

impl DataType {
  pub const fn byte_size(&self) -> i64 {
    match self {
      DataType::U8 => 1,
      DataType::S32 => 4,
      DataType::Cap => 8,
    }
  }

  pub const fn alignment(&self) -> i64 {
    self.byte_size()
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_ref())
  }
}

/// A location with its declared data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
  pub location: Location,
  pub data_type: DataType,
}

impl Declaration {
  pub fn new(location: Location, data_type: DataType) -> Self {
    Declaration {
      location,
      data_type,
    }
  }
}

/// The locals of a procedure: a mapping from abstract and frame locations to
/// data types.
///
/// Registers are typed where they are read, so they are never declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Declaration>", into = "Vec<Declaration>")]
pub struct Declarations {
  types_by_location: BTreeMap<Location, DataType>,
}

impl Declarations {
  pub fn new(declarations: Vec<Declaration>) -> Result<Self> {
    let mut decls = Declarations::default();
    for decl in declarations {
      decls.declare(decl.location, decl.data_type)?;
    }
    Ok(decls)
  }

  /// Declares `location` with type `data_type`. Does nothing for registers.
  pub fn declare(&mut self, location: Location, data_type: DataType) -> Result<()> {
    if location.is_register() {
      return Ok(());
    }
    if let Some(previous) = self.types_by_location.insert(location.clone(), data_type) {
      if previous != data_type {
        return Err(AllocationError::InconsistentTyping {
          location,
          first: previous,
          second: data_type,
        });
      }
    }
    Ok(())
  }

  pub fn type_of(&self, location: &Location) -> Result<DataType> {
    self
      .types_by_location
      .get(location)
      .copied()
      .ok_or_else(|| AllocationError::UnknownLocation(location.clone()))
  }

  /// The (widest supported) type of a datum read from `source`.
  pub fn type_of_source(&self, source: &Source) -> Result<DataType> {
    match source {
      Source::Constant(_) => Ok(DataType::S32),
      Source::Capability(_) => Ok(DataType::Cap),
      Source::Register(_, data_type) => Ok(*data_type),
      Source::Abstract(loc) => self.type_of(&Location::Abstract(loc.clone())),
      Source::Frame(cell) => self.type_of(&Location::Frame(*cell)),
    }
  }

  /// The type of the datum copied by `set(destination, source)`.
  ///
  /// A declared destination decides, otherwise the source does.
  pub fn type_of_copy(&self, destination: &Location, source: &Source) -> Result<DataType> {
    match self.types_by_location.get(destination) {
      Some(data_type) => Ok(*data_type),
      None => self.type_of_source(source),
    }
  }

  pub fn contains(&self, location: &Location) -> bool {
    self.types_by_location.contains_key(location)
  }

  pub fn remove(&mut self, location: &Location) {
    self.types_by_location.remove(location);
  }

  /// The declared fixed frame cells, which spill slots must stay clear of.
  pub fn frame_locations(&self) -> impl Iterator<Item = (FrameLocation, DataType)> + '_ {
    self
      .types_by_location
      .iter()
      .filter_map(|(loc, ty)| loc.as_frame().map(|cell| (*cell, *ty)))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Location, &DataType)> {
    self.types_by_location.iter()
  }

  pub fn len(&self) -> usize {
    self.types_by_location.len()
  }

  pub fn is_empty(&self) -> bool {
    self.types_by_location.is_empty()
  }
}

impl TryFrom<Vec<Declaration>> for Declarations {
  type Error = AllocationError;

  fn try_from(declarations: Vec<Declaration>) -> Result<Self> {
    Declarations::new(declarations)
  }
}

impl From<Declarations> for Vec<Declaration> {
  fn from(declarations: Declarations) -> Self {
    declarations
      .types_by_location
      .into_iter()
      .map(|(location, data_type)| Declaration::new(location, data_type))
      .collect()
  }
}
