//! Allocator configuration.
//!
//! Read from a TOML file; every key is optional and falls back to the
//! conventional RISC-V ABI.

use std::{collections::BTreeSet, fs, io, path::Path};

use log::debug;
use serde::Deserialize;

use crate::{
  error::{AllocationError, Result},
  registers::{consts::DEFAULT_ASSIGNABLE_REGS, Register},
};

/// Configuration options for allocation passes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
  /// Registers available to the allocator, in order of preference.
  pub assignable_registers: Vec<Register>,
  /// Registers a call may clobber.
  pub caller_saved_registers: Vec<Register>,
  /// Registers preserved across a scope.
  pub callee_saved_registers: Vec<Register>,
  pub coalescing: bool,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    AllocatorConfig {
      assignable_registers: DEFAULT_ASSIGNABLE_REGS.to_vec(),
      caller_saved_registers: Register::caller_saved(),
      callee_saved_registers: Register::callee_saved(),
      coalescing: true,
    }
  }
}

impl AllocatorConfig {
  pub fn from_toml(config: &str) -> Result<Self> {
    let config: AllocatorConfig =
      toml::from_str(config).map_err(|e| AllocationError::InvalidConfiguration(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Loads the configuration at `path`, or the defaults if there is no such file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    match fs::read_to_string(path.as_ref()) {
      Ok(config) => AllocatorConfig::from_toml(&config),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(
          "no allocator configuration at {}, using defaults",
          path.as_ref().display()
        );
        Ok(AllocatorConfig::default())
      }
      Err(e) => Err(AllocationError::InvalidConfiguration(format!(
        "cannot read {}: {}",
        path.as_ref().display(),
        e
      ))),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.assignable_registers.is_empty() {
      return Err(AllocationError::InvalidConfiguration(
        "no assignable registers".to_string(),
      ));
    }
    let callee_saved: BTreeSet<_> = self.callee_saved_registers.iter().collect();
    if let Some(reg) = self
      .caller_saved_registers
      .iter()
      .find(|reg| callee_saved.contains(reg))
    {
      return Err(AllocationError::InvalidConfiguration(format!(
        "`{}` is both caller-saved and callee-saved",
        reg
      )));
    }
    Ok(())
  }

  /// The number of colours available, i.e. K.
  pub fn k(&self) -> usize {
    self.assignable_registers.len()
  }
}
