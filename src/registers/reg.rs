use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// All integer/capability registers of CHERI-RISC-V.
///
/// The declaration order is the canonical order used for tie-breaking, it has no
/// meaning for the hardware.
#[derive(
  Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Register {
  Zero,
  Ra,
  Sp,
  Gp,
  Tp,
  T0,
  T1,
  T2,
  Fp,
  S1,
  A0,
  A1,
  A2,
  A3,
  A4,
  A5,
  A6,
  A7,
  S2,
  S3,
  S4,
  S5,
  S6,
  S7,
  S8,
  S9,
  S10,
  S11,
  T3,
  T4,
  T5,
  T6,
}

impl Register {
  pub const ALL: [Register; 32] = [
    Register::Zero,
    Register::Ra,
    Register::Sp,
    Register::Gp,
    Register::Tp,
    Register::T0,
    Register::T1,
    Register::T2,
    Register::Fp,
    Register::S1,
    Register::A0,
    Register::A1,
    Register::A2,
    Register::A3,
    Register::A4,
    Register::A5,
    Register::A6,
    Register::A7,
    Register::S2,
    Register::S3,
    Register::S4,
    Register::S5,
    Register::S6,
    Register::S7,
    Register::S8,
    Register::S9,
    Register::S10,
    Register::S11,
    Register::T3,
    Register::T4,
    Register::T5,
    Register::T6,
  ];

  /// The register holding a procedure's result.
  pub const fn result() -> Self {
    Register::A0
  }

  /// Structural registers are never cleared and never handed out by the allocator.
  pub const fn is_structural(&self) -> bool {
    matches!(
      self,
      Register::Zero | Register::Sp | Register::Gp | Register::Tp | Register::Fp
    )
  }

  /// Registers saved by the callee in the conventional RISC-V ABI.
  pub const fn is_callee_saved(&self) -> bool {
    matches!(
      self,
      Register::S1
        | Register::S2
        | Register::S3
        | Register::S4
        | Register::S5
        | Register::S6
        | Register::S7
        | Register::S8
        | Register::S9
        | Register::S10
        | Register::S11
    )
  }

  /// Registers clobbered by a call in the conventional RISC-V ABI.
  ///
  /// Every non-structural register that is not callee-saved, apart from the
  /// scratch temporaries `t0`–`t5` which are owned by the lower passes.
  pub const fn is_caller_saved(&self) -> bool {
    matches!(
      self,
      Register::Ra
        | Register::A0
        | Register::A1
        | Register::A2
        | Register::A3
        | Register::A4
        | Register::A5
        | Register::A6
        | Register::A7
        | Register::T6
    )
  }

  pub fn caller_saved() -> Vec<Self> {
    Self::ALL
      .iter()
      .copied()
      .filter(Register::is_caller_saved)
      .collect()
  }

  pub fn callee_saved() -> Vec<Self> {
    Self::ALL
      .iter()
      .copied()
      .filter(Register::is_callee_saved)
      .collect()
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_ref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_all_is_in_canonical_order() {
    let mut sorted = Register::ALL;
    sorted.sort();
    assert_eq!(sorted, Register::ALL);
  }

  #[test]
  fn test_saved_sets_are_disjoint() {
    for reg in Register::ALL.iter() {
      assert!(!(reg.is_caller_saved() && reg.is_callee_saved()), "{}", reg);
      assert!(!(reg.is_structural() && reg.is_caller_saved()), "{}", reg);
    }
  }

  #[test]
  fn test_register_names() {
    assert_eq!(Register::S10.to_string(), "s10");
    assert_eq!(serde_json::to_string(&Register::T6).unwrap(), "\"t6\"");
    assert_eq!(Register::result(), Register::A0);
  }

  #[test]
  fn test_default_saved_sets() {
    assert_eq!(Register::callee_saved().len(), 11);
    assert_eq!(Register::caller_saved().len(), 10);
    assert!(Register::caller_saved().contains(&Register::Ra));
  }
}
