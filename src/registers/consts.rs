use crate::registers::reg::Register;

// IMPORTANT: The order of DEFAULT_ASSIGNABLE_REGS decides which register wins a
// tie in the allocator. Keep it deterministic!
pub const REG_ALLOC_POOL_SIZE: usize = 20;
pub const DEFAULT_ASSIGNABLE_REGS: [Register; REG_ALLOC_POOL_SIZE] = [
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
  Register::T6,
];

/// Byte size of a capability, also the size of the caller's frame capability slot.
pub const CAPABILITY_SIZE: i64 = 8;
