pub(crate) mod consts;
pub(crate) mod reg;

pub use reg::Register;

/// Position of `reg` in the given allocation pool, if it belongs to it.
pub fn color_from_reg(reg: Register, pool: &[Register]) -> Option<usize> {
  pool.iter().position(|&x| x == reg)
}
