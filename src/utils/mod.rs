mod graph;
pub use graph::Graph;

/// Rounds `value` up to the next multiple of `alignment`.
pub fn align_up(value: i64, alignment: i64) -> i64 {
  debug_assert!(alignment > 0);
  (value + alignment - 1) / alignment * alignment
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_up() {
    assert_eq!(align_up(0, 8), 0);
    assert_eq!(align_up(1, 8), 8);
    assert_eq!(align_up(13, 4), 16);
    assert_eq!(align_up(9, 1), 9);
  }
}
