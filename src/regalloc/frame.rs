use crate::{
  ala::{DataType, Declarations, FrameLocation},
  registers::consts::CAPABILITY_SIZE,
  utils::align_up,
};

/// Keeps track of the allocated cells of a single call frame.
///
/// Cells are handed out downwards from the frame base and are never reused. The
/// first cell always holds the caller's frame capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  allocated_byte_size: i64,
}

impl Frame {
  pub fn new() -> Self {
    let mut frame = Frame {
      allocated_byte_size: 0,
    };
    frame.allocate(DataType::Cap); // caller's frame capability
    frame
  }

  /// A frame whose spill cells stay clear of the frame cells in `declarations`.
  pub fn reserving(declarations: &Declarations) -> Self {
    let mut frame = Frame::new();
    for (cell, _) in declarations.frame_locations() {
      frame.reserve(cell);
    }
    frame
  }

  /// Marks every byte between the frame base and `cell` as taken. Cells with a
  /// non-negative offset belong to the caller and are ignored.
  pub fn reserve(&mut self, cell: FrameLocation) {
    if cell.offset < 0 {
      self.allocated_byte_size = self.allocated_byte_size.max(-cell.offset);
    }
  }

  /// Allocates a fresh, suitably aligned cell for a datum of type `data_type`.
  pub fn allocate(&mut self, data_type: DataType) -> FrameLocation {
    let end = align_up(
      self.allocated_byte_size + data_type.byte_size(),
      data_type.alignment(),
    );
    self.allocated_byte_size = end;
    FrameLocation::new(-end)
  }

  pub fn allocated_byte_size(&self) -> i64 {
    self.allocated_byte_size
  }

  /// The size of the frame as pushed, a multiple of the capability size.
  pub fn byte_size(&self) -> i64 {
    align_up(self.allocated_byte_size, CAPABILITY_SIZE)
  }
}

impl Default for Frame {
  fn default() -> Self {
    Frame::new()
  }
}
