// The module analyses liveness on the effect tree, builds the conflict graph,
// coalesces copies and assigns every abstract location a physical home
mod allocation;
mod coalesce;
mod frame;
mod interference;
mod liveness;

pub use allocation::Assignments;
pub use coalesce::coalesce;
pub use frame::Frame;
pub use interference::{Conflict, ConflictGraph};
pub use liveness::{
  analyse, transform_procedure, update_effect, update_predicate, Analysis, Identity,
  Transformation,
};
