//! Abstract Locations, Analysed: the effect language the allocator works on.
//!
//!   Effects and predicates reference abstract locations as well as registers and
//!   frame cells. After liveness analysis every node carries the analysis at its
//!   entry, see `regalloc::Analysis`.

mod declarations;
mod effect;
mod location;
mod predicate;
mod procedure;
mod source;

pub use declarations::{DataType, Declaration, Declarations};
pub use effect::{Effect, EffectKind};
pub use location::{AbstractLocation, FrameLocation, Location, PhysicalLocation};
pub use predicate::{Predicate, PredicateKind};
pub use procedure::{Procedure, Program};
pub use source::{BinaryOperator, BranchRelation, Label, Source};
