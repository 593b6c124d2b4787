use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ala::Location, utils::Graph};

/// An unordered pair of conflicting locations, stored with `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Conflict {
  pub first: Location,
  pub second: Location,
}

impl Conflict {
  pub fn new(a: Location, b: Location) -> Self {
    if a <= b {
      Conflict {
        first: a,
        second: b,
      }
    } else {
      Conflict {
        first: b,
        second: a,
      }
    }
  }
}

/// Locations that may hold different values on some execution path are
/// connected, i.e. they *conflict*.
///
/// Physical locations always conflict with every other physical location. Those
/// conflicts are never stored, they are encoded in `contains`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Conflict>", into = "Vec<Conflict>")]
pub struct ConflictGraph {
  graph: Graph<Location>,
}

impl ConflictGraph {
  pub fn new() -> Self {
    ConflictGraph::default()
  }

  /// Adds a conflict between `a` and `b`.
  ///
  /// Does nothing if they are equal or both physical.
  pub fn insert(&mut self, a: Location, b: Location) {
    if a == b || (a.is_physical() && b.is_physical()) {
      return;
    }
    self.graph.add_graph_edge(a, b);
  }

  pub fn insert_between<'a>(
    &mut self,
    location: &Location,
    others: impl IntoIterator<Item = &'a Location>,
  ) {
    for other in others {
      self.insert(location.clone(), other.clone());
    }
  }

  /// Whether `location` conflicts with any location of `others`.
  pub fn contains<'a>(
    &self,
    location: &Location,
    others: impl IntoIterator<Item = &'a Location>,
  ) -> bool {
    let neighbors = self.graph.neighbors(location);
    others.into_iter().any(|other| {
      if other == location {
        return false;
      }
      if location.is_physical() && other.is_physical() {
        return true;
      }
      neighbors.map_or(false, |neighs| neighs.contains(other))
    })
  }

  pub fn form_union(&mut self, other: &ConflictGraph) {
    self.graph.form_union(&other.graph);
  }

  /// Whether the copy between `a` and `b` can be eliminated by merging them
  /// without making a `k`-colourable graph uncolourable.
  ///
  /// Conservative test of Briggs et al.: the merged node must have fewer than `k`
  /// conflicting locations.
  pub fn safely_coalescable(&self, a: &Location, b: &Location, k: usize) -> bool {
    if self.contains(a, std::iter::once(b)) {
      return false;
    }
    let mut union: BTreeSet<&Location> = BTreeSet::new();
    for loc in [a, b].iter() {
      if let Some(neighs) = self.graph.neighbors(loc) {
        union.extend(neighs.iter());
      }
    }
    union.remove(a);
    union.remove(b);
    union.len() < k
  }

  /// Number of stored conflicts of `location`.
  pub fn degree(&self, location: &Location) -> usize {
    self.graph.degree(location)
  }

  pub fn neighbors(&self, location: &Location) -> impl Iterator<Item = &Location> {
    self.graph.neighbors(location).into_iter().flatten()
  }

  /// Every location with at least one stored conflict, by increasing degree.
  /// Ties are broken by the canonical location order.
  pub fn locations_ordered_by_increasing_degree(&self) -> Vec<Location> {
    let mut locations: Vec<&Location> = self.graph.nodes().collect();
    // stable sort over already ordered nodes
    locations.sort_by_key(|loc| self.graph.degree(loc));
    locations.into_iter().cloned().collect()
  }

  /// The stored conflicts, sorted.
  pub fn conflicts(&self) -> Vec<Conflict> {
    self
      .graph
      .edges()
      .into_iter()
      .map(|(first, second)| Conflict { first, second })
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.is_empty()
  }
}

impl From<Vec<Conflict>> for ConflictGraph {
  fn from(conflicts: Vec<Conflict>) -> Self {
    let mut graph = ConflictGraph::new();
    for conflict in conflicts {
      graph.insert(conflict.first, conflict.second);
    }
    graph
  }
}

impl From<ConflictGraph> for Vec<Conflict> {
  fn from(graph: ConflictGraph) -> Self {
    graph.conflicts()
  }
}
