use std::collections::{BTreeMap, BTreeSet};

/// Graph structure:
/// A map from each node to the set of nodes connected to it.
///
/// Ordered collections keep every traversal deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Graph<T: Ord>(BTreeMap<T, BTreeSet<T>>);

impl<T: Ord> Default for Graph<T> {
  fn default() -> Self {
    Graph(BTreeMap::new())
  }
}

impl<T: Ord + Clone> Graph<T> {
  pub fn new() -> Self {
    Graph::default()
  }

  /// Return the neighbors of a node
  ///
  /// # Return
  /// If the node does not exist, return None
  pub fn neighbors(&self, node: &T) -> Option<&BTreeSet<T>> {
    self.0.get(node)
  }

  /// Number of neighbors of a node, zero if it does not exist.
  pub fn degree(&self, node: &T) -> usize {
    self.0.get(node).map_or(0, BTreeSet::len)
  }

  pub fn contains(&self, node: &T) -> bool {
    self.0.contains_key(node)
  }

  /// Iterate over all nodes in ascending order
  pub fn nodes(&self) -> impl Iterator<Item = &T> {
    self.0.keys()
  }

  /// Add an edge between two nodes, i.e. node1 and node2
  pub fn add_graph_edge(&mut self, node1: T, node2: T) {
    self
      .0
      .entry(node1.clone())
      .or_default()
      .insert(node2.clone());
    self.0.entry(node2).or_default().insert(node1);
  }

  /// Add all edges of `other` into `self`
  pub fn form_union(&mut self, other: &Graph<T>) {
    for (node, neighbors) in other.0.iter() {
      self
        .0
        .entry(node.clone())
        .or_default()
        .extend(neighbors.iter().cloned());
    }
  }

  /// Every edge once, as `(smaller, larger)` pairs in ascending order
  pub fn edges(&self) -> Vec<(T, T)> {
    self
      .0
      .iter()
      .flat_map(|(node, neighbors)| {
        neighbors
          .iter()
          .filter(move |neigh| node < *neigh)
          .map(move |neigh| (node.clone(), neigh.clone()))
      })
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_edges_are_symmetric() {
    let mut graph = Graph::new();
    graph.add_graph_edge(1, 2);
    graph.add_graph_edge(2, 3);

    assert!(graph.neighbors(&1).unwrap().contains(&2));
    assert!(graph.neighbors(&2).unwrap().contains(&1));
    assert_eq!(graph.degree(&2), 2);
    assert_eq!(graph.degree(&4), 0);
    assert_eq!(graph.edges(), vec![(1, 2), (2, 3)]);
  }

  #[test]
  fn test_form_union() {
    let mut g1 = Graph::new();
    g1.add_graph_edge(0, 1);
    let mut g2 = Graph::new();
    g2.add_graph_edge(1, 2);
    g2.add_graph_edge(0, 1);

    g1.form_union(&g2);
    assert_eq!(g1.edges(), vec![(0, 1), (1, 2)]);
    assert_eq!(g1.nodes().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
  }
}
