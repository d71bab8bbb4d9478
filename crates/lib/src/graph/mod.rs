//! Artifact dependency graph.
//!
//! Built from the resolved artifacts each run, checked for cycles before any
//! compile work starts, and then used to order artifacts dependencies-first.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::resolve::ResolvedArtifacts;

#[derive(Debug, Error)]
pub enum GraphError {
  /// The full loop, first node repeated at the end.
  #[error("dependency cycle: {}", cycle.join(" -> "))]
  Cycle { cycle: Vec<String> },

  #[error("artifact '{artifact}' depends on unknown artifact '{dependency}'")]
  UnknownDependency { artifact: String, dependency: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  White,
  Grey,
  Black,
}

/// Dependency graph over artifact names. Edges point from an artifact to
/// each of its dependencies.
#[derive(Debug)]
pub struct ArtifactGraph {
  graph: DiGraph<String, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl ArtifactGraph {
  /// Build the graph. Every dependency must name a resolved artifact.
  pub fn new(resolved: &ResolvedArtifacts) -> Result<Self, GraphError> {
    Self::from_edges(
      resolved
        .artifacts
        .iter()
        .map(|artifact| (artifact.name.as_str(), artifact.dependencies.as_slice())),
    )
  }

  /// Build a graph from `(name, dependencies)` pairs. Node order follows the
  /// iteration order.
  pub fn from_edges<'a, I>(entries: I) -> Result<Self, GraphError>
  where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
  {
    let entries: Vec<_> = entries.into_iter().collect();
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for (name, _) in &entries {
      let idx = graph.add_node(name.to_string());
      nodes.insert(name.to_string(), idx);
    }

    for (name, dependencies) in &entries {
      let from = nodes[*name];
      for dependency in dependencies.iter() {
        let to = *nodes.get(dependency).ok_or_else(|| GraphError::UnknownDependency {
          artifact: name.to_string(),
          dependency: dependency.clone(),
        })?;
        graph.add_edge(from, to, ());
      }
    }

    Ok(Self { graph, nodes })
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Fail with the first cycle found.
  ///
  /// Roots are visited in insertion order and dependencies in declaration
  /// order, so the same graph always reports the same cycle.
  pub fn check_acyclic(&self) -> Result<(), GraphError> {
    let mut marks = vec![Mark::White; self.graph.node_count()];
    let mut path: Vec<NodeIndex> = Vec::new();

    for root in self.graph.node_indices() {
      if marks[root.index()] == Mark::White
        && let Some(cycle) = self.visit(root, &mut marks, &mut path)
      {
        return Err(GraphError::Cycle { cycle });
      }
    }

    Ok(())
  }

  fn visit(&self, node: NodeIndex, marks: &mut [Mark], path: &mut Vec<NodeIndex>) -> Option<Vec<String>> {
    marks[node.index()] = Mark::Grey;
    path.push(node);

    for next in self.dependencies_of(node) {
      match marks[next.index()] {
        Mark::Grey => {
          let start = path.iter().position(|n| *n == next).unwrap_or(0);
          let mut cycle: Vec<String> = path[start..].iter().map(|n| self.graph[*n].clone()).collect();
          cycle.push(self.graph[next].clone());
          return Some(cycle);
        }
        Mark::White => {
          if let Some(cycle) = self.visit(next, marks, path) {
            return Some(cycle);
          }
        }
        Mark::Black => {}
      }
    }

    path.pop();
    marks[node.index()] = Mark::Black;
    None
  }

  /// Outgoing neighbours in the order the edges were added.
  fn dependencies_of(&self, node: NodeIndex) -> Vec<NodeIndex> {
    // petgraph iterates edges newest first
    let mut deps: Vec<NodeIndex> = self.graph.neighbors(node).collect();
    deps.reverse();
    deps
  }

  /// Artifact names with every dependency before its dependents.
  ///
  /// Independent artifacts keep their insertion order.
  pub fn dependency_order(&self) -> Result<Vec<String>, GraphError> {
    self.check_acyclic()?;

    let mut visited = vec![false; self.graph.node_count()];
    let mut order = Vec::with_capacity(self.graph.node_count());
    for root in self.graph.node_indices() {
      self.post_order(root, &mut visited, &mut order);
    }

    Ok(order.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  fn post_order(&self, node: NodeIndex, visited: &mut [bool], order: &mut Vec<NodeIndex>) {
    if visited[node.index()] {
      return;
    }
    visited[node.index()] = true;
    for next in self.dependencies_of(node) {
      self.post_order(next, visited, order);
    }
    order.push(node);
  }

  pub fn contains(&self, name: &str) -> bool {
    self.nodes.contains_key(name)
  }
}
