//! Dependency graph module.
//!
//! The engine never builds its dependency graph up front: edges are
//! discovered while formulas force other stats to resolve. [`DependencyGraph`]
//! records what one recompute discovered, so callers can see which stats
//! feed which and where cycles were cut.

use crate::stat::StatCategory;
use crate::stat_id::StatId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A stat named together with its category.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatRef {
    pub category: StatCategory,
    pub name: StatId,
}

impl StatRef {
    pub fn new(category: StatCategory, name: impl Into<StatId>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for StatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Format a cycle path as a readable string.
pub fn format_cycle_path(path: &[StatRef]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|stat| stat.name.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Dependencies discovered during one recompute.
///
/// Edges run from a dependency to the stat that needed it. Cycles are kept
/// as the resolution path that closed them, e.g. `[a, b, a]`.
///
/// # Examples
///
/// ```rust
/// use statsheet::graph::{DependencyGraph, StatRef};
/// use statsheet::StatCategory;
///
/// let mut graph = DependencyGraph::new();
/// let strength = StatRef::new(StatCategory::Attribute, "strength");
/// let athletics = StatRef::new(StatCategory::Skill, "athletics");
///
/// // athletics depends on strength
/// graph.add_dependency(athletics.clone(), strength.clone());
///
/// assert_eq!(graph.dependencies_of(&athletics), vec![strength.clone()]);
/// assert_eq!(graph.dependents_of(&strength), vec![athletics]);
/// assert!(graph.cyclic_groups().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<StatRef, ()>,
    node_map: HashMap<StatRef, NodeIndex>,
    cycles: Vec<Vec<StatRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it doesn't exist, returning its index.
    pub fn add_node(&mut self, stat: StatRef) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&stat) {
            idx
        } else {
            let idx = self.graph.add_node(stat.clone());
            self.node_map.insert(stat, idx);
            idx
        }
    }

    /// Record that `dependent` needed `dependency`. Repeated edges are kept once.
    pub fn add_dependency(&mut self, dependent: StatRef, dependency: StatRef) {
        let from = self.add_node(dependency);
        let to = self.add_node(dependent);
        self.graph.update_edge(from, to, ());
    }

    /// Record a cycle cut at the re-entered stat.
    pub fn record_cycle(&mut self, path: Vec<StatRef>) {
        self.cycles.push(path);
    }

    /// Cycles in the order they were hit.
    pub fn cycles(&self) -> &[Vec<StatRef>] {
        &self.cycles
    }

    pub fn contains(&self, stat: &StatRef) -> bool {
        self.node_map.contains_key(stat)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Stats that `stat` read while it was computed, sorted.
    pub fn dependencies_of(&self, stat: &StatRef) -> Vec<StatRef> {
        self.neighbors(stat, Direction::Incoming)
    }

    /// Stats that read `stat` while they were computed, sorted.
    pub fn dependents_of(&self, stat: &StatRef) -> Vec<StatRef> {
        self.neighbors(stat, Direction::Outgoing)
    }

    fn neighbors(&self, stat: &StatRef, direction: Direction) -> Vec<StatRef> {
        let Some(&idx) = self.node_map.get(stat) else {
            return Vec::new();
        };
        let mut found: Vec<StatRef> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Strongly connected groups of mutually dependent stats, each sorted.
    ///
    /// A single stat forms a group only if it depends on itself.
    pub fn cyclic_groups(&self) -> Vec<Vec<StatRef>> {
        let mut groups: Vec<Vec<StatRef>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                _ => true,
            })
            .map(|component| {
                let mut group: Vec<StatRef> =
                    component.into_iter().map(|n| self.graph[n].clone()).collect();
                group.sort();
                group
            })
            .collect();
        groups.sort();
        groups
    }
}
