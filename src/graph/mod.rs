//! Directed weighted graphs over node identifiers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{core::node::NodeId, table::mpr::NodeSet};

pub mod mst;
pub mod multicast;

pub type Weight = u32;

/// The weight of a single hop.
pub const UNIT_WEIGHT: Weight = 1;

/// A directed weighted graph.
///
/// The node set, the outgoing edge lists and the incoming adjacency index are updated together by
/// every mutation so they always agree. Sharing is the owner's business: wrap the graph in a lock
/// or publish immutable snapshots of it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NetworkGraph {
    nodes: NodeSet,
    out_edges: BTreeMap<NodeId, BTreeMap<NodeId, Weight>>,
    in_edges: BTreeMap<NodeId, NodeSet>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an independent copy of the graph.
    pub fn snapshot(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            out_edges: self.out_edges.clone(),
            in_edges: self.in_edges.clone(),
        }
    }

    /// Builds a copy of the graph where every edge weighs [`UNIT_WEIGHT`].
    pub fn with_unit_weights(&self) -> Self {
        let mut graph = self.snapshot();
        for targets in graph.out_edges.values_mut() {
            for weight in targets.values_mut() {
                *weight = UNIT_WEIGHT;
            }
        }

        graph
    }

    /// Builds the subgraph induced by the nodes in `keep`.
    pub fn restricted_to(&self, keep: &NodeSet) -> Self {
        let mut graph = Self::new();
        for &node in self.nodes.intersection(keep) {
            graph.add_node(node);
        }
        for (from, to, weight) in self.edges() {
            if keep.contains(&from) && keep.contains(&to) {
                graph.add_edge(from, to, weight);
            }
        }

        graph
    }

    pub fn add_node(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Removes the node along with every edge touching it.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if !self.nodes.remove(&node) {
            return false;
        }

        if let Some(targets) = self.out_edges.remove(&node) {
            for to in targets.keys() {
                if let Some(sources) = self.in_edges.get_mut(to) {
                    sources.remove(&node);
                }
            }
        }

        if let Some(sources) = self.in_edges.remove(&node) {
            for from in sources {
                if let Some(targets) = self.out_edges.get_mut(&from) {
                    targets.remove(&node);
                }
            }
        }

        true
    }

    /// Adds or replaces an edge, adding missing endpoints. Self loops are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: Weight) {
        if from == to {
            return;
        }

        self.nodes.insert(from);
        self.nodes.insert(to);
        self.out_edges.entry(from).or_default().insert(to, weight);
        self.in_edges.entry(to).or_default().insert(from);
    }

    /// Adds an edge in both directions.
    pub fn connect(&mut self, a: NodeId, b: NodeId, weight: Weight) {
        self.add_edge(a, b, weight);
        self.add_edge(b, a, weight);
    }

    /// Adds the edge unless an edge at most as heavy already exists, returns whether the graph
    /// changed.
    pub fn add_edge_if_cheaper(&mut self, from: NodeId, to: NodeId, weight: Weight) -> bool {
        match self.weight(from, to) {
            Some(current) if current <= weight => false,
            _ if from == to => false,
            _ => {
                self.add_edge(from, to, weight);
                true
            }
        }
    }

    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Option<Weight> {
        let weight = self.out_edges.get_mut(&from)?.remove(&to)?;
        if let Some(sources) = self.in_edges.get_mut(&to) {
            sources.remove(&from);
        }

        Some(weight)
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<Weight> {
        self.out_edges.get(&from)?.get(&to).copied()
    }

    /// The cheaper of the two directions between `a` and `b`.
    pub fn undirected_weight(&self, a: NodeId, b: NodeId) -> Option<Weight> {
        match (self.weight(a, b), self.weight(b, a)) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        }
    }

    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, Weight)> + '_ {
        self.out_edges
            .get(&node)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(&to, &weight)| (to, weight)))
    }

    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.in_edges
            .get(&node)
            .into_iter()
            .flat_map(|sources| sources.iter().copied())
    }

    /// Nodes adjacent in either direction.
    pub fn neighbors(&self, node: NodeId) -> NodeSet {
        self.successors(node)
            .map(|(to, _)| to)
            .chain(self.predecessors(node))
            .collect()
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Every edge as `(from, to, weight)`, ordered.
    pub fn edges(&self) -> Vec<(NodeId, NodeId, Weight)> {
        self.out_edges
            .iter()
            .flat_map(|(&from, targets)| targets.iter().map(move |(&to, &weight)| (from, to, weight)))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(BTreeMap::len).sum()
    }

    /// The nodes reachable from `root` along directed edges, `root` included if present.
    pub fn reachable_from(&self, root: NodeId) -> NodeSet {
        let mut reached = NodeSet::new();
        if !self.contains_node(root) {
            return reached;
        }

        let mut queue = VecDeque::from([root]);
        reached.insert(root);
        while let Some(node) = queue.pop_front() {
            for (next, _) in self.successors(node) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        reached
    }

    /// Returns `true` if every node can reach every other ignoring edge direction.
    pub fn is_weakly_connected(&self) -> bool {
        let Some(&start) = self.nodes.iter().next() else {
            return true;
        };

        let mut reached = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.neighbors(node) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        reached.len() == self.nodes.len()
    }
}
