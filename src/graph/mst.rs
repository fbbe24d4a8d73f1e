//! Minimum spanning trees over contracted graphs.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::{NetworkGraph, Weight};
use crate::{
    core::{error::GraphError, node::NodeId},
    table::mpr::NodeSet,
};

/// Tentative distance of a node no edge has reached yet.
const INFINITY: Weight = Weight::MAX;

/// An undirected tree spanning a set of nodes, rooted where it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanningTree {
    root: NodeId,
    // child -> (parent, weight of the connecting edge)
    parents: BTreeMap<NodeId, (NodeId, Weight)>,
    adjacency: BTreeMap<NodeId, NodeSet>,
}

impl SpanningTree {
    /// A tree made of the root alone.
    pub fn singleton(root: NodeId) -> Self {
        Self {
            root,
            parents: BTreeMap::new(),
            adjacency: BTreeMap::from([(root, NodeSet::new())]),
        }
    }

    /// A one-hop star: every node hangs directly off the root.
    pub fn star(root: NodeId, nodes: &NodeSet) -> Self {
        let mut tree = Self::singleton(root);
        for &node in nodes {
            if node != root {
                tree.attach(node, root, 1);
            }
        }

        tree
    }

    fn attach(&mut self, child: NodeId, parent: NodeId, weight: Weight) {
        self.parents.insert(child, (parent, weight));
        self.adjacency.entry(parent).or_default().insert(child);
        self.adjacency.entry(child).or_default().insert(parent);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn nodes(&self) -> NodeSet {
        self.adjacency.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Every tree edge as `(parent, child, weight)`.
    pub fn edges(&self) -> Vec<(NodeId, NodeId, Weight)> {
        self.parents
            .iter()
            .map(|(&child, &(parent, weight))| (parent, child, weight))
            .collect()
    }

    pub fn total_weight(&self) -> u64 {
        self.parents
            .values()
            .map(|&(_, weight)| u64::from(weight))
            .sum()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).map(|&(parent, _)| parent)
    }

    /// The nodes sharing a tree edge with `node`.
    pub fn tree_neighbors(&self, node: NodeId) -> NodeSet {
        self.adjacency.get(&node).cloned().unwrap_or_default()
    }

    /// The nodes reached through `via` when coming from `from`, `via` included.
    ///
    /// `via` must be a tree neighbor of `from`; otherwise the branch is empty.
    pub fn branch(&self, from: NodeId, via: NodeId) -> NodeSet {
        let mut branch = NodeSet::new();
        if !self.tree_neighbors(from).contains(&via) {
            return branch;
        }

        branch.insert(via);
        let mut queue = VecDeque::from([via]);
        while let Some(node) = queue.pop_front() {
            for &next in self.adjacency.get(&node).into_iter().flatten() {
                if next != from && branch.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        branch
    }

    /// The tree path between two nodes, both ends included.
    pub fn path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }

        let mut previous: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == to {
                break;
            }
            for &next in self.adjacency.get(&node).into_iter().flatten() {
                if next != from && !previous.contains_key(&next) {
                    previous.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        let mut path = vec![to];
        let mut node = to;
        while node != from {
            node = *previous.get(&node)?;
            path.push(node);
        }
        path.reverse();

        Some(path)
    }
}

/// Computes a minimum spanning tree of the graph with Prim's algorithm, edges are treated as
/// undirected using the cheaper direction.
///
/// Fails with [`GraphError::Disconnected`] if some node can't be reached from the root; callers
/// fall back to [`SpanningTree::star`].
pub fn compute_minimum_spanning_tree(
    graph: &NetworkGraph,
    root: NodeId,
) -> Result<SpanningTree, GraphError> {
    if !graph.contains_node(root) {
        return Err(GraphError::MissingRoot);
    }

    let total = graph.node_count();
    let mut tree = SpanningTree::singleton(root);
    let mut distance: BTreeMap<NodeId, (Weight, Option<NodeId>)> = graph
        .nodes()
        .iter()
        .map(|&node| (node, (INFINITY, None)))
        .collect();
    distance.insert(root, (0, None));

    while !distance.is_empty() {
        // Ties go to the lowest identifier as the map is ordered.
        let Some((&node, &(dist, parent))) = distance
            .iter()
            .min_by_key(|&(&node, &(dist, _))| (dist, node))
        else {
            break;
        };

        if dist == INFINITY {
            return Err(GraphError::Disconnected {
                reached: total - distance.len(),
                total,
            });
        }

        distance.remove(&node);
        if let Some(parent) = parent {
            tree.attach(node, parent, dist);
        }

        for next in graph.neighbors(node) {
            let Some(entry) = distance.get_mut(&next) else {
                continue;
            };
            let Some(weight) = graph.undirected_weight(node, next) else {
                continue;
            };

            if weight < entry.0 {
                *entry = (weight, Some(node));
            }
        }
    }

    Ok(tree)
}
