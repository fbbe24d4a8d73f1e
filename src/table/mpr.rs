//! Multipoint relay sets and their selection.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
};

use parking_lot::{Mutex, RwLock};

use crate::{
    core::{node::NodeId, seq::SequenceNumber},
    table::{neighbor::TwoHopPairs, Dirty},
};

/// An ordered set of nodes.
pub type NodeSet = BTreeSet<NodeId>;

/// A node set behind its own lock, with a flag raised on every change.
#[derive(Debug, Default)]
pub struct SharedNodeSet {
    inner: RwLock<NodeSet>,
    changed: Dirty,
}

impl SharedNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.read().contains(&node)
    }

    pub fn insert(&self, node: NodeId) -> bool {
        let inserted = self.inner.write().insert(node);
        if inserted {
            self.changed.raise();
        }

        inserted
    }

    pub fn remove(&self, node: NodeId) -> bool {
        let removed = self.inner.write().remove(&node);
        if removed {
            self.changed.raise();
        }

        removed
    }

    /// Returns a copy of the members.
    pub fn snapshot(&self) -> NodeSet {
        self.inner.read().clone()
    }

    /// Replaces the members, returns `true` if they differ from the previous ones.
    pub fn replace(&self, nodes: NodeSet) -> bool {
        let mut inner = self.inner.write();
        if *inner == nodes {
            return false;
        }

        *inner = nodes;
        self.changed.raise();

        true
    }

    /// Runs a read-modify-write sequence on the members under the write lock, returns `true` if
    /// the members changed.
    pub fn update(&self, f: impl FnOnce(&mut NodeSet)) -> bool {
        let mut inner = self.inner.write();
        let before = inner.clone();
        f(&mut inner);
        if *inner == before {
            return false;
        }

        self.changed.raise();

        true
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn changed(&self) -> &Dirty {
        &self.changed
    }
}

/// The neighbors the local node selected to relay its floods.
pub type MprSet = SharedNodeSet;

/// The neighbors that selected the local node as one of their MPRs.
///
/// The set is advertised in TC messages; the advertised neighbor sequence number moves forward
/// every time the set is observed to have changed.
#[derive(Debug, Default)]
pub struct MprSelectorSet {
    selectors: SharedNodeSet,
    ansn: Mutex<SequenceNumber>,
}

impl MprSelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.selectors.contains(node)
    }

    pub fn snapshot(&self) -> NodeSet {
        self.selectors.snapshot()
    }

    pub fn replace(&self, nodes: NodeSet) -> bool {
        self.selectors.replace(nodes)
    }

    pub fn update(&self, f: impl FnOnce(&mut NodeSet)) -> bool {
        self.selectors.update(f)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Returns the selectors to advertise along with their sequence number.
    pub fn advertised(&self) -> (SequenceNumber, NodeSet) {
        let mut ansn = self.ansn.lock();
        if self.selectors.changed().take() {
            *ansn = ansn.next();
        }

        (*ansn, self.selectors.snapshot())
    }
}

/// Removes the nodes that aren't in `keep`, returns how many were removed.
pub fn prune(set: &mut NodeSet, keep: &NodeSet) -> usize {
    let before = set.len();
    set.retain(|node| keep.contains(node));
    before - set.len()
}

/// Selects the MPRs among the symmetric neighbors using the greedy coverage heuristic.
///
/// Neighbors that are the only path to some 2-hop neighbor are selected first; after that the
/// neighbor covering the most still uncovered 2-hop neighbors is added until every 2-hop neighbor
/// is covered. Ties go to the neighbor with the larger total degree, then to the lowest
/// identifier.
pub fn select_mprs(local: NodeId, symmetric: &NodeSet, pairs: &TwoHopPairs) -> NodeSet {
    // The 2-hop neighbors each symmetric neighbor covers.
    let mut coverage: BTreeMap<NodeId, NodeSet> = BTreeMap::new();
    for &(neighbor, two_hop) in pairs {
        if !symmetric.contains(&neighbor) || two_hop == local || symmetric.contains(&two_hop) {
            continue;
        }

        coverage.entry(neighbor).or_default().insert(two_hop);
    }

    let mut coverers: BTreeMap<NodeId, NodeSet> = BTreeMap::new();
    for (&neighbor, covered) in &coverage {
        for &two_hop in covered {
            coverers.entry(two_hop).or_default().insert(neighbor);
        }
    }

    let mut mprs: NodeSet = coverers
        .values()
        .filter(|via| via.len() == 1)
        .flat_map(|via| via.iter().copied())
        .collect();

    let mut uncovered: NodeSet = coverers.keys().copied().collect();
    for mpr in &mprs {
        for two_hop in &coverage[mpr] {
            uncovered.remove(two_hop);
        }
    }

    while !uncovered.is_empty() {
        let best = coverage
            .iter()
            .filter(|(neighbor, _)| !mprs.contains(*neighbor))
            .map(|(&neighbor, covered)| {
                let reach = covered.intersection(&uncovered).count();
                (reach, covered.len(), Reverse(neighbor))
            })
            .filter(|&(reach, _, _)| reach > 0)
            .max();

        // Every uncovered node has a coverer, so a candidate always exists.
        let Some((_, _, Reverse(neighbor))) = best else {
            break;
        };

        for two_hop in &coverage[&neighbor] {
            uncovered.remove(two_hop);
        }
        mprs.insert(neighbor);
    }

    mprs
}
