//! Per-group multicast overlays.
//!
//! Each group the local node knows about gets an [`OmolsrData`]: the contracted group graph, the
//! minimum spanning tree rooted at the local node and the members that recently left. Both the
//! graph and the tree are rebuilt from scratch and swapped in, readers never wait on a rebuild.

use std::{collections::BTreeMap, net::Ipv4Addr, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{
    core::node::{Bandwidth, NodeArena, NodeId},
    graph::{
        mst::{compute_minimum_spanning_tree, SpanningTree},
        NetworkGraph,
    },
    table::mpr::NodeSet,
};

mod forwarding;

pub use forwarding::{ForwardingHandler, Partition};

/// Maps each tree neighbor of a node to the rest of the subtree behind it.
pub type Headers = BTreeMap<NodeId, NodeSet>;

/// For each tree neighbor of `source`, the nodes that neighbor is responsible for relaying to:
/// its whole branch minus itself.
pub fn headers_for_source(tree: &SpanningTree, source: NodeId) -> Headers {
    tree.tree_neighbors(source)
        .into_iter()
        .map(|neighbor| {
            let mut branch = tree.branch(source, neighbor);
            branch.remove(&neighbor);
            (neighbor, branch)
        })
        .collect()
}

/// Group members that left recently and still receive traffic for a number of ticks.
#[derive(Debug, Default)]
pub struct TemporalNodes {
    remaining: Mutex<BTreeMap<NodeId, u32>>,
}

impl TemporalNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the grace period of a node, an already running one is restarted.
    pub fn insert(&self, node: NodeId, ticks: u32) {
        if ticks > 0 {
            self.remaining.lock().insert(node, ticks);
        }
    }

    /// Ends the grace period early, e.g. because the node rejoined.
    pub fn remove(&self, node: NodeId) -> bool {
        self.remaining.lock().remove(&node).is_some()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.remaining.lock().contains_key(&node)
    }

    /// Counts one tick down and drops the nodes whose grace period is over, returning them.
    pub fn tick(&self) -> NodeSet {
        let mut remaining = self.remaining.lock();
        for ticks in remaining.values_mut() {
            *ticks -= 1;
        }

        let expired: NodeSet = remaining
            .iter()
            .filter(|&(_, &ticks)| ticks == 0)
            .map(|(&node, _)| node)
            .collect();
        remaining.retain(|_, ticks| *ticks > 0);

        expired
    }

    pub fn nodes(&self) -> NodeSet {
        self.remaining.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.remaining.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.lock().is_empty()
    }
}

/// A point-in-time view of an overlay.
#[derive(Debug, Clone)]
pub struct OverlaySnapshot {
    pub graph: Arc<NetworkGraph>,
    pub tree: Arc<SpanningTree>,
}

impl OverlaySnapshot {
    /// The number of tree edges between the tree root and the node.
    pub fn hop_count_to(&self, node: NodeId) -> Option<usize> {
        self.tree
            .path(self.tree.root(), node)
            .map(|path| path.len() - 1)
    }

    /// The smallest bandwidth capacity along the tree path from the root to the node, the root
    /// itself excluded.
    pub fn lowest_bandwidth_on_route_to(
        &self,
        arena: &NodeArena,
        node: NodeId,
    ) -> Option<Bandwidth> {
        self.tree
            .path(self.tree.root(), node)?
            .into_iter()
            .skip(1)
            .filter_map(|hop| arena.bandwidth(hop))
            .reduce(Bandwidth::min)
    }
}

/// The overlay state of a single multicast group.
#[derive(Debug)]
pub struct OmolsrData {
    group: Ipv4Addr,
    local: NodeId,
    grace_ticks: u32,
    graph: ArcSwap<NetworkGraph>,
    tree: ArcSwap<SpanningTree>,
    temporal: TemporalNodes,
}

impl OmolsrData {
    pub fn new(group: Ipv4Addr, local: NodeId, grace_ticks: u32) -> Self {
        let mut graph = NetworkGraph::new();
        graph.add_node(local);

        Self {
            group,
            local,
            grace_ticks,
            graph: ArcSwap::from_pointee(graph),
            tree: ArcSwap::from_pointee(SpanningTree::singleton(local)),
            temporal: TemporalNodes::new(),
        }
    }

    pub fn group(&self) -> Ipv4Addr {
        self.group
    }

    /// Installs a freshly contracted graph and the spanning tree computed from it.
    ///
    /// Members missing from the new tree start their grace period, members back in the tree end
    /// it.
    pub fn update(&self, contracted: NetworkGraph) {
        let tree = match compute_minimum_spanning_tree(&contracted, self.local) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(group = %self.group, error = %e, "falling back to a star overlay");
                let mut nodes = contracted.nodes().clone();
                nodes.insert(self.local);
                SpanningTree::star(self.local, &nodes)
            }
        };

        let previous = self.tree.load();
        for node in previous.nodes() {
            if node != self.local && !tree.contains(node) {
                trace!(group = %self.group, %node, "member left the overlay");
                self.temporal.insert(node, self.grace_ticks);
            }
        }
        for node in tree.nodes() {
            self.temporal.remove(node);
        }

        self.graph.store(Arc::new(contracted));
        self.tree.store(Arc::new(tree));
    }

    /// Advances the grace periods by one tick.
    pub fn tick(&self) -> NodeSet {
        self.temporal.tick()
    }

    pub fn tree(&self) -> Arc<SpanningTree> {
        self.tree.load_full()
    }

    pub fn graph(&self) -> Arc<NetworkGraph> {
        self.graph.load_full()
    }

    /// The members still in their grace period.
    pub fn grace_nodes(&self) -> NodeSet {
        self.temporal.nodes()
    }

    pub fn get_headers_for_source(&self) -> Headers {
        headers_for_source(&self.tree.load(), self.local)
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            graph: self.graph(),
            tree: self.tree(),
        }
    }

    /// Returns `true` once the overlay has neither members besides the local node nor nodes in
    /// their grace period.
    pub fn is_idle(&self) -> bool {
        self.tree.load().len() <= 1 && self.temporal.is_empty()
    }
}
