//! The topology graph used to build multicast overlays, and its contraction to group members.

use std::{net::Ipv4Addr, sync::Arc};

use parking_lot::Mutex;
use tracing::trace;

use super::{NetworkGraph, UNIT_WEIGHT};
use crate::{
    core::node::NodeId,
    table::{
        mpr::NodeSet, multicast::MulticastGroupsTable, neighbor::TwoHopPairs,
        topology::TopologyKey,
    },
};

/// Builds the graph of everything the local node can reach: its links to symmetric neighbors,
/// their links to 2-hop neighbors and the advertised topology. Links are symmetric so every edge
/// is added in both directions.
pub fn build_multicast_graph(
    local: NodeId,
    symmetric: &NodeSet,
    pairs: &TwoHopPairs,
    topology: &[TopologyKey],
) -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph.add_node(local);

    for &neighbor in symmetric {
        graph.connect(local, neighbor, UNIT_WEIGHT);
    }
    for &(neighbor, two_hop) in pairs {
        if symmetric.contains(&neighbor) {
            graph.connect(neighbor, two_hop, UNIT_WEIGHT);
        }
    }
    for &(originator, advertised) in topology {
        graph.connect(originator, advertised, UNIT_WEIGHT);
    }

    graph.restricted_to(&graph.reachable_from(local))
}

/// Collapses every node not in `keep` into direct edges between the nodes around it.
///
/// Weights are reset to [`UNIT_WEIGHT`] first, so the weight of a resulting edge is the number of
/// hops it stands for.
pub fn contract(graph: &NetworkGraph, keep: &NodeSet) -> NetworkGraph {
    let mut contracted = graph.with_unit_weights();
    let removed: Vec<NodeId> = contracted
        .nodes()
        .iter()
        .filter(|node| !keep.contains(*node))
        .copied()
        .collect();

    for node in removed {
        let sources: Vec<(NodeId, u32)> = contracted
            .predecessors(node)
            .filter_map(|from| contracted.weight(from, node).map(|weight| (from, weight)))
            .collect();
        let targets: Vec<(NodeId, u32)> = contracted.successors(node).collect();

        for &(from, inbound) in &sources {
            for &(to, outbound) in &targets {
                if from != to {
                    contracted.add_edge_if_cheaper(from, to, inbound.saturating_add(outbound));
                }
            }
        }

        contracted.remove_node(node);
    }

    contracted
}

/// Owns the raw multicast graph and derives per-group contracted graphs from it.
#[derive(Debug)]
pub struct MulticastGraphController {
    local: NodeId,
    groups: Arc<MulticastGroupsTable>,
    graph: Mutex<NetworkGraph>,
}

impl MulticastGraphController {
    pub fn new(local: NodeId, groups: Arc<MulticastGroupsTable>) -> Self {
        let mut graph = NetworkGraph::new();
        graph.add_node(local);

        Self {
            local,
            groups,
            graph: Mutex::new(graph),
        }
    }

    /// Rebuilds the raw graph from the current tables.
    pub fn rebuild(&self, symmetric: &NodeSet, pairs: &TwoHopPairs, topology: &[TopologyKey]) {
        let graph = build_multicast_graph(self.local, symmetric, pairs, topology);
        trace!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "multicast graph rebuilt"
        );

        *self.graph.lock() = graph;
    }

    /// Returns a copy of the raw graph.
    pub fn snapshot(&self) -> NetworkGraph {
        self.graph.lock().snapshot()
    }

    /// Returns the graph reduced to the group's members and the local node, with unit weights
    /// summed along the collapsed paths.
    pub fn compute_contracted_graph(&self, group: Ipv4Addr) -> NetworkGraph {
        let mut keep = self.groups.group_members(group);
        keep.insert(self.local);

        let graph = self.graph.lock();
        contract(&graph, &keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::NodeArena;

    fn setup(n: u8) -> (NodeArena, Vec<NodeId>) {
        let arena = NodeArena::new();
        let ids = (0..n)
            .map(|i| arena.intern(Ipv4Addr::new(10, 0, 0, i)))
            .collect();

        (arena, ids)
    }

    fn group() -> Ipv4Addr {
        Ipv4Addr::new(224, 0, 0, 1)
    }

    #[test]
    fn graph_from_tables() {
        let (_arena, n) = setup(6);
        let symmetric: NodeSet = [n[1]].into_iter().collect();
        let pairs: TwoHopPairs = [(n[1], n[2]), (n[4], n[5])].into_iter().collect();
        let topology = vec![(n[2], n[3]), (n[4], n[5])];

        let graph = build_multicast_graph(n[0], &symmetric, &pairs, &topology);

        // 4 and 5 aren't reachable from the local node.
        assert_eq!(
            *graph.nodes(),
            [n[0], n[1], n[2], n[3]].into_iter().collect::<NodeSet>()
        );
        assert_eq!(graph.weight(n[3], n[2]), Some(UNIT_WEIGHT));
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn contraction_of_members_only_is_identity() {
        let (_arena, n) = setup(3);
        let mut graph = NetworkGraph::new();
        graph.connect(n[0], n[1], 1);
        graph.connect(n[1], n[2], 1);

        let keep: NodeSet = n.iter().copied().collect();
        assert_eq!(contract(&graph, &keep), graph);
    }

    #[test]
    fn contraction_sums_hops() {
        // 0 - 1 - 2 - 3, with 1 and 2 not members.
        let (_arena, n) = setup(4);
        let mut graph = NetworkGraph::new();
        graph.connect(n[0], n[1], 9);
        graph.connect(n[1], n[2], 9);
        graph.connect(n[2], n[3], 9);

        let contracted = contract(&graph, &[n[0], n[3]].into_iter().collect());
        assert_eq!(contracted.node_count(), 2);
        assert_eq!(contracted.weight(n[0], n[3]), Some(3));
        assert_eq!(contracted.weight(n[3], n[0]), Some(3));
    }

    #[test]
    fn contraction_keeps_cheapest_path() {
        // 0 - 1 - 3 and 0 - 2 - 4 - 3, only 0 and 3 are members.
        let (_arena, n) = setup(5);
        let mut graph = NetworkGraph::new();
        graph.connect(n[0], n[1], 1);
        graph.connect(n[1], n[3], 1);
        graph.connect(n[0], n[2], 1);
        graph.connect(n[2], n[4], 1);
        graph.connect(n[4], n[3], 1);

        let contracted = contract(&graph, &[n[0], n[3]].into_iter().collect());
        assert_eq!(contracted.weight(n[0], n[3]), Some(2));
        assert_eq!(contracted.edge_count(), 2);
    }

    #[test]
    fn controller_contracts_per_group() {
        let (_arena, n) = setup(4);
        let groups = Arc::new(MulticastGroupsTable::new());
        groups.register(n[3], group());

        let controller = MulticastGraphController::new(n[0], groups.clone());
        let symmetric: NodeSet = [n[1]].into_iter().collect();
        let pairs: TwoHopPairs = [(n[1], n[2])].into_iter().collect();
        controller.rebuild(&symmetric, &pairs, &[(n[2], n[3])]);

        let contracted = controller.compute_contracted_graph(group());
        assert_eq!(
            *contracted.nodes(),
            [n[0], n[3]].into_iter().collect::<NodeSet>()
        );
        assert_eq!(contracted.weight(n[0], n[3]), Some(3));

        // The raw graph is untouched by contraction.
        assert_eq!(controller.snapshot().node_count(), 4);
    }
}
