use std::{collections::BTreeMap, net::Ipv4Addr};

use tracing::warn;

use super::headers_for_source;
use crate::{
    core::node::{NodeArena, NodeId},
    graph::mst::SpanningTree,
    message::{DataMessage, ForwardingHeader},
    table::mpr::NodeSet,
};

/// How a relay splits the nodes it is responsible for.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Tree neighbors to forward to, each with the pending nodes of its branch.
    pub direct: BTreeMap<NodeId, NodeSet>,
    /// Pending nodes the tree can't deliver to, they are sent a copy directly.
    pub fallback: NodeSet,
}

impl Partition {
    /// Splits `pending` along the tree as seen from `local`.
    pub fn compute(tree: &SpanningTree, local: NodeId, pending: &NodeSet) -> Self {
        let mut partition = Self::default();
        let mut covered = NodeSet::new();

        for neighbor in tree.tree_neighbors(local) {
            if !pending.contains(&neighbor) {
                continue;
            }

            let mut branch: NodeSet = tree
                .branch(local, neighbor)
                .intersection(pending)
                .copied()
                .collect();
            covered.extend(branch.iter().copied());
            branch.remove(&neighbor);

            partition.direct.insert(neighbor, branch);
        }

        partition.fallback = pending
            .iter()
            .filter(|&&node| node != local && !covered.contains(&node))
            .copied()
            .collect();

        partition
    }
}

/// Turns multicast payloads into per-recipient copies carrying forwarding headers.
#[derive(Debug, Clone, Copy)]
pub struct ForwardingHandler<'a> {
    arena: &'a NodeArena,
    local: NodeId,
}

impl<'a> ForwardingHandler<'a> {
    pub fn new(arena: &'a NodeArena, local: NodeId) -> Self {
        Self { arena, local }
    }

    // The header only carries the recipient's own entry, and only if it has anything to relay.
    fn copy_for(
        &self,
        message: &DataMessage,
        recipient: NodeId,
        responsible: &NodeSet,
    ) -> Option<(Ipv4Addr, DataMessage)> {
        let addr = self.arena.addr(recipient)?;

        let mut header = ForwardingHeader::new();
        if !responsible.is_empty() {
            header.insert(addr, self.arena.addrs(responsible).into_iter().collect());
        }

        Some((addr, message.with_header(header)))
    }

    /// The copies a source sends: one per tree neighbor, one per member in its grace period and
    /// one to the local node itself.
    pub fn outbound(
        &self,
        tree: &SpanningTree,
        grace: &NodeSet,
        message: &DataMessage,
    ) -> Vec<(Ipv4Addr, DataMessage)> {
        let mut copies: Vec<_> = headers_for_source(tree, self.local)
            .iter()
            .filter_map(|(&neighbor, responsible)| self.copy_for(message, neighbor, responsible))
            .collect();

        for &node in grace {
            if node != self.local && !tree.contains(node) {
                copies.extend(self.copy_for(message, node, &NodeSet::new()));
            }
        }

        copies.extend(self.copy_for(message, self.local, &NodeSet::new()));

        copies
    }

    /// The copies a relay sends on for the nodes the inbound header assigned to it.
    pub fn relay(
        &self,
        tree: &SpanningTree,
        message: &DataMessage,
    ) -> Vec<(Ipv4Addr, DataMessage)> {
        let Some(local_addr) = self.arena.addr(self.local) else {
            return Vec::new();
        };

        let pending: NodeSet = message
            .responsibilities(local_addr)
            .into_iter()
            .map(|addr| self.arena.intern(addr))
            .filter(|&node| node != self.local)
            .collect();
        if pending.is_empty() {
            return Vec::new();
        }

        let partition = Partition::compute(tree, self.local, &pending);

        let mut copies: Vec<_> = partition
            .direct
            .iter()
            .filter_map(|(&neighbor, responsible)| self.copy_for(message, neighbor, responsible))
            .collect();

        for &node in &partition.fallback {
            if let Some(copy) = self.copy_for(message, node, &NodeSet::new()) {
                warn!(
                    group = %message.group,
                    to = %copy.0,
                    "overlay tree lags membership, sending directly"
                );
                copies.push(copy);
            }
        }

        copies
    }
}
