use std::{collections::HashSet, net::Ipv4Addr, sync::Arc};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    core::{
        link::{LinkCode, LinkType, NeighborType},
        node::{NodeArena, NodeId},
        vtime::ValidityTime,
    },
    message::HelloMessage,
    table::{
        expiring::Put,
        mpr::{prune, MprSelectorSet},
        neighbor::{NeighborEntry, NeighborTable},
    },
};

/// Performs link sensing, neighbor detection and MPR selector bookkeeping from HELLO messages.
#[derive(Debug)]
pub struct HelloMessageHandler {
    arena: Arc<NodeArena>,
    neighbors: Arc<NeighborTable>,
    selectors: Arc<MprSelectorSet>,
    lock: Mutex<()>,
}

// The sender's status as seen from the local node, given how the sender lists the local node.
fn status_after(current: NeighborType, local_code: Option<LinkCode>) -> NeighborType {
    match local_code {
        Some(code) if code.link == LinkType::Lost => NeighborType::NotNeigh,
        Some(code) if code.confirms_link() => match current {
            NeighborType::NotNeigh => NeighborType::SymNeigh,
            status => status,
        },
        // The sender no longer hears us.
        _ => NeighborType::NotNeigh,
    }
}

impl HelloMessageHandler {
    pub fn new(
        arena: Arc<NodeArena>,
        neighbors: Arc<NeighborTable>,
        selectors: Arc<MprSelectorSet>,
    ) -> Self {
        Self {
            arena,
            neighbors,
            selectors,
            lock: Mutex::new(()),
        }
    }

    /// Applies a HELLO from `source`, returns `true` if the neighbor table changed.
    pub fn handle(&self, source: Ipv4Addr, hello: &HelloMessage, vtime: ValidityTime) -> bool {
        let _guard = self.lock.lock();

        let local = self.neighbors.local();
        let sender = self.arena.intern(source);
        if sender == local {
            return false;
        }

        // Split the listed nodes into 2-hop neighbors to keep and ones to forget, the entry for
        // the local node is the sender's opinion of us.
        let mut local_code = None;
        let mut add: HashSet<NodeId> = HashSet::new();
        let mut delete: HashSet<NodeId> = HashSet::new();
        for (code, addr) in hello.iter() {
            let node = self.arena.intern(addr);
            if node == local {
                local_code = Some(code);
            } else if node == sender {
                continue;
            } else if code.neighbor == NeighborType::NotNeigh {
                delete.insert(node);
            } else {
                add.insert(node);
            }
        }

        let ttl = vtime.as_millis();

        let (changed, selected) = self.neighbors.transaction(|txn| {
            let mut entry = txn
                .get(&sender)
                .cloned()
                .unwrap_or_else(|| NeighborEntry::new(NeighborType::NotNeigh));
            let mut changed = false;

            // Forget what is listed as gone as well as what isn't reported any more.
            let before = entry.two_hop.len();
            entry
                .two_hop
                .retain(|node| add.contains(node) && !delete.contains(node));
            changed |= entry.two_hop.len() != before;

            for &node in &add {
                changed |= entry.two_hop.insert(node);
            }

            let status = status_after(entry.status, local_code);
            if status != entry.status {
                trace!(%source, from = ?entry.status, to = ?status, "neighbor status");
                entry.status = status;
                changed = true;
            }

            let selected = status.is_symmetric()
                && local_code.map_or(false, |code| code.neighbor == NeighborType::MprNeigh);

            if txn.insert(sender, entry, ttl) == Put::Inserted {
                changed = true;
            }
            if changed {
                txn.mark_changed();
            }

            (changed, selected)
        });

        self.selectors.update(|set| {
            if selected {
                set.insert(sender);
            } else {
                set.remove(&sender);
            }

            // Only symmetric neighbors can remain selectors.
            prune(set, &self.neighbors.copy_of_symmetric_neighbors());
        });

        changed
    }
}
