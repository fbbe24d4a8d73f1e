use std::{net::Ipv4Addr, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    core::{
        node::{NodeArena, NodeId},
        vtime::ValidityTime,
    },
    message::TcMessage,
    table::{
        expiring::Put,
        multicast::MulticastGroupsTable,
        neighbor::NeighborTable,
        topology::{TopologyEntry, TopologyTable},
    },
};

/// What happened to a TC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcOutcome {
    /// The immediate sender isn't a symmetric neighbor, the message was discarded.
    NotSymmetric,
    /// A newer advertisement from the same originator is already known.
    Stale,
    /// The message was applied; `changed` tells whether any table changed structurally.
    Applied { changed: bool },
}

/// Maintains the topology and multicast group tables from TC messages.
#[derive(Debug)]
pub struct TcMessageHandler {
    arena: Arc<NodeArena>,
    neighbors: Arc<NeighborTable>,
    topology: Arc<TopologyTable>,
    groups: Arc<MulticastGroupsTable>,
    lock: Mutex<()>,
}

impl TcMessageHandler {
    pub fn new(
        arena: Arc<NodeArena>,
        neighbors: Arc<NeighborTable>,
        topology: Arc<TopologyTable>,
        groups: Arc<MulticastGroupsTable>,
    ) -> Self {
        Self {
            arena,
            neighbors,
            topology,
            groups,
            lock: Mutex::new(()),
        }
    }

    /// Applies a TC generated by `originator` and received from `sender`.
    pub fn handle(
        &self,
        originator: Ipv4Addr,
        sender: Ipv4Addr,
        tc: &TcMessage,
        vtime: ValidityTime,
    ) -> TcOutcome {
        let _guard = self.lock.lock();

        let is_symmetric = self
            .arena
            .lookup(sender)
            .and_then(|sender| self.neighbors.get_entry(sender))
            .map_or(false, |entry| entry.is_symmetric());
        if !is_symmetric {
            debug!(%sender, %originator, "TC from a non-symmetric neighbor");
            return TcOutcome::NotSymmetric;
        }

        let origin = self.arena.intern(originator);
        let advertised: Vec<NodeId> = tc
            .advertised
            .iter()
            .map(|&addr| self.arena.intern(addr))
            .collect();
        let ttl = vtime.as_millis();
        let ansn = tc.ansn;

        let applied = self.topology.transaction(|txn| {
            let stale = txn
                .iter()
                .any(|(&(from, _), entry)| from == origin && entry.ansn.is_newer_than(&ansn));
            if stale {
                return None;
            }

            // Superseded tuples go before the new ones are recorded.
            let mut changed =
                txn.retain(|&(from, _), entry| from != origin || !entry.ansn.is_older_than(&ansn))
                    > 0;

            for &node in &advertised {
                let key = (origin, node);
                if !txn.refresh(&key, ttl) {
                    changed |= txn.insert(key, TopologyEntry { ansn }, ttl) == Put::Inserted;
                }
            }

            Some(changed)
        });

        let Some(topology_changed) = applied else {
            trace!(%originator, %ansn, "stale TC");
            return TcOutcome::Stale;
        };

        let groups_changed = self.groups.update_from(origin, &tc.groups);

        TcOutcome::Applied {
            changed: topology_changed || groups_changed,
        }
    }
}
