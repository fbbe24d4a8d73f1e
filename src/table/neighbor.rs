//! The 1-hop neighbor table and the 2-hop sets it carries.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use arc_swap::ArcSwap;

use crate::{
    core::{clock::Clock, link::NeighborType, node::NodeId},
    table::{
        expiring::{ExpiringTable, LiveEntries, Put, Transaction},
        mpr::NodeSet,
        Dirty,
    },
};

/// The (symmetric neighbor, 2-hop neighbor) pairs, i.e. the neighbor-of-neighbor set.
pub type TwoHopPairs = BTreeSet<(NodeId, NodeId)>;

/// A single 1-hop neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    /// How the local node classifies the neighbor.
    pub status: NeighborType,
    /// The nodes this neighbor reports as its own symmetric neighbors.
    pub two_hop: HashSet<NodeId>,
}

impl NeighborEntry {
    pub fn new(status: NeighborType) -> Self {
        Self {
            status,
            two_hop: HashSet::new(),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.status.is_symmetric()
    }
}

/// The neighbor table of a single node.
///
/// Every change of the live neighbor set republishes the 2-hop pairs and raises both the
/// `changed` and `mpr_dirty` flags.
#[derive(Debug)]
pub struct NeighborTable {
    local: NodeId,
    table: ExpiringTable<NodeId, NeighborEntry>,
    two_hop_pairs: Arc<ArcSwap<TwoHopPairs>>,
    changed: Arc<Dirty>,
    mpr_dirty: Arc<Dirty>,
}

// Scans every entry, only symmetric neighbors provide 2-hop reachability.
fn compute_two_hop_pairs(
    local: NodeId,
    live: LiveEntries<'_, NodeId, NeighborEntry>,
) -> TwoHopPairs {
    live.iter()
        .filter(|(_, entry)| entry.is_symmetric())
        .flat_map(|(&neighbor, entry)| {
            entry
                .two_hop
                .iter()
                .filter(move |&&two_hop| two_hop != local && two_hop != neighbor)
                .map(move |&two_hop| (neighbor, two_hop))
        })
        .collect()
}

impl NeighborTable {
    pub fn new(local: NodeId, clock: Arc<dyn Clock>) -> Self {
        let two_hop_pairs = Arc::new(ArcSwap::from_pointee(TwoHopPairs::new()));
        let changed = Arc::new(Dirty::default());
        let mpr_dirty = Arc::new(Dirty::default());

        let table = {
            let two_hop_pairs = two_hop_pairs.clone();
            let changed = changed.clone();
            let mpr_dirty = mpr_dirty.clone();

            ExpiringTable::with_on_change(clock, move |live| {
                two_hop_pairs.store(Arc::new(compute_two_hop_pairs(local, live)));
                changed.raise();
                mpr_dirty.raise();
            })
        };

        Self {
            local,
            table,
            two_hop_pairs,
            changed,
            mpr_dirty,
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn entry_exists(&self, neighbor: NodeId) -> bool {
        self.table.contains(&neighbor)
    }

    pub fn get_entry(&self, neighbor: NodeId) -> Option<NeighborEntry> {
        self.table.get(&neighbor)
    }

    /// Inserts the entry or replaces the existing one, in both cases resetting its lifetime.
    ///
    /// Replacing a live entry with a different one counts as a change.
    pub fn add_or_refresh(&self, neighbor: NodeId, entry: NeighborEntry, ttl_millis: u64) -> Put {
        self.table.transaction(|txn| {
            let differs = txn.get(&neighbor).map_or(false, |old| *old != entry);
            let put = txn.insert(neighbor, entry, ttl_millis);
            if differs {
                txn.mark_changed();
            }

            put
        })
    }

    pub fn remove(&self, neighbor: NodeId) -> Option<NeighborEntry> {
        self.table.remove(&neighbor)
    }

    /// Returns the live neighbors regardless of their status.
    pub fn neighbors(&self) -> NodeSet {
        self.table.keys().into_iter().collect()
    }

    /// Returns every live neighbor with its entry.
    pub fn entries(&self) -> Vec<(NodeId, NeighborEntry)> {
        self.table.snapshot()
    }

    /// Returns the neighbors the local node has a symmetric link with (including MPRs).
    pub fn copy_of_symmetric_neighbors(&self) -> NodeSet {
        self.table
            .snapshot()
            .into_iter()
            .filter(|(_, entry)| entry.is_symmetric())
            .map(|(neighbor, _)| neighbor)
            .collect()
    }

    /// Returns the most recently published neighbor-of-neighbor pairs.
    pub fn two_hop_pairs(&self) -> Arc<TwoHopPairs> {
        self.two_hop_pairs.load_full()
    }

    /// Returns the 2-hop neighbors: nodes reachable through a symmetric neighbor that are neither
    /// the local node nor symmetric neighbors themselves.
    pub fn two_hop_neighbors(&self) -> NodeSet {
        let symmetric = self.copy_of_symmetric_neighbors();
        self.two_hop_pairs()
            .iter()
            .map(|&(_, two_hop)| two_hop)
            .filter(|two_hop| !symmetric.contains(two_hop))
            .collect()
    }

    /// Relabels the symmetric neighbors so that exactly the members of the MPR set are
    /// `MprNeigh`, returns `true` if any label changed.
    pub fn on_mpr_set_change(&self, mprs: &NodeSet) -> bool {
        let relabelled = self.table.transaction(|txn| {
            let neighbors: Vec<NodeId> = txn.iter().map(|(&neighbor, _)| neighbor).collect();
            let mut relabelled = false;

            for neighbor in neighbors {
                if let Some(entry) = txn.get_mut(&neighbor) {
                    if !entry.is_symmetric() {
                        continue;
                    }

                    let status = if mprs.contains(&neighbor) {
                        NeighborType::MprNeigh
                    } else {
                        NeighborType::SymNeigh
                    };

                    if entry.status != status {
                        entry.status = status;
                        relabelled = true;
                    }
                }
            }

            relabelled
        });

        if relabelled {
            self.changed.raise();
        }

        relabelled
    }

    /// Runs the change hook: republishes the 2-hop pairs and raises the flags.
    pub fn notify_changed(&self) {
        self.table.notify_changed()
    }

    /// Runs a read-modify-write sequence on the entries under the table lock.
    pub(crate) fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_, NodeId, NeighborEntry>) -> R,
    ) -> R {
        self.table.transaction(f)
    }

    pub fn sweep(&self) -> usize {
        self.table.sweep()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The flag raised whenever the table content changed.
    pub fn changed(&self) -> &Dirty {
        &self.changed
    }

    /// The flag raised whenever the MPR set needs to be recomputed.
    pub fn mpr_dirty(&self) -> &Dirty {
        &self.mpr_dirty
    }
}
