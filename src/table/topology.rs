//! The topology information base, filled from TC messages.

use std::sync::Arc;

use crate::{
    core::{clock::Clock, node::NodeId, seq::SequenceNumber},
    table::{
        expiring::{ExpiringTable, Transaction},
        mpr::NodeSet,
        Dirty,
    },
};

/// A topology tuple is keyed by `(originator, advertised neighbor)`: the originator announced it
/// has a symmetric link to the advertised neighbor.
pub type TopologyKey = (NodeId, NodeId);

/// The data carried by a topology tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyEntry {
    /// The ANSN of the TC message the tuple was learned from.
    pub ansn: SequenceNumber,
}

/// The network-wide link advertisements known to the local node.
#[derive(Debug)]
pub struct TopologyTable {
    table: ExpiringTable<TopologyKey, TopologyEntry>,
    changed: Arc<Dirty>,
}

impl TopologyTable {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let changed = Arc::new(Dirty::default());
        let table = {
            let changed = changed.clone();
            ExpiringTable::with_on_change(clock, move |_| changed.raise())
        };

        Self { table, changed }
    }

    pub fn get(&self, originator: NodeId, advertised: NodeId) -> Option<TopologyEntry> {
        self.table.get(&(originator, advertised))
    }

    /// Returns every live `(originator, advertised)` edge.
    pub fn edges(&self) -> Vec<TopologyKey> {
        let mut edges = self.table.keys();
        edges.sort_unstable();
        edges
    }

    /// Returns the advertised neighbors of an originator.
    pub fn advertised_by(&self, originator: NodeId) -> NodeSet {
        self.table
            .keys()
            .into_iter()
            .filter(|&(from, _)| from == originator)
            .map(|(_, advertised)| advertised)
            .collect()
    }

    /// Returns every node that originated at least one live tuple.
    pub fn originators(&self) -> NodeSet {
        self.table.keys().into_iter().map(|(from, _)| from).collect()
    }

    /// Returns every node named in a live tuple.
    pub fn nodes(&self) -> NodeSet {
        self.table
            .keys()
            .into_iter()
            .flat_map(|(from, to)| [from, to])
            .collect()
    }

    /// Runs a read-modify-write sequence on the tuples under the table lock.
    pub(crate) fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_, TopologyKey, TopologyEntry>) -> R,
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

    /// The flag raised on every structural change.
    pub fn changed(&self) -> &Dirty {
        &self.changed
    }
}
