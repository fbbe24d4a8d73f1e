//! Node identity types.
//!
//! Every participant is interned once in a [`NodeArena`] and referred to everywhere else by its
//! [`NodeId`]. Tables only ever store identifiers, the mutable per-node data (bandwidth stats)
//! lives in the arena and is updated there.

use std::{collections::HashMap, fmt, net::Ipv4Addr};

use parking_lot::RwLock;

/// A stable index into a [`NodeArena`].
///
/// Identifiers are handed out in interning order and never reused, so two identifiers from the
/// same arena are equal if and only if the addresses they were interned from are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the raw arena index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bandwidth statistics reported for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bandwidth {
    /// Maximum number of incoming bytes per second the node can handle.
    pub max_in_bytes: u64,
    /// Maximum number of incoming messages per second the node can handle.
    pub max_in_messages: u64,
}

impl Bandwidth {
    /// The componentwise minimum, i.e. what a path through both nodes can sustain.
    pub fn min(self, other: Self) -> Self {
        Self {
            max_in_bytes: self.max_in_bytes.min(other.max_in_bytes),
            max_in_messages: self.max_in_messages.min(other.max_in_messages),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeRecord {
    addr: Ipv4Addr,
    bandwidth: Bandwidth,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<NodeRecord>,
    by_addr: HashMap<Ipv4Addr, NodeId>,
}

/// The registry of every node known to a protocol instance.
#[derive(Debug, Default)]
pub struct NodeArena {
    inner: RwLock<Inner>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for the address, creating a record if the address is new.
    pub fn intern(&self, addr: Ipv4Addr) -> NodeId {
        if let Some(id) = self.lookup(addr) {
            return id;
        }

        let mut inner = self.inner.write();
        // Another writer may have interned the address between the two locks.
        if let Some(&id) = inner.by_addr.get(&addr) {
            return id;
        }

        let id = NodeId(inner.records.len() as u32);
        inner.records.push(NodeRecord {
            addr,
            bandwidth: Bandwidth::default(),
        });
        inner.by_addr.insert(addr, id);

        id
    }

    /// Returns the identifier for the address, if it has been interned.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.inner.read().by_addr.get(&addr).copied()
    }

    /// Returns the address the identifier was interned from.
    pub fn addr(&self, id: NodeId) -> Option<Ipv4Addr> {
        self.inner
            .read()
            .records
            .get(id.0 as usize)
            .map(|record| record.addr)
    }

    /// Returns the bandwidth stats of the node, if it exists.
    pub fn bandwidth(&self, id: NodeId) -> Option<Bandwidth> {
        self.inner
            .read()
            .records
            .get(id.0 as usize)
            .map(|record| record.bandwidth)
    }

    /// Updates the bandwidth stats of the node in place, returns `false` if the node is unknown.
    pub fn set_bandwidth(&self, id: NodeId, bandwidth: Bandwidth) -> bool {
        match self.inner.write().records.get_mut(id.0 as usize) {
            Some(record) => {
                record.bandwidth = bandwidth;
                true
            }
            None => false,
        }
    }

    /// Resolves a batch of identifiers to addresses, skipping unknown identifiers.
    pub fn addrs<'a>(&self, ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<Ipv4Addr> {
        let inner = self.inner.read();
        ids.into_iter()
            .filter_map(|id| inner.records.get(id.0 as usize).map(|record| record.addr))
            .collect()
    }

    /// Returns the number of interned nodes.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
