//! The routing table.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;

use crate::core::node::NodeId;

/// How to reach a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: NodeId,
    pub hops: u8,
}

pub type Routes = HashMap<NodeId, RouteEntry>;

/// Destination to next hop mapping, published copy-on-write.
///
/// Readers load the current map without locking and never observe a partially built table;
/// writers build a new map and swap it in.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: ArcSwap<Routes>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the route to a destination.
    pub fn add_entry(&self, destination: NodeId, next_hop: NodeId, hops: u8) {
        self.routes.rcu(|routes| {
            let mut routes = Routes::clone(routes);
            routes.insert(destination, RouteEntry { next_hop, hops });
            routes
        });
    }

    pub fn lookup(&self, destination: NodeId) -> Option<RouteEntry> {
        self.routes.load().get(&destination).copied()
    }

    pub fn hop_count_to(&self, destination: NodeId) -> Option<u8> {
        self.lookup(destination).map(|route| route.hops)
    }

    /// Replaces the whole content with a copy of another table's routes in one step.
    pub fn replace_with(&self, other: &RoutingTable) {
        let routes = Routes::clone(&other.routes.load());
        self.routes.store(Arc::new(routes));
    }

    /// Returns the current routes; the snapshot is unaffected by later updates.
    pub fn snapshot(&self) -> Arc<Routes> {
        self.routes.load_full()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }
}

impl From<Routes> for RoutingTable {
    fn from(routes: Routes) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{net::Ipv4Addr, thread};

    use super::*;
    use crate::core::node::NodeArena;

    #[test]
    fn add_and_lookup() {
        let arena = NodeArena::new();
        let a = arena.intern(Ipv4Addr::new(10, 0, 0, 1));
        let b = arena.intern(Ipv4Addr::new(10, 0, 0, 2));

        let table = RoutingTable::new();
        assert!(table.lookup(b).is_none());

        table.add_entry(b, a, 2);
        assert_eq!(
            table.lookup(b),
            Some(RouteEntry {
                next_hop: a,
                hops: 2
            })
        );
        assert_eq!(table.hop_count_to(b), Some(2));
    }

    #[test]
    fn replace_with_copies() {
        let arena = NodeArena::new();
        let a = arena.intern(Ipv4Addr::new(10, 0, 0, 1));
        let b = arena.intern(Ipv4Addr::new(10, 0, 0, 2));

        let live = RoutingTable::new();
        live.add_entry(a, a, 1);
        let snapshot = live.snapshot();

        let fresh = RoutingTable::new();
        fresh.add_entry(b, a, 2);
        live.replace_with(&fresh);

        // Later changes to the source don't leak into the copy.
        fresh.add_entry(a, a, 1);

        assert!(live.lookup(a).is_none());
        assert_eq!(live.hop_count_to(b), Some(2));
        assert_eq!(live.len(), 1);
        // Earlier snapshots are untouched.
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&a));
    }

    #[test]
    fn readers_never_see_partial_tables() {
        let arena = NodeArena::new();
        let nodes: Vec<NodeId> = (0..50)
            .map(|n| arena.intern(Ipv4Addr::new(10, 0, 0, n)))
            .collect();

        let live = Arc::new(RoutingTable::new());
        let full = RoutingTable::new();
        for &node in &nodes {
            full.add_entry(node, nodes[0], 1);
        }

        let reader = {
            let live = live.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let len = live.snapshot().len();
                    assert!(len == 0 || len == 50);
                }
            })
        };

        for _ in 0..100 {
            live.replace_with(&full);
            live.replace_with(&RoutingTable::new());
        }

        reader.join().unwrap();
    }
}
