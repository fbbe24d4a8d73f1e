//! Multicast group membership as reported in TC messages.

use std::{
    collections::{BTreeSet, HashMap},
    net::Ipv4Addr,
};

use parking_lot::RwLock;

use crate::{
    core::node::NodeId,
    table::{mpr::NodeSet, Dirty},
};

pub type GroupSet = BTreeSet<Ipv4Addr>;

/// Maps each node to the multicast groups it joined.
#[derive(Debug, Default)]
pub struct MulticastGroupsTable {
    rows: RwLock<HashMap<NodeId, GroupSet>>,
    changed: Dirty,
}

impl MulticastGroupsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the nodes that joined the group.
    pub fn group_members(&self, group: Ipv4Addr) -> NodeSet {
        self.rows
            .read()
            .iter()
            .filter(|(_, groups)| groups.contains(&group))
            .map(|(&node, _)| node)
            .collect()
    }

    pub fn joined_groups(&self, node: NodeId) -> GroupSet {
        self.rows.read().get(&node).cloned().unwrap_or_default()
    }

    /// Returns every group with at least one member.
    pub fn groups(&self) -> GroupSet {
        self.rows.read().values().flatten().copied().collect()
    }

    pub fn is_member(&self, node: NodeId, group: Ipv4Addr) -> bool {
        self.rows
            .read()
            .get(&node)
            .map_or(false, |groups| groups.contains(&group))
    }

    /// Adds the node to the group, returns `false` if it was already a member.
    pub fn register(&self, node: NodeId, group: Ipv4Addr) -> bool {
        let inserted = self.rows.write().entry(node).or_default().insert(group);
        if inserted {
            self.changed.raise();
        }

        inserted
    }

    /// Removes the node from the group, returns `false` if it wasn't a member.
    pub fn unregister(&self, node: NodeId, group: Ipv4Addr) -> bool {
        let mut rows = self.rows.write();
        let Some(groups) = rows.get_mut(&node) else {
            return false;
        };

        let removed = groups.remove(&group);
        if groups.is_empty() {
            rows.remove(&node);
        }

        if removed {
            self.changed.raise();
        }

        removed
    }

    /// Replaces the node's groups with the reported ones if they differ, returns whether anything
    /// changed.
    pub fn update_from(&self, originator: NodeId, reported: &GroupSet) -> bool {
        let mut rows = self.rows.write();
        let current = rows.get(&originator);

        let unchanged = match current {
            Some(groups) => groups == reported,
            None => reported.is_empty(),
        };
        if unchanged {
            return false;
        }

        if reported.is_empty() {
            rows.remove(&originator);
        } else {
            rows.insert(originator, reported.clone());
        }
        self.changed.raise();

        true
    }

    /// Drops the rows of every node not in `keep`, returns how many were dropped.
    pub fn retain_nodes(&self, keep: &NodeSet) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|node, _| keep.contains(node));
        let removed = before - rows.len();

        if removed > 0 {
            self.changed.raise();
        }

        removed
    }

    pub fn changed(&self) -> &Dirty {
        &self.changed
    }
}
