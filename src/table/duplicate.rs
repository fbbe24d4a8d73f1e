//! Duplicate suppression for flooded control traffic.

use std::sync::Arc;

use crate::{
    core::{clock::Clock, config::DUPLICATE_HOLD_TIME, node::NodeId, seq::SequenceNumber},
    table::expiring::ExpiringTable,
};

/// Remembers which `(originator, sequence number)` pairs have already been processed.
#[derive(Debug)]
pub struct DuplicateTable {
    table: ExpiringTable<(NodeId, SequenceNumber), bool>,
    hold_millis: u64,
}

impl DuplicateTable {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_hold_time(clock, DUPLICATE_HOLD_TIME.as_millis() as u64)
    }

    pub fn with_hold_time(clock: Arc<dyn Clock>, hold_millis: u64) -> Self {
        Self {
            table: ExpiringTable::new(clock),
            hold_millis,
        }
    }

    /// Returns `true` if the message was marked as seen within the hold time.
    pub fn seen(&self, originator: NodeId, seq: SequenceNumber) -> bool {
        self.table.contains(&(originator, seq))
    }

    /// Returns `true` if the message was seen and already retransmitted.
    pub fn retransmitted(&self, originator: NodeId, seq: SequenceNumber) -> bool {
        self.table.get(&(originator, seq)).unwrap_or(false)
    }

    /// Records the message for the hold time. A retransmission mark is never cleared by a later
    /// call within the hold time.
    pub fn mark_seen(&self, originator: NodeId, seq: SequenceNumber, retransmitted: bool) {
        let hold_millis = self.hold_millis;
        self.table.transaction(|txn| {
            let retransmitted = retransmitted
                || txn
                    .get(&(originator, seq))
                    .copied()
                    .unwrap_or(false);
            txn.insert((originator, seq), retransmitted, hold_millis);
        });
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
}
