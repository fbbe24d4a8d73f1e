use std::net::Ipv4Addr;

use bytes::Bytes;

use crate::olsr::TopologyInformation;

/// A trait used to determine how multicast payloads are handled.
///
/// The overlay uses this trait to decide whether the payload of a
/// [`DataMessage`](crate::message::DataMessage) is delivered to the upper layer. Data that fails
/// conversion or verification is dropped, but the message is still relayed along the tree as
/// relays may not be able to interpret it.
pub trait ProcessData<S>: TryFrom<Bytes> {
    /// Returns whether the data is valid or not; the provided implementation returns `true`.
    fn verify_data(&self, _state: S) -> bool {
        true
    }

    /// Processes the data; the provided implementation is a no-op.
    ///
    /// No assumptions are made about how this function is implemented, e.g. the state can carry a
    /// channel sender to hand the data to another task.
    fn process_data(&self, _state: S) {}
}

/// The message bus underneath the protocol.
///
/// Delivery is unreliable and unordered; sequence numbers and expiry absorb the consequences.
pub trait Transport: Send + Sync {
    /// Sends a message to a single node.
    fn send(&self, to: Ipv4Addr, bytes: Bytes);

    /// Sends a message to every node in radio range.
    fn send_to_neighbors(&self, bytes: Bytes);
}

/// Consumer of routing decisions.
pub trait TopologyListener: Send + Sync {
    fn on_topology_information(&self, information: TopologyInformation);
}
