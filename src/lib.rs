//! An implementation of the [OLSR](https://www.rfc-editor.org/rfc/rfc3626) mesh routing protocol
//! extended with OMOLSR, a bandwidth-aware multicast overlay.
//!
//! Every node runs an [`Olsr`] instance. HELLO messages sense links and elect multipoint relays
//! (MPRs), TC messages flooded through the MPRs distribute the topology and the multicast group
//! memberships. From that state each node derives:
//!
//! 1. a routing table (next hop and hop count per destination),
//! 2. per multicast group, a graph contracted to the group members and a minimum spanning tree
//!    over it, along which data messages are relayed.
//!
//! The protocol instance is sans-io: inbound bytes go in, a [`Response`] describing what to send
//! comes out. The periodic work is either triggered by the caller or, with the `runtime` feature,
//! by a tokio-based [`Driver`](runtime::Driver).
//!
//! All state is soft: entries expire unless refreshed, nothing is torn down explicitly.

#![cfg_attr(doc_cfg, feature(doc_cfg))]

#[cfg(feature = "codec")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "codec")))]
pub mod codec;
#[cfg(feature = "runtime")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "runtime")))]
pub mod runtime;

pub mod graph;
pub mod handler;
pub mod message;
pub mod overlay;
pub mod table;

mod core;
mod olsr;

pub use crate::{
    core::{
        clock, config,
        config::Config,
        error, link,
        node::{self, Bandwidth, NodeArena, NodeId},
        seq, vtime,
        traits::{ProcessData, TopologyListener, Transport},
    },
    olsr::{Olsr, Response, TopologyInformation},
};
