//! The protocol instance of a single node.
//!
//! [`Olsr`] is sans-io: inbound packets go in as bytes, what has to be sent out comes back as a
//! [`Response`] and the periodic work (HELLO and TC emission, expiry, recomputation) is triggered
//! by whoever drives it, see the `runtime` feature for a tokio-based driver.

use std::{
    collections::{BTreeMap, HashMap},
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    core::{
        clock::{Clock, SystemClock},
        config::Config,
        link::LinkCode,
        node::{Bandwidth, NodeArena, NodeId},
        traits::ProcessData,
    },
    graph::{mst::SpanningTree, multicast::MulticastGraphController},
    handler::{HelloMessageHandler, TcMessageHandler},
    message::{DataMessage, HelloMessage, MessageBody, OlsrPacket, PacketFactory, TcMessage},
    overlay::{ForwardingHandler, OmolsrData, OverlaySnapshot},
    table::{
        duplicate::DuplicateTable,
        mpr::{prune, select_mprs, MprSelectorSet, MprSet, NodeSet},
        multicast::MulticastGroupsTable,
        neighbor::NeighborTable,
        routing::{RouteEntry, Routes, RoutingTable},
        topology::TopologyTable,
    },
};

/// What the caller has to send after processing an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Retransmit the control packet to every neighbor.
    Flood(OlsrPacket),
    /// Send each data message to its recipient.
    Multicast(Vec<(Ipv4Addr, DataMessage)>),
}

/// A consistent view of the routing state, handed to the layer making routing decisions.
#[derive(Debug, Clone)]
pub struct TopologyInformation {
    local: NodeId,
    arena: Arc<NodeArena>,
    routes: Arc<Routes>,
    overlays: BTreeMap<Ipv4Addr, OverlaySnapshot>,
}

impl TopologyInformation {
    pub fn local_addr(&self) -> Option<Ipv4Addr> {
        self.arena.addr(self.local)
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    fn route(&self, destination: Ipv4Addr) -> Option<RouteEntry> {
        let destination = self.arena.lookup(destination)?;
        self.routes.get(&destination).copied()
    }

    pub fn next_hop_to(&self, destination: Ipv4Addr) -> Option<Ipv4Addr> {
        self.arena.addr(self.route(destination)?.next_hop)
    }

    pub fn hop_count_to(&self, destination: Ipv4Addr) -> Option<u8> {
        self.route(destination).map(|route| route.hops)
    }

    pub fn bandwidth_capacity_of(&self, node: Ipv4Addr) -> Option<Bandwidth> {
        self.arena.bandwidth(self.arena.lookup(node)?)
    }

    /// The smallest capacity a group's traffic meets on its way from the local node to the
    /// destination.
    pub fn lowest_bandwidth_on_route_to(
        &self,
        group: Ipv4Addr,
        destination: Ipv4Addr,
    ) -> Option<Bandwidth> {
        let destination = self.arena.lookup(destination)?;
        self.overlays
            .get(&group)?
            .lowest_bandwidth_on_route_to(&self.arena, destination)
    }

    /// The groups an overlay exists for.
    pub fn groups(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.overlays.keys().copied()
    }

    pub fn overlay(&self, group: Ipv4Addr) -> Option<&OverlaySnapshot> {
        self.overlays.get(&group)
    }
}

type Overlays = HashMap<Ipv4Addr, Arc<OmolsrData>>;

/// An OLSR node with its multicast overlays.
#[derive(Debug)]
pub struct Olsr {
    local: NodeId,
    local_addr: Ipv4Addr,
    config: Config,
    arena: Arc<NodeArena>,
    duplicates: DuplicateTable,
    neighbors: Arc<NeighborTable>,
    mprs: MprSet,
    selectors: Arc<MprSelectorSet>,
    topology: Arc<TopologyTable>,
    groups: Arc<MulticastGroupsTable>,
    routes: RoutingTable,
    graph: MulticastGraphController,
    overlays: ArcSwap<Overlays>,
    hello_handler: HelloMessageHandler,
    tc_handler: TcMessageHandler,
    factory: PacketFactory,
    data_seq: AtomicU32,
    // Recomputes publish several structures, one at a time.
    recompute_lock: Mutex<()>,
}

impl Olsr {
    /// Creates a node using the wall clock.
    pub fn new(local_addr: Ipv4Addr, config: Config) -> Self {
        Self::with_clock(local_addr, config, Arc::new(SystemClock))
    }

    pub fn with_clock(local_addr: Ipv4Addr, config: Config, clock: Arc<dyn Clock>) -> Self {
        let arena = Arc::new(NodeArena::new());
        let local = arena.intern(local_addr);

        let duplicates =
            DuplicateTable::with_hold_time(clock.clone(), config.duplicate_ttl_millis());
        let neighbors = Arc::new(NeighborTable::new(local, clock.clone()));
        let selectors = Arc::new(MprSelectorSet::new());
        let topology = Arc::new(TopologyTable::new(clock));
        let groups = Arc::new(MulticastGroupsTable::new());

        let hello_handler =
            HelloMessageHandler::new(arena.clone(), neighbors.clone(), selectors.clone());
        let tc_handler = TcMessageHandler::new(
            arena.clone(),
            neighbors.clone(),
            topology.clone(),
            groups.clone(),
        );

        Self {
            local,
            local_addr,
            graph: MulticastGraphController::new(local, groups.clone()),
            factory: PacketFactory::new(local_addr),
            config,
            arena,
            duplicates,
            neighbors,
            mprs: MprSet::new(),
            selectors,
            topology,
            groups,
            routes: RoutingTable::new(),
            overlays: ArcSwap::from_pointee(Overlays::new()),
            hello_handler,
            tc_handler,
            data_seq: AtomicU32::new(0),
            recompute_lock: Mutex::new(()),
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn local_addr(&self) -> Ipv4Addr {
        self.local_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arena(&self) -> &Arc<NodeArena> {
        &self.arena
    }

    pub fn duplicates(&self) -> &DuplicateTable {
        &self.duplicates
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn mprs(&self) -> &MprSet {
        &self.mprs
    }

    pub fn selectors(&self) -> &MprSelectorSet {
        &self.selectors
    }

    pub fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    pub fn groups(&self) -> &MulticastGroupsTable {
        &self.groups
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn multicast_graph(&self) -> &MulticastGraphController {
        &self.graph
    }

    pub fn overlay(&self, group: Ipv4Addr) -> Option<Arc<OmolsrData>> {
        self.overlays.load().get(&group).cloned()
    }

    /// Returns the next hop and hop count towards a destination.
    pub fn route_to(&self, destination: Ipv4Addr) -> Option<(Ipv4Addr, u8)> {
        let route = self.routes.lookup(self.arena.lookup(destination)?)?;
        Some((self.arena.addr(route.next_hop)?, route.hops))
    }

    /// Decodes and processes a control packet received from `from`.
    pub fn process_packet(&self, bytes: &[u8], from: Ipv4Addr) -> Option<Response> {
        match OlsrPacket::decode(bytes) {
            Ok(packet) => self.process_olsr_packet(packet, from),
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed control packet");
                None
            }
        }
    }

    /// Processes a decoded control packet received from `from`.
    pub fn process_olsr_packet(&self, packet: OlsrPacket, from: Ipv4Addr) -> Option<Response> {
        let header = packet.header;
        if header.originator == self.local_addr || from == self.local_addr {
            return None;
        }

        trace!(
            kind = packet.body.variant_as_str(),
            %from,
            originator = %header.originator,
            seq = %header.seq,
            "control packet"
        );

        let originator = self.arena.intern(header.originator);
        let duplicate = self.duplicates.seen(originator, header.seq);

        match &packet.body {
            MessageBody::Hello(hello) => {
                if duplicate {
                    debug!(%from, seq = %header.seq, "duplicate HELLO");
                    return None;
                }

                self.duplicates.mark_seen(originator, header.seq, false);
                self.hello_handler.handle(from, hello, header.vtime);

                None
            }
            MessageBody::Tc(tc) => {
                if !duplicate {
                    let outcome = self
                        .tc_handler
                        .handle(header.originator, from, tc, header.vtime);
                    trace!(originator = %header.originator, ?outcome, "TC processed");
                }

                self.forward(&packet, originator, from)
            }
        }
    }

    // Default forwarding: retransmit once, and only when the sender selected us as its MPR.
    fn forward(&self, packet: &OlsrPacket, originator: NodeId, from: Ipv4Addr) -> Option<Response> {
        let seq = packet.header.seq;
        if self.duplicates.retransmitted(originator, seq) {
            return None;
        }

        let selected_us = self.arena.lookup(from).map_or(false, |sender| {
            self.selectors.contains(sender)
                && self
                    .neighbors
                    .get_entry(sender)
                    .map_or(false, |entry| entry.is_symmetric())
        });

        let forwarded = if selected_us {
            packet.forwarded()
        } else {
            None
        };
        self.duplicates.mark_seen(originator, seq, forwarded.is_some());

        forwarded.map(Response::Flood)
    }

    /// Builds a HELLO advertising every neighbor with its current status.
    pub fn generate_hello(&self) -> OlsrPacket {
        let mut hello = HelloMessage::new();
        for (neighbor, entry) in self.neighbors.entries() {
            if let Some(addr) = self.arena.addr(neighbor) {
                hello.insert(LinkCode::for_neighbor(entry.status), addr);
            }
        }

        self.factory.hello(self.config.hello_vtime(), hello)
    }

    /// Builds a TC advertising the MPR selectors and the groups the local node joined.
    pub fn generate_tc(&self) -> OlsrPacket {
        let (ansn, selectors) = self.selectors.advertised();
        let tc = TcMessage {
            ansn,
            advertised: self.arena.addrs(&selectors).into_iter().collect(),
            groups: self.groups.joined_groups(self.local),
        };

        self.factory
            .tc(self.config.tc_vtime(), self.config.max_ttl, tc)
    }

    /// Drops expired state from every table, returns how many entries went.
    pub fn sweep(&self) -> usize {
        let mut removed = self.duplicates.sweep() + self.neighbors.sweep() + self.topology.sweep();

        // The symmetric set is read under the selector lock so a concurrent HELLO can't be pruned
        // against a stale copy.
        self.selectors.update(|selectors| {
            prune(selectors, &self.neighbors.copy_of_symmetric_neighbors());
        });

        // Membership of nodes that vanished from every table.
        let mut known = self.neighbors.neighbors();
        known.extend(self.neighbors.two_hop_neighbors());
        known.extend(self.topology.nodes());
        known.insert(self.local);
        removed += self.groups.retain_nodes(&known);

        removed
    }

    /// Recomputes whatever derived state the tables flagged as outdated: MPRs, routes, the
    /// multicast graph and the overlays. Returns `false` if nothing needed recomputing.
    pub fn recompute(&self) -> bool {
        let _guard = self.recompute_lock.lock();

        if self.neighbors.mpr_dirty().take() {
            let symmetric = self.neighbors.copy_of_symmetric_neighbors();
            let mprs = select_mprs(self.local, &symmetric, &self.neighbors.two_hop_pairs());

            self.neighbors.on_mpr_set_change(&mprs);
            if self.mprs.replace(mprs) {
                debug!(mprs = ?self.arena.addrs(&self.mprs.snapshot()), "MPR set changed");
            }
        }

        let neighbors_changed = self.neighbors.changed().take();
        let topology_changed = self.topology.changed().take();
        let groups_changed = self.groups.changed().take();

        if !(neighbors_changed || topology_changed || groups_changed) {
            return false;
        }

        if neighbors_changed || topology_changed {
            self.compute_routes();
            self.graph.rebuild(
                &self.neighbors.copy_of_symmetric_neighbors(),
                &self.neighbors.two_hop_pairs(),
                &self.topology.edges(),
            );
        }

        self.rebuild_overlays();

        true
    }

    // Breadth first: symmetric neighbors, then 2-hop neighbors, then one topology hop at a time.
    // A layer only extends routes of the previous layer.
    fn compute_routes(&self) {
        let symmetric = self.neighbors.copy_of_symmetric_neighbors();
        let mut routes = Routes::new();

        for &neighbor in &symmetric {
            routes.insert(
                neighbor,
                RouteEntry {
                    next_hop: neighbor,
                    hops: 1,
                },
            );
        }

        for &(neighbor, two_hop) in self.neighbors.two_hop_pairs().iter() {
            if two_hop != self.local && symmetric.contains(&neighbor) {
                routes.entry(two_hop).or_insert(RouteEntry {
                    next_hop: neighbor,
                    hops: 2,
                });
            }
        }

        let edges = self.topology.edges();
        let mut hops = 1;
        while hops < u8::MAX && routes.values().any(|route| route.hops == hops) {
            for &(from, to) in &edges {
                if to == self.local || routes.contains_key(&to) {
                    continue;
                }

                let via = routes.get(&from).filter(|route| route.hops == hops).copied();
                if let Some(via) = via {
                    routes.insert(
                        to,
                        RouteEntry {
                            next_hop: via.next_hop,
                            hops: hops + 1,
                        },
                    );
                }
            }

            hops += 1;
        }

        trace!(routes = routes.len(), "routing table recomputed");
        self.routes.replace_with(&RoutingTable::from(routes));
    }

    fn rebuild_overlays(&self) {
        let current = self.overlays.load_full();

        let mut groups = self.groups.groups();
        groups.extend(current.keys().copied());

        let mut overlays = Overlays::new();
        for group in groups {
            let overlay = current.get(&group).cloned().unwrap_or_else(|| {
                Arc::new(OmolsrData::new(group, self.local, self.config.grace_ticks))
            });
            overlay.update(self.graph.compute_contracted_graph(group));

            if !overlay.is_idle() || self.groups.is_member(self.local, group) {
                overlays.insert(group, overlay);
            }
        }

        self.overlays.store(Arc::new(overlays));
    }

    /// Advances the grace period of departed group members by one tick.
    pub fn tick_grace(&self) {
        for overlay in self.overlays.load().values() {
            for node in overlay.tick() {
                trace!(group = %overlay.group(), %node, "grace period over");
            }
        }
    }

    /// Joins a multicast group, the membership is advertised in the next TC.
    pub fn join(&self, group: Ipv4Addr) -> bool {
        self.groups.register(self.local, group)
    }

    pub fn leave(&self, group: Ipv4Addr) -> bool {
        self.groups.unregister(self.local, group)
    }

    /// Prepares the copies of a payload sent to a group from the local node.
    pub fn send_multicast(&self, group: Ipv4Addr, payload: Bytes) -> Response {
        let seq = self.data_seq.fetch_add(1, Ordering::Relaxed);
        let message = DataMessage::new(group, self.local_addr, seq, payload);
        let handler = ForwardingHandler::new(&self.arena, self.local);

        let copies = match self.overlay(group) {
            Some(overlay) => handler.outbound(&overlay.tree(), &overlay.grace_nodes(), &message),
            None => {
                let tree = SpanningTree::singleton(self.local);
                handler.outbound(&tree, &NodeSet::new(), &message)
            }
        };

        Response::Multicast(copies)
    }

    /// Decodes and processes a data message received from `from`.
    pub fn process_data<S: Clone, T: ProcessData<S>>(
        &self,
        state: S,
        bytes: &[u8],
        from: Ipv4Addr,
    ) -> Option<Response> {
        match DataMessage::decode(bytes) {
            Ok(message) => self.process_data_message::<S, T>(state, message),
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed data message");
                None
            }
        }
    }

    /// Delivers the payload to the upper layer if the local node is a member of the group (or the
    /// source) and relays the message along the tree.
    pub fn process_data_message<S: Clone, T: ProcessData<S>>(
        &self,
        state: S,
        message: DataMessage,
    ) -> Option<Response> {
        let deliver = message.source == self.local_addr
            || self.groups.is_member(self.local, message.group);

        if deliver {
            match T::try_from(message.payload.clone()) {
                Ok(data) if data.verify_data(state.clone()) => data.process_data(state),
                Ok(_) => debug!(group = %message.group, source = %message.source, "payload rejected"),
                Err(_) => debug!(group = %message.group, "payload conversion failed"),
            }
        }

        let tree = match self.overlay(message.group) {
            Some(overlay) => overlay.tree(),
            None => Arc::new(SpanningTree::singleton(self.local)),
        };
        let copies = ForwardingHandler::new(&self.arena, self.local).relay(&tree, &message);

        (!copies.is_empty()).then_some(Response::Multicast(copies))
    }

    /// Interns the transport's current membership.
    pub fn on_view_change(&self, view: &[Ipv4Addr]) -> usize {
        view.iter()
            .filter(|&&addr| self.arena.lookup(addr).is_none())
            .map(|&addr| self.arena.intern(addr))
            .count()
    }

    /// Records a node's bandwidth statistics, every table observes the update.
    pub fn set_bandwidth(&self, node: Ipv4Addr, bandwidth: Bandwidth) -> bool {
        self.arena.set_bandwidth(self.arena.intern(node), bandwidth)
    }

    pub fn topology_information(&self) -> TopologyInformation {
        TopologyInformation {
            local: self.local,
            arena: self.arena.clone(),
            routes: self.routes.snapshot(),
            overlays: self
                .overlays
                .load()
                .iter()
                .map(|(&group, overlay)| (group, overlay.snapshot()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        clock::ManualClock,
        link::NeighborType,
        seq::SequenceNumber,
        vtime::ValidityTime,
    };
    use crate::message::MessageHeader;

    fn addr(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, n)
    }

    fn group() -> Ipv4Addr {
        Ipv4Addr::new(224, 0, 0, 1)
    }

    fn setup() -> (ManualClock, Olsr) {
        let clock = ManualClock::new();
        let olsr = Olsr::with_clock(addr(1), Config::default(), Arc::new(clock.clone()));

        (clock, olsr)
    }

    fn hello_from(sender: u8, seq: u16, links: &[(NeighborType, u8)]) -> OlsrPacket {
        let mut hello = HelloMessage::new();
        for &(neighbor, n) in links {
            hello.insert(LinkCode::for_neighbor(neighbor), addr(n));
        }

        OlsrPacket {
            header: MessageHeader {
                vtime: ValidityTime::from_secs_f64(6.0),
                originator: addr(sender),
                ttl: 1,
                hop_count: 0,
                seq: SequenceNumber::new(seq),
            },
            body: MessageBody::Hello(hello),
        }
    }

    fn tc_from(originator: u8, seq: u16, ttl: u8, advertised: &[u8]) -> OlsrPacket {
        OlsrPacket {
            header: MessageHeader {
                vtime: ValidityTime::from_secs_f64(15.0),
                originator: addr(originator),
                ttl,
                hop_count: 0,
                seq: SequenceNumber::new(seq),
            },
            body: MessageBody::Tc(TcMessage {
                ansn: SequenceNumber::new(1),
                advertised: advertised.iter().map(|&n| addr(n)).collect(),
                groups: [group()].into_iter().collect(),
            }),
        }
    }

    #[test]
    fn malformed_packets_dropped() {
        let (_clock, olsr) = setup();
        assert!(olsr.process_packet(&[7, 0, 0], addr(2)).is_none());
        assert!(olsr.neighbors().is_empty());
    }

    #[test]
    fn own_packets_dropped() {
        let (_clock, olsr) = setup();
        let bytes = hello_from(1, 0, &[]).encode().unwrap();

        assert!(olsr.process_packet(&bytes, addr(2)).is_none());
        assert!(olsr.neighbors().is_empty());
    }

    #[test]
    fn duplicate_hello_dropped() {
        let (_clock, olsr) = setup();
        let packet = hello_from(2, 5, &[(NeighborType::NotNeigh, 1)]);

        olsr.process_olsr_packet(packet.clone(), addr(2));
        olsr.neighbors().changed().take();
        olsr.process_olsr_packet(packet, addr(2));

        assert!(!olsr.neighbors().changed().is_raised());
        assert!(olsr.duplicates().seen(olsr.arena().intern(addr(2)), SequenceNumber::new(5)));
    }

    #[test]
    fn hello_reflects_neighbors() {
        let (_clock, olsr) = setup();
        olsr.process_olsr_packet(hello_from(2, 0, &[]), addr(2));
        olsr.process_olsr_packet(hello_from(3, 0, &[(NeighborType::NotNeigh, 1)]), addr(3));

        let packet = olsr.generate_hello();
        assert_eq!(packet.header.originator, addr(1));
        assert_eq!(packet.header.ttl, 1);

        let MessageBody::Hello(hello) = packet.body else {
            panic!("expected a HELLO");
        };
        assert_eq!(
            hello.code_for(addr(2)),
            Some(LinkCode::for_neighbor(NeighborType::NotNeigh))
        );
        assert_eq!(
            hello.code_for(addr(3)),
            Some(LinkCode::for_neighbor(NeighborType::SymNeigh))
        );
    }

    #[test]
    fn tc_carries_selectors_and_groups() {
        let (_clock, olsr) = setup();
        olsr.join(group());

        let MessageBody::Tc(first) = olsr.generate_tc().body else {
            panic!("expected a TC");
        };
        assert!(first.advertised.is_empty());
        assert_eq!(first.groups, [group()].into_iter().collect());

        olsr.process_olsr_packet(hello_from(2, 0, &[(NeighborType::MprNeigh, 1)]), addr(2));
        let packet = olsr.generate_tc();
        assert_eq!(packet.header.ttl, u8::MAX);

        let MessageBody::Tc(second) = packet.body else {
            panic!("expected a TC");
        };
        assert!(second.ansn.is_newer_than(&first.ansn));
        assert_eq!(second.advertised, [addr(2)].into_iter().collect());
    }

    #[test]
    fn tc_forwarded_once_when_selected_as_mpr() {
        let (_clock, olsr) = setup();
        // 2 selected us, 3 is merely symmetric.
        olsr.process_olsr_packet(hello_from(2, 0, &[(NeighborType::MprNeigh, 1)]), addr(2));
        olsr.process_olsr_packet(hello_from(3, 0, &[(NeighborType::SymNeigh, 1)]), addr(3));

        let response = olsr.process_olsr_packet(tc_from(9, 1, 3, &[8]), addr(2));
        let Some(Response::Flood(forwarded)) = response else {
            panic!("expected the TC to be forwarded");
        };
        assert_eq!(forwarded.header.ttl, 2);
        assert_eq!(forwarded.header.hop_count, 1);
        assert_eq!(olsr.topology().len(), 1);

        // The same message again, through another neighbor.
        assert!(olsr
            .process_olsr_packet(tc_from(9, 1, 3, &[8]), addr(3))
            .is_none());

        // Not selected by 3, not forwarded.
        assert!(olsr
            .process_olsr_packet(tc_from(9, 2, 3, &[8]), addr(3))
            .is_none());

        // No hops left.
        assert!(olsr
            .process_olsr_packet(tc_from(9, 3, 1, &[8]), addr(2))
            .is_none());
    }

    #[test]
    fn routes_after_recompute() {
        let (_clock, olsr) = setup();
        // 1 - 2 - 3 - 4
        olsr.process_olsr_packet(
            hello_from(2, 0, &[(NeighborType::SymNeigh, 1), (NeighborType::SymNeigh, 3)]),
            addr(2),
        );
        olsr.process_olsr_packet(tc_from(3, 1, 255, &[2, 4]), addr(2));

        assert!(olsr.recompute());
        assert_eq!(olsr.route_to(addr(2)), Some((addr(2), 1)));
        assert_eq!(olsr.route_to(addr(3)), Some((addr(2), 2)));
        assert_eq!(olsr.route_to(addr(4)), Some((addr(2), 3)));
        assert_eq!(olsr.route_to(addr(1)), None);
        assert_eq!(olsr.mprs().snapshot(), [olsr.arena().intern(addr(2))].into_iter().collect());

        // The relabelled MPR entry shows up in our next HELLO.
        let MessageBody::Hello(hello) = olsr.generate_hello().body else {
            panic!("expected a HELLO");
        };
        assert_eq!(
            hello.code_for(addr(2)),
            Some(LinkCode::for_neighbor(NeighborType::MprNeigh))
        );

        let info = olsr.topology_information();
        assert_eq!(info.hop_count_to(addr(4)), Some(3));
        assert_eq!(info.next_hop_to(addr(4)), Some(addr(2)));
    }

    #[test]
    fn recompute_without_changes() {
        let (_clock, olsr) = setup();
        assert!(!olsr.recompute());
    }

    #[test]
    fn sweep_expires_everything() {
        let (clock, olsr) = setup();
        olsr.process_olsr_packet(hello_from(2, 0, &[(NeighborType::MprNeigh, 1)]), addr(2));
        olsr.process_olsr_packet(tc_from(9, 1, 3, &[8]), addr(2));
        assert_eq!(olsr.groups().group_members(group()).len(), 1);

        clock.advance_millis(31_000);
        assert!(olsr.sweep() > 0);
        assert!(olsr.neighbors().is_empty());
        assert!(olsr.topology().is_empty());
        assert!(olsr.selectors().is_empty());
        assert!(olsr.duplicates().is_empty());
        assert!(olsr.groups().group_members(group()).is_empty());
    }

    #[test]
    fn concurrent_hellos_and_sweeps() {
        use std::thread;

        let (_clock, olsr) = setup();
        let olsr = Arc::new(olsr);
        let senders = 10..=17u8;

        let sweeper = {
            let olsr = olsr.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    olsr.sweep();
                }
            })
        };

        let handles: Vec<_> = senders
            .clone()
            .map(|sender| {
                let olsr = olsr.clone();
                thread::spawn(move || {
                    for seq in 0..50 {
                        let links = [
                            (NeighborType::MprNeigh, 1),
                            (NeighborType::SymNeigh, 100 + sender),
                        ];
                        olsr.process_olsr_packet(hello_from(sender, seq, &links), addr(sender));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        sweeper.join().unwrap();
        olsr.sweep();

        let expected: NodeSet = senders
            .clone()
            .map(|sender| olsr.arena().intern(addr(sender)))
            .collect();
        assert_eq!(olsr.neighbors().copy_of_symmetric_neighbors(), expected);
        assert_eq!(olsr.selectors().snapshot(), expected);
        assert_eq!(olsr.neighbors().two_hop_pairs().len(), 8);
        assert_eq!(olsr.neighbors().two_hop_neighbors().len(), 8);
    }

    #[test]
    fn view_change_and_bandwidth() {
        let (_clock, olsr) = setup();
        assert_eq!(olsr.on_view_change(&[addr(1), addr(2), addr(3)]), 2);
        assert_eq!(olsr.on_view_change(&[addr(2)]), 0);

        let bandwidth = Bandwidth {
            max_in_bytes: 100,
            max_in_messages: 1,
        };
        assert!(olsr.set_bandwidth(addr(2), bandwidth));
        assert_eq!(
            olsr.topology_information().bandwidth_capacity_of(addr(2)),
            Some(bandwidth)
        );
    }

    #[test]
    fn multicast_without_overlay_delivers_locally() {
        let (_clock, olsr) = setup();
        let Response::Multicast(copies) = olsr.send_multicast(group(), Bytes::from_static(b"x"))
        else {
            panic!("expected multicast copies");
        };

        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].0, addr(1));
        assert!(copies[0].1.header.is_empty());
    }
}
