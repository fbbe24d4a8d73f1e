#![allow(dead_code)]

use std::{
    collections::{BTreeSet, VecDeque},
    net::Ipv4Addr,
    string::FromUtf8Error,
    sync::Arc,
};

use bytes::Bytes;
use omolsr::{clock::ManualClock, message::DataMessage, Config, Olsr, ProcessData, Response};
use parking_lot::RwLock;
use tracing_subscriber::{fmt, EnvFilter};

pub fn enable_tracing() {
    fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

pub const GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 1);

/// The address of the node at `index` in a [`Mesh`].
pub fn addr(index: usize) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, index as u8 + 1)
}

fn index_of(addr: Ipv4Addr) -> usize {
    addr.octets()[3] as usize - 1
}

/// The payloads delivered to a node's upper layer.
pub type Inbox = Arc<RwLock<Vec<String>>>;

pub struct Text(pub String);

impl TryFrom<Bytes> for Text {
    type Error = FromUtf8Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        String::from_utf8(bytes.to_vec()).map(Text)
    }
}

impl ProcessData<Inbox> for Text {
    fn process_data(&self, inbox: Inbox) {
        inbox.write().push(self.0.clone());
    }
}

/// A unicast copy observed on the wire.
#[derive(Debug, Clone)]
pub struct Sent {
    pub from: Ipv4Addr,
    pub to: Ipv4Addr,
    pub message: DataMessage,
}

/// Protocol instances sharing a clock, with a radio range expressed as undirected links.
///
/// Control packets only reach the nodes in range of the sender, unicast data is handed to its
/// recipient directly as the transport would route it.
pub struct Mesh {
    pub clock: ManualClock,
    pub nodes: Vec<Arc<Olsr>>,
    pub inboxes: Vec<Inbox>,
    links: BTreeSet<(usize, usize)>,
}

impl Mesh {
    pub fn new(n: usize) -> Self {
        let clock = ManualClock::new();
        let nodes = (0..n)
            .map(|i| {
                Arc::new(Olsr::with_clock(
                    addr(i),
                    Config::default(),
                    Arc::new(clock.clone()),
                ))
            })
            .collect();

        Self {
            clock,
            nodes,
            inboxes: (0..n).map(|_| Inbox::default()).collect(),
            links: BTreeSet::new(),
        }
    }

    /// `0 - 1 - ... - n-1`
    pub fn line(n: usize) -> Self {
        let mut mesh = Self::new(n);
        for i in 1..n {
            mesh.link(i - 1, i);
        }

        mesh
    }

    pub fn link(&mut self, a: usize, b: usize) {
        self.links.insert((a.min(b), a.max(b)));
    }

    pub fn unlink(&mut self, a: usize, b: usize) {
        self.links.remove(&(a.min(b), a.max(b)));
    }

    fn in_range(&self, node: usize) -> Vec<usize> {
        self.links
            .iter()
            .filter_map(|&(a, b)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Broadcasts a control packet and every retransmission it causes.
    pub fn flood(&self, from: usize, bytes: Bytes) {
        let mut queue = VecDeque::from([(from, bytes)]);

        while let Some((sender, bytes)) = queue.pop_front() {
            for receiver in self.in_range(sender) {
                if let Some(Response::Flood(packet)) =
                    self.nodes[receiver].process_packet(&bytes, addr(sender))
                {
                    queue.push_back((receiver, packet.encode().unwrap()));
                }
            }
        }
    }

    pub fn hellos(&self) {
        for (i, node) in self.nodes.iter().enumerate() {
            self.flood(i, node.generate_hello().encode().unwrap());
        }
    }

    pub fn tcs(&self) {
        for (i, node) in self.nodes.iter().enumerate() {
            self.flood(i, node.generate_tc().encode().unwrap());
        }
    }

    pub fn maintain(&self) {
        for node in &self.nodes {
            node.sweep();
            node.recompute();
            node.tick_grace();
        }
    }

    /// One HELLO interval worth of traffic, with a TC from every node.
    pub fn round(&self) {
        self.clock.advance(Config::default().hello_interval);
        self.hellos();
        self.maintain();
        self.tcs();
        self.maintain();
    }

    pub fn converge(&self) {
        for _ in 0..6 {
            self.round();
        }
    }

    /// Sends a payload from a node and delivers every resulting copy, returns what went over the
    /// wire.
    pub fn multicast(&self, from: usize, group: Ipv4Addr, text: &str) -> Vec<Sent> {
        let response = self.nodes[from].send_multicast(group, Bytes::from(text.to_owned()));
        let mut queue = VecDeque::from([(from, response)]);
        let mut sent = Vec::new();

        while let Some((sender, response)) = queue.pop_front() {
            let Response::Multicast(copies) = response else {
                panic!("unexpected control response to a data message");
            };

            for (to, message) in copies {
                let receiver = index_of(to);
                let bytes = message.encode().unwrap();
                sent.push(Sent {
                    from: addr(sender),
                    to,
                    message,
                });

                if let Some(response) = self.nodes[receiver].process_data::<Inbox, Text>(
                    self.inboxes[receiver].clone(),
                    &bytes,
                    addr(sender),
                ) {
                    queue.push_back((receiver, response));
                }
            }
        }

        sent
    }

    pub fn received(&self, node: usize) -> Vec<String> {
        self.inboxes[node].read().clone()
    }
}
