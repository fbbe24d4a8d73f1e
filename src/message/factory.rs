use std::{
    net::Ipv4Addr,
    sync::atomic::{AtomicU16, Ordering},
};

use super::{HelloMessage, MessageBody, MessageHeader, OlsrPacket, TcMessage};
use crate::core::{seq::SequenceNumber, vtime::ValidityTime};

/// Builds the control packets originated by the local node, stamping each with the next message
/// sequence number.
#[derive(Debug)]
pub struct PacketFactory {
    originator: Ipv4Addr,
    seq: AtomicU16,
}

impl PacketFactory {
    pub fn new(originator: Ipv4Addr) -> Self {
        Self {
            originator,
            seq: AtomicU16::new(0),
        }
    }

    pub fn originator(&self) -> Ipv4Addr {
        self.originator
    }

    /// Returns the next message sequence number; the counter wraps.
    pub fn next_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.seq.fetch_add(1, Ordering::Relaxed))
    }

    /// HELLO messages only travel one hop.
    pub fn hello(&self, vtime: ValidityTime, hello: HelloMessage) -> OlsrPacket {
        self.packet(vtime, 1, MessageBody::Hello(hello))
    }

    pub fn tc(&self, vtime: ValidityTime, ttl: u8, tc: TcMessage) -> OlsrPacket {
        self.packet(vtime, ttl, MessageBody::Tc(tc))
    }

    fn packet(&self, vtime: ValidityTime, ttl: u8, body: MessageBody) -> OlsrPacket {
        OlsrPacket {
            header: MessageHeader {
                vtime,
                originator: self.originator,
                ttl,
                hop_count: 0,
                seq: self.next_seq(),
            },
            body,
        }
    }
}
