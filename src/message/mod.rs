//! Control packet types and their wire format.
//!
//! A packet carries exactly one message:
//!
//! ```text
//! [type:1][vtime:1][originator:4][ttl:1][hop_count:1][seq:2][payload]
//! ```
//!
//! Addresses are IPv4 in network order, multi-byte integers are big-endian and every list is
//! prefixed with a one-byte count.

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::core::{
    error::{DecodeError, EncodeError},
    seq::SequenceNumber,
    vtime::ValidityTime,
};

mod data;
mod factory;
mod hello;
mod tc;

pub use data::{DataMessage, ForwardingHeader};
pub use factory::PacketFactory;
pub use hello::HelloMessage;
pub use tc::TcMessage;

/// The size of the fixed message header in bytes.
pub const HEADER_LEN: usize = 10;

/// Message type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Hello = 1,
    Tc = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(MessageType::Hello),
            2 => Ok(MessageType::Tc),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

/// The fields shared by every control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// How long the receiver should consider the information valid.
    pub vtime: ValidityTime,
    /// The node that generated the message.
    pub originator: Ipv4Addr,
    /// The number of hops the message may still travel.
    pub ttl: u8,
    /// The number of hops the message has travelled.
    pub hop_count: u8,
    /// The originator's message sequence number.
    pub seq: SequenceNumber,
}

/// Control message variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// HELLO messages perform link sensing and neighbor detection, they are never forwarded.
    Hello(HelloMessage),
    /// TC messages flood topology information through the MPRs.
    Tc(TcMessage),
}

impl MessageBody {
    pub fn variant_as_str(&self) -> &str {
        match self {
            MessageBody::Hello(_) => "hello",
            MessageBody::Tc(_) => "tc",
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Hello(_) => MessageType::Hello,
            MessageBody::Tc(_) => MessageType::Tc,
        }
    }
}

/// A control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlsrPacket {
    pub header: MessageHeader,
    pub body: MessageBody,
}

impl OlsrPacket {
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut dst = BytesMut::with_capacity(HEADER_LEN + 32);
        self.encode_into(&mut dst)?;

        Ok(dst.freeze())
    }

    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let header = &self.header;
        dst.put_u8(self.body.message_type() as u8);
        dst.put_u8(header.vtime.to_byte());
        put_addr(dst, header.originator);
        dst.put_u8(header.ttl);
        dst.put_u8(header.hop_count);
        dst.put_u16(header.seq.value());

        match &self.body {
            MessageBody::Hello(hello) => hello.encode_payload(dst),
            MessageBody::Tc(tc) => tc.encode_payload(dst),
        }
    }

    /// Decodes a packet, the type byte is validated before anything else.
    pub fn decode(mut src: &[u8]) -> Result<Self, DecodeError> {
        let message_type = MessageType::try_from(get_u8(&mut src)?)?;
        need(&src, HEADER_LEN - 1)?;

        let header = MessageHeader {
            vtime: ValidityTime::from_byte(src.get_u8()),
            originator: get_addr(&mut src)?,
            ttl: src.get_u8(),
            hop_count: src.get_u8(),
            seq: SequenceNumber::new(src.get_u16()),
        };

        let body = match message_type {
            MessageType::Hello => MessageBody::Hello(HelloMessage::decode_payload(&mut src)?),
            MessageType::Tc => MessageBody::Tc(TcMessage::decode_payload(&mut src)?),
        };

        if src.has_remaining() {
            return Err(DecodeError::TrailingBytes(src.remaining()));
        }

        Ok(Self { header, body })
    }

    /// Returns the copy to retransmit, or `None` if the message may not travel any further.
    pub fn forwarded(&self) -> Option<Self> {
        if self.header.ttl <= 1 {
            return None;
        }

        let mut packet = self.clone();
        packet.header.ttl -= 1;
        packet.header.hop_count = packet.header.hop_count.saturating_add(1);

        Some(packet)
    }
}

pub(crate) fn need(src: &impl Buf, needed: usize) -> Result<(), DecodeError> {
    if src.remaining() < needed {
        return Err(DecodeError::Truncated {
            needed,
            remaining: src.remaining(),
        });
    }

    Ok(())
}

pub(crate) fn get_u8(src: &mut impl Buf) -> Result<u8, DecodeError> {
    need(src, 1)?;
    Ok(src.get_u8())
}

pub(crate) fn get_addr(src: &mut impl Buf) -> Result<Ipv4Addr, DecodeError> {
    need(src, 4)?;
    Ok(Ipv4Addr::from(src.get_u32()))
}

pub(crate) fn put_addr(dst: &mut impl BufMut, addr: Ipv4Addr) {
    dst.put_slice(&addr.octets());
}

/// Writes a one-byte list length.
pub(crate) fn put_count(
    dst: &mut impl BufMut,
    len: usize,
    field: &'static str,
) -> Result<(), EncodeError> {
    let count = u8::try_from(len).map_err(|_| EncodeError::TooManyEntries { field, len })?;
    dst.put_u8(count);

    Ok(())
}

/// Reads a one-byte count followed by that many addresses.
pub(crate) fn get_addrs(src: &mut impl Buf) -> Result<Vec<Ipv4Addr>, DecodeError> {
    let count = get_u8(src)? as usize;
    need(src, count * 4)?;

    Ok((0..count).map(|_| Ipv4Addr::from(src.get_u32())).collect())
}
