use std::{
    collections::{BTreeMap, BTreeSet},
    net::Ipv4Addr,
};

use bincode::{Decode, Encode};
use bytes::Bytes;

use crate::core::error::{DecodeError, EncodeError};

/// Maps a recipient to the group members it is responsible for relaying to.
pub type ForwardingHeader = BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>>;

/// A multicast payload travelling along a group's spanning tree.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DataMessage {
    pub group: Ipv4Addr,
    pub source: Ipv4Addr,
    pub seq: u32,
    pub header: ForwardingHeader,

    #[bincode(with_serde)]
    pub payload: Bytes,
}

impl DataMessage {
    pub fn new(group: Ipv4Addr, source: Ipv4Addr, seq: u32, payload: Bytes) -> Self {
        Self {
            group,
            source,
            seq,
            header: ForwardingHeader::new(),
            payload,
        }
    }

    /// Returns a copy of the message carrying a different header; the payload is shared.
    pub fn with_header(&self, header: ForwardingHeader) -> Self {
        Self {
            header,
            ..self.clone()
        }
    }

    /// Returns the nodes the recipient still has to relay to.
    pub fn responsibilities(&self, recipient: Ipv4Addr) -> BTreeSet<Ipv4Addr> {
        self.header.get(&recipient).cloned().unwrap_or_default()
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())?;
        Ok(Bytes::from(bytes))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (message, length) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        if length < bytes.len() {
            return Err(DecodeError::TrailingBytes(bytes.len() - length));
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    fn message() -> DataMessage {
        let mut rng = thread_rng();
        let payload: [u8; 32] = rng.gen();

        let mut message = DataMessage::new(
            Ipv4Addr::new(224, 0, 0, 9),
            Ipv4Addr::new(10, 0, 0, 1),
            rng.gen(),
            Bytes::copy_from_slice(&payload),
        );
        message.header.insert(
            Ipv4Addr::new(10, 0, 0, 2),
            [Ipv4Addr::new(10, 0, 0, 3)].into_iter().collect(),
        );

        message
    }

    #[test]
    fn encode_decode() {
        let message = message();
        let bytes = message.encode().unwrap();
        assert_eq!(DataMessage::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = message().encode().unwrap().to_vec();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            DataMessage::decode(&bytes),
            Err(DecodeError::TrailingBytes(2))
        ));
    }

    #[test]
    fn garbage_fails() {
        assert!(matches!(
            DataMessage::decode(&[0xff; 3]),
            Err(DecodeError::Data(_))
        ));
    }

    #[test]
    fn responsibilities() {
        let message = message();
        assert_eq!(
            message.responsibilities(Ipv4Addr::new(10, 0, 0, 2)).len(),
            1
        );
        assert!(message
            .responsibilities(Ipv4Addr::new(10, 0, 0, 3))
            .is_empty());

        let stripped = message.with_header(ForwardingHeader::new());
        assert!(stripped.header.is_empty());
        assert_eq!(stripped.payload, message.payload);
    }
}
