use std::{collections::BTreeSet, net::Ipv4Addr};

use bytes::{Buf, BufMut, BytesMut};

use super::{get_addrs, need, put_addr, put_count};
use crate::core::{
    error::{DecodeError, EncodeError},
    seq::SequenceNumber,
};

/// The data making up a TC message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcMessage {
    /// Incremented by the originator every time its advertised set changes.
    pub ansn: SequenceNumber,
    /// The originator's MPR selectors.
    pub advertised: BTreeSet<Ipv4Addr>,
    /// The multicast groups the originator joined.
    pub groups: BTreeSet<Ipv4Addr>,
}

impl TcMessage {
    pub(super) fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16(self.ansn.value());

        put_count(dst, self.advertised.len(), "advertised neighbors")?;
        for &addr in &self.advertised {
            put_addr(dst, addr);
        }

        put_count(dst, self.groups.len(), "multicast groups")?;
        for &group in &self.groups {
            put_addr(dst, group);
        }

        Ok(())
    }

    pub(super) fn decode_payload(src: &mut impl Buf) -> Result<Self, DecodeError> {
        need(src, 2)?;
        let ansn = SequenceNumber::new(src.get_u16());
        let advertised = get_addrs(src)?.into_iter().collect();
        let groups = get_addrs(src)?.into_iter().collect();

        Ok(Self {
            ansn,
            advertised,
            groups,
        })
    }
}
