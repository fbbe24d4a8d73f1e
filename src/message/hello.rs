use std::{
    collections::{BTreeMap, BTreeSet},
    net::Ipv4Addr,
};

use bytes::{Buf, BufMut, BytesMut};

use super::{get_addrs, get_u8, put_addr, put_count};
use crate::core::{
    error::{DecodeError, EncodeError},
    link::LinkCode,
};

/// The data making up a HELLO message: the sender's neighbors grouped by link code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloMessage {
    pub links: BTreeMap<LinkCode, BTreeSet<Ipv4Addr>>,
}

impl HelloMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists a neighbor under the given link code.
    pub fn insert(&mut self, code: LinkCode, addr: Ipv4Addr) -> bool {
        self.links.entry(code).or_default().insert(addr)
    }

    /// Returns the code the sender listed the address with.
    pub fn code_for(&self, addr: Ipv4Addr) -> Option<LinkCode> {
        self.links
            .iter()
            .find(|(_, addrs)| addrs.contains(&addr))
            .map(|(&code, _)| code)
    }

    /// Iterates over every listed `(code, address)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (LinkCode, Ipv4Addr)> + '_ {
        self.links
            .iter()
            .flat_map(|(&code, addrs)| addrs.iter().map(move |&addr| (code, addr)))
    }

    pub fn is_empty(&self) -> bool {
        self.links.values().all(BTreeSet::is_empty)
    }

    pub(super) fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let groups: Vec<_> = self
            .links
            .iter()
            .filter(|(_, addrs)| !addrs.is_empty())
            .collect();

        put_count(dst, groups.len(), "link code groups")?;
        for (code, addrs) in groups {
            dst.put_u8(code.to_byte());
            put_count(dst, addrs.len(), "hello neighbors")?;
            for &addr in addrs {
                put_addr(dst, addr);
            }
        }

        Ok(())
    }

    pub(super) fn decode_payload(src: &mut impl Buf) -> Result<Self, DecodeError> {
        let mut hello = Self::new();

        let groups = get_u8(src)?;
        for _ in 0..groups {
            let code = LinkCode::from_byte(get_u8(src)?)?;
            let addrs = get_addrs(src)?;
            // Repeated codes are merged.
            hello.links.entry(code).or_default().extend(addrs);
        }

        Ok(hello)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::{LinkType, NeighborType};

    fn addr(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, n)
    }

    #[test]
    fn code_for() {
        let sym = LinkCode::for_neighbor(NeighborType::SymNeigh);
        let lost = LinkCode::new(LinkType::Lost, NeighborType::NotNeigh);

        let mut hello = HelloMessage::new();
        hello.insert(sym, addr(1));
        hello.insert(lost, addr(2));

        assert_eq!(hello.code_for(addr(1)), Some(sym));
        assert_eq!(hello.code_for(addr(2)), Some(lost));
        assert_eq!(hello.code_for(addr(3)), None);
        assert_eq!(hello.iter().count(), 2);
    }

    #[test]
    fn empty_groups_are_not_encoded() {
        let mut hello = HelloMessage::new();
        hello
            .links
            .insert(LinkCode::for_neighbor(NeighborType::SymNeigh), BTreeSet::new());
        assert!(hello.is_empty());

        let mut dst = BytesMut::new();
        hello.encode_payload(&mut dst).unwrap();
        assert_eq!(&dst[..], &[0]);
    }

    #[test]
    fn repeated_codes_merge() {
        let code = LinkCode::for_neighbor(NeighborType::MprNeigh).to_byte();
        let bytes = [2, code, 1, 10, 0, 0, 1, code, 1, 10, 0, 0, 2];

        let hello = HelloMessage::decode_payload(&mut &bytes[..]).unwrap();
        assert_eq!(hello.links.len(), 1);
        assert_eq!(hello.iter().count(), 2);
    }

    #[test]
    fn invalid_code_rejected() {
        let bytes = [1, 0b1101, 0];
        assert!(matches!(
            HelloMessage::decode_payload(&mut &bytes[..]),
            Err(DecodeError::InvalidLinkCode(0b1101))
        ));
    }

    #[test]
    fn too_many_neighbors() {
        let code = LinkCode::for_neighbor(NeighborType::SymNeigh);
        let mut hello = HelloMessage::new();
        for n in 0..=255u16 {
            hello.insert(code, Ipv4Addr::from(0x0a00_0000 + u32::from(n)));
        }

        let mut dst = BytesMut::new();
        assert!(matches!(
            hello.encode_payload(&mut dst),
            Err(EncodeError::TooManyEntries { len: 256, .. })
        ));
    }
}
