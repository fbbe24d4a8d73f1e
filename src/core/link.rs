//! Link and neighbor classification codes.

use std::fmt;

use crate::core::error::DecodeError;

/// The state of the link between the sender of a HELLO and the listed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkType {
    Unspec = 0,
    Asym = 1,
    Sym = 2,
    Lost = 3,
}

/// The neighbor relationship between the sender of a HELLO and the listed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NeighborType {
    NotNeigh = 0,
    SymNeigh = 1,
    MprNeigh = 2,
}

impl NeighborType {
    /// Returns `true` for both symmetric and MPR neighbors.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, NeighborType::SymNeigh | NeighborType::MprNeigh)
    }
}

/// A link code as carried in HELLO messages: `neighbor_type << 2 | link_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkCode {
    pub link: LinkType,
    pub neighbor: NeighborType,
}

impl LinkCode {
    pub fn new(link: LinkType, neighbor: NeighborType) -> Self {
        Self { link, neighbor }
    }

    /// The code a node uses to advertise a neighbor of the given type.
    pub fn for_neighbor(neighbor: NeighborType) -> Self {
        let link = match neighbor {
            NeighborType::NotNeigh => LinkType::Asym,
            NeighborType::SymNeigh | NeighborType::MprNeigh => LinkType::Sym,
        };

        Self { link, neighbor }
    }

    /// Returns `true` if a node listed with this code has heard the sender, i.e. the link from the
    /// listed node's point of view is at least asymmetric.
    pub fn confirms_link(&self) -> bool {
        matches!(self.link, LinkType::Asym | LinkType::Sym) || self.neighbor.is_symmetric()
    }

    pub fn to_byte(self) -> u8 {
        (self.neighbor as u8) << 2 | self.link as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        let link = match byte & 0b11 {
            0 => LinkType::Unspec,
            1 => LinkType::Asym,
            2 => LinkType::Sym,
            _ => LinkType::Lost,
        };

        let neighbor = match byte >> 2 {
            0 => NeighborType::NotNeigh,
            1 => NeighborType::SymNeigh,
            2 => NeighborType::MprNeigh,
            _ => return Err(DecodeError::InvalidLinkCode(byte)),
        };

        // A symmetric neighbor can't be reached over an asymmetric link.
        if neighbor.is_symmetric() && link == LinkType::Asym {
            return Err(DecodeError::InvalidLinkCode(byte));
        }

        Ok(Self { link, neighbor })
    }
}

impl fmt::Display for LinkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.link, self.neighbor)
    }
}
