//! Wrapping sequence numbers.

use std::{cmp::Ordering, fmt};

/// A 16-bit sequence number compared with wraparound semantics.
///
/// `a` is newer than `b` if it is ahead of `b` by less than half the number space, so `0` is
/// newer than `65535`. The ordering is deliberately not exposed through [`Ord`] as it isn't
/// transitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    const HALF: u16 = u16::MAX / 2;

    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns the next sequence number, wrapping at `u16::MAX`.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Compares two sequence numbers taking wraparound into account.
    pub fn wrapping_cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.0, other.0);

        match a.cmp(&b) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater if a - b <= Self::HALF => Ordering::Greater,
            Ordering::Greater => Ordering::Less,
            Ordering::Less if b - a <= Self::HALF => Ordering::Less,
            Ordering::Less => Ordering::Greater,
        }
    }

    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.wrapping_cmp(other) == Ordering::Greater
    }

    pub fn is_older_than(&self, other: &Self) -> bool {
        self.wrapping_cmp(other) == Ordering::Less
    }
}

impl From<u16> for SequenceNumber {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    #[test]
    fn plain_ordering() {
        let a = SequenceNumber::new(5);
        let b = SequenceNumber::new(7);

        assert!(b.is_newer_than(&a));
        assert!(a.is_older_than(&b));
        assert_eq!(a.wrapping_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn wraparound() {
        let max = SequenceNumber::new(u16::MAX);
        let zero = max.next();

        assert_eq!(zero.value(), 0);
        assert!(zero.is_newer_than(&max));
        assert!(max.is_older_than(&zero));
    }

    #[test]
    fn antisymmetric() {
        let mut rng = thread_rng();

        for _ in 0..1000 {
            let a = SequenceNumber::new(rng.gen());
            let b = SequenceNumber::new(rng.gen());

            assert_eq!(a.wrapping_cmp(&b), b.wrapping_cmp(&a).reverse());
        }
    }

    #[test]
    fn successor_is_always_newer() {
        let mut rng = thread_rng();

        for _ in 0..1000 {
            let a = SequenceNumber::new(rng.gen());
            assert!(a.next().is_newer_than(&a));
        }
    }
}
