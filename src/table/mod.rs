//! Protocol state tables.
//!
//! Each table owns its lock. Derived state is never recomputed inline; instead a table raises a
//! [`Dirty`] flag that the maintenance loop picks up.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod duplicate;
pub mod expiring;
pub mod mpr;
pub mod multicast;
pub mod neighbor;
pub mod routing;
pub mod topology;

/// A recompute-needed flag shared between a table and whoever schedules the recompute.
#[derive(Debug, Default)]
pub struct Dirty(AtomicBool);

impl Dirty {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
