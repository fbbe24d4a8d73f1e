//! Foundational and often-reused types.

pub mod clock;
pub mod config;
pub mod error;
pub mod link;
pub mod node;
pub mod seq;
pub(crate) mod traits;
pub mod vtime;
