//! Application of inbound control messages to the protocol tables.
//!
//! Each handler serializes its multi-table update behind a private lock; the locks of the tables
//! it touches nest inside that lock.

mod hello;
mod tc;

pub use hello::HelloMessageHandler;
pub use tc::{TcMessageHandler, TcOutcome};
