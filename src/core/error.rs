//! Protocol error types.

/// Errors raised while decoding control packets or overlay data messages.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("invalid link code: {0:#04x}")]
    InvalidLinkCode(u8),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("data message: {0}")]
    Data(#[from] bincode::error::DecodeError),
}

/// Errors raised while encoding control packets or overlay data messages.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("too many entries in {field}: {len} (max 255)")]
    TooManyEntries { field: &'static str, len: usize },

    #[error("data message: {0}")]
    Data(#[from] bincode::error::EncodeError),
}

/// Errors raised by the graph algorithms.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("graph is disconnected: reached {reached} of {total} nodes")]
    Disconnected { reached: usize, total: usize },

    #[error("root is not part of the graph")]
    MissingRoot,
}
