//! Error types for wire-protocol parsing.
//!
//! Parsing failures on inbound transmissions are recoverable: the dispatch
//! state machine answers them with a `Reset` handshake rather than tearing
//! anything down, so these errors carry just enough context to log.

use thiserror::Error;

/// Errors produced while parsing inbound transmissions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Transmission carried no bytes at all, not even an AID.
    #[error("empty transmission")]
    Empty,

    /// First byte is not a recognized attention identifier.
    #[error("unknown AID byte {0:#04x}")]
    UnknownAid(u8),

    /// Transmission shorter than the minimum for its classification.
    #[error("transmission too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length required for this frame kind.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// A transmit header did not start with the required positioning order.
    #[error("missing buffer-positioning order in transmit header")]
    BadPositioningOrder,
}

/// Convenience alias for wire-protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
