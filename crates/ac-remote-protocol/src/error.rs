//! Decode failures.

use thiserror::Error;

/// Why a datagram could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The datagram is neither a telemetry frame nor a handshake reply.
    #[error("unexpected datagram size {len} (expected 328 or 408 bytes)")]
    UnexpectedLength { len: usize },

    /// A fixed-width read ran past the end of the buffer.
    #[error("packet too short: need {needed} bytes at offset {offset}, total {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
}

impl DecodeError {
    /// Observed datagram length carried by the error.
    pub fn observed_len(&self) -> usize {
        match self {
            DecodeError::UnexpectedLength { len } | DecodeError::Truncated { len, .. } => *len,
        }
    }
}
