//! Assetto Corsa Remote Telemetry UDP wire format.
//!
//! The simulator listens on UDP port 9996. A client sends 12-byte control
//! requests (see [`request`]) and receives two kinds of datagrams:
//!
//! - a 408-byte handshake reply carrying car, driver and track names
//!   ([`HandshakeInfo`]),
//! - 328-byte `RTCarInfo` updates with 84 physics channels ([`TelemetryFrame`]).
//!
//! Datagrams carry no type tag. They are told apart by length alone, so
//! [`decode`] dispatches on `data.len()` and rejects every other size.
//!
//! Everything in this crate is pure: no I/O, no allocation beyond the decoded
//! strings and channel lists.
//!
//! Reference: <https://github.com/vpicon/acudp/blob/master/UDP.md>

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod frame;
pub mod handshake;
mod reader;
pub mod request;

pub use error::DecodeError;
pub use frame::{
    CHANNEL_COUNT, CHANNEL_NAMES, ChannelValue, TELEMETRY_FRAME_SIZE, TelemetryFrame, WheelQuad,
    decode_frame,
};
pub use handshake::{HANDSHAKE_SIZE, Handshake, HandshakeInfo, decode_handshake};
pub use request::{Operation, REQUEST_SIZE, decode_request, encode_request};

/// Default simulator port for Remote Telemetry.
pub const DEFAULT_PORT: u16 = 9996;

/// A successfully decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// 328-byte physics update.
    Telemetry(Box<TelemetryFrame>),
    /// 408-byte handshake reply.
    Handshake(HandshakeInfo),
}

impl Decoded {
    /// Short label for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Decoded::Telemetry(_) => "telemetry",
            Decoded::Handshake(_) => "handshake",
        }
    }
}

/// Decode one datagram, classifying it by length.
///
/// # Errors
///
/// Returns [`DecodeError::UnexpectedLength`] when `data` is neither
/// [`TELEMETRY_FRAME_SIZE`] nor [`HANDSHAKE_SIZE`] bytes long.
pub fn decode(data: &[u8]) -> Result<Decoded, DecodeError> {
    match data.len() {
        TELEMETRY_FRAME_SIZE => decode_frame(data).map(|frame| Decoded::Telemetry(Box::new(frame))),
        HANDSHAKE_SIZE => decode_handshake(data).map(Decoded::Handshake),
        len => Err(DecodeError::UnexpectedLength { len }),
    }
}
