//! Handshake reply (408 bytes, little-endian).
//!
//! `car_name[100] user_name[100] identifier:i32 version:i32
//! track_name[100] track_config[100]`, where each text field is 50 UTF-16
//! code units. AC terminates the strings with `%` and leaves the rest of the
//! field as padding.

use crate::DecodeError;
use crate::reader::PacketReader;

/// Handshake reply size.
pub const HANDSHAKE_SIZE: usize = 408;

const TEXT_FIELD_SIZE: usize = 100;
const TEXT_TERMINATOR: char = '%';
const BOM: u16 = 0xFEFF;
const SWAPPED_BOM: u16 = 0xFFFE;

/// Session parameters announced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeInfo {
    pub car_name: String,
    pub user_name: String,
    pub identifier: i32,
    pub version: i32,
    pub track_name: String,
    pub track_config: String,
}

/// A decoded handshake together with the reply bytes it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub info: HandshakeInfo,
    pub raw: Vec<u8>,
}

impl Handshake {
    /// Decode a handshake reply and keep its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedLength`] unless `reply` is exactly
    /// [`HANDSHAKE_SIZE`] bytes.
    pub fn from_reply(reply: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            info: decode_handshake(reply)?,
            raw: reply.to_vec(),
        })
    }
}

/// Decode a 408-byte handshake reply.
///
/// Text decoding never fails: invalid UTF-16 is dropped and whatever decodes
/// is kept.
///
/// # Errors
///
/// Returns [`DecodeError::UnexpectedLength`] for any other size.
pub fn decode_handshake(data: &[u8]) -> Result<HandshakeInfo, DecodeError> {
    if data.len() != HANDSHAKE_SIZE {
        return Err(DecodeError::UnexpectedLength { len: data.len() });
    }

    let mut r = PacketReader::new(data);
    let car_name = decode_text(r.read_exact(TEXT_FIELD_SIZE)?);
    let user_name = decode_text(r.read_exact(TEXT_FIELD_SIZE)?);
    let identifier = r.read_i32_le()?;
    let version = r.read_i32_le()?;
    let track_name = decode_text(r.read_exact(TEXT_FIELD_SIZE)?);
    let track_config = decode_text(r.read_exact(TEXT_FIELD_SIZE)?);

    Ok(HandshakeInfo {
        car_name,
        user_name,
        identifier,
        version,
        track_name,
        track_config,
    })
}

/// UTF-16 text up to the first `%` or NUL. Little-endian unless a byte order
/// mark says otherwise.
fn decode_text(raw: &[u8]) -> String {
    let mut units: Vec<u16> = raw
        .chunks_exact(2)
        .filter_map(|pair| <[u8; 2]>::try_from(pair).ok())
        .map(u16::from_le_bytes)
        .collect();

    match units.first().copied() {
        Some(BOM) => {
            units.remove(0);
        }
        Some(SWAPPED_BOM) => {
            units.remove(0);
            units.iter_mut().for_each(|unit| *unit = unit.swap_bytes());
        }
        _ => {}
    }

    char::decode_utf16(units)
        .filter_map(Result::ok)
        .take_while(|c| *c != TEXT_TERMINATOR && *c != '\0')
        .collect()
}
