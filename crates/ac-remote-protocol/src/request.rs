//! Client → simulator control requests.
//!
//! Every request is three little-endian `i32`: identifier, protocol version,
//! operation. The simulator expects `1` for both of the first two.

/// Control request size.
pub const REQUEST_SIZE: usize = 12;

const IDENTIFIER: i32 = 1;
const PROTOCOL_VERSION: i32 = 1;

/// Request operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Operation {
    /// Ask for the 408-byte handshake reply.
    Handshake = 0,
    /// Start the 328-byte `RTCarInfo` stream.
    SubscribeUpdate = 1,
    /// Subscribe to spot events. The payload of these events is undocumented;
    /// the request is sent as-is and nothing is assumed about replies.
    SubscribeSpot = 2,
    /// End the session.
    Dismiss = 3,
}

impl Operation {
    /// Wire value of the operation.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Operation for a wire value.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Operation::Handshake),
            1 => Some(Operation::SubscribeUpdate),
            2 => Some(Operation::SubscribeSpot),
            3 => Some(Operation::Dismiss),
            _ => None,
        }
    }
}

/// Encode a control request.
pub fn encode_request(operation: Operation) -> [u8; REQUEST_SIZE] {
    let mut packet = [0u8; REQUEST_SIZE];
    for (chunk, value) in packet
        .chunks_exact_mut(4)
        .zip([IDENTIFIER, PROTOCOL_VERSION, operation.code()])
    {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    packet
}

/// Parse a control request as the simulator would. Returns `None` for
/// anything that is not a well-formed 12-byte request.
pub fn decode_request(data: &[u8]) -> Option<Operation> {
    if data.len() != REQUEST_SIZE {
        return None;
    }
    let mut words = data
        .chunks_exact(4)
        .filter_map(|chunk| <[u8; 4]>::try_from(chunk).ok())
        .map(i32::from_le_bytes);
    let identifier = words.next()?;
    let version = words.next()?;
    let code = words.next()?;
    if identifier != IDENTIFIER || version != PROTOCOL_VERSION {
        return None;
    }
    Operation::from_code(code)
}
