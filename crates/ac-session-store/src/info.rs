//! `info.json` session descriptor.

use crate::UnixTimestamp;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use racing_wheel_ac_remote_protocol::Handshake;
use serde::{Deserialize, Serialize};

/// What the simulator announced at handshake time, plus the raw reply so it
/// can be decoded again later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unix seconds at which the descriptor was written.
    pub log_ts: f64,
    pub car: String,
    pub user: String,
    pub identifier: i32,
    pub version: i32,
    pub track: String,
    pub track_config: String,
    /// Base64 of the 408-byte handshake reply.
    pub raw_info: String,
}

impl SessionInfo {
    pub fn new(handshake: &Handshake, log_ts: UnixTimestamp) -> Self {
        let info = &handshake.info;
        Self {
            log_ts: log_ts.as_secs_f64(),
            car: info.car_name.clone(),
            user: info.user_name.clone(),
            identifier: info.identifier,
            version: info.version,
            track: info.track_name.clone(),
            track_config: info.track_config.clone(),
            raw_info: BASE64.encode(&handshake.raw),
        }
    }

    /// Raw handshake reply bytes.
    ///
    /// # Errors
    ///
    /// Fails if `raw_info` is not valid base64.
    pub fn raw_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.raw_info)
    }
}
