//! Capture configuration.

use racing_wheel_ac_remote_protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where to capture from and where to write.
///
/// Every field has a default, so a YAML file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Simulator address.
    pub address: IpAddr,
    /// Simulator Remote Telemetry port.
    pub port: u16,
    /// Directory that holds one folder per session.
    pub log_root: PathBuf,
    /// Receive timeout for the handshake reply and every datagram after it.
    pub recv_timeout_ms: u64,
    /// Delay before retrying a failed handshake.
    pub retry_backoff_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            log_root: PathBuf::from("./log"),
            recv_timeout_ms: 2_000,
            retry_backoff_ms: 5_000,
        }
    }
}

impl CaptureConfig {
    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed YAML, [`ConfigError::Invalid`]
    /// when validation fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, otherwise as for
    /// [`CaptureConfig::from_yaml_str`].
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// A zero receive timeout would make the socket block forever.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `recv_timeout_ms` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "recv_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
