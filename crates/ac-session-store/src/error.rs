//! Session storage errors. All of them mean the environment is broken
//! (disk full, permissions) and none is retried.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create session directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize session info to '{}': {source}", path.display())]
    Info {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed raw log line: {0}")]
    MalformedRecord(String),
}
