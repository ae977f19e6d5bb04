//! Assetto Corsa Remote Telemetry capture.
//!
//! [`ProtocolClient`] owns the UDP socket and the handshake → subscribe →
//! dismiss sequence. [`CaptureLoop`] drives it forever: every datagram goes to
//! the raw log, telemetry frames also go to the parsed log, and a transport
//! failure tears everything down and starts a new session.
//!
//! Everything runs on the calling thread with blocking I/O. The only
//! cross-thread state is the [`StopSignal`], which a Ctrl-C handler sets and
//! the loop polls between datagrams.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod capture;
pub mod client;
pub mod config;
pub mod reprocess;
pub mod stop;

pub use capture::{CaptureError, CaptureLoop, CaptureStats, DatagramOutcome, record_datagram};
pub use client::{ClientError, ClientState, MAX_DATAGRAM_SIZE, ProtocolClient};
pub use config::{CaptureConfig, ConfigError};
pub use reprocess::{REPROCESSED_LOG, ReprocessError, ReprocessSummary, reprocess_session};
pub use stop::StopSignal;
