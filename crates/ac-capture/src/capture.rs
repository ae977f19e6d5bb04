//! The capture loop: receive → log raw → decode → log parsed.

use crate::{CaptureConfig, ClientError, ProtocolClient, StopSignal};
use racing_wheel_ac_remote_protocol::{DecodeError, Decoded, decode};
use racing_wheel_ac_session_store::{SessionError, SessionStore, UnixTimestamp};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Log files could not be written. Not retried.
    #[error("session storage failed: {0}")]
    Storage(#[from] SessionError),

    /// The socket failed mid-session. Handled by restarting the capture.
    #[error("transport failed: {0}")]
    Transport(#[from] ClientError),
}

/// What happened to one datagram after its raw line was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// Telemetry frame, parsed line written.
    Frame,
    /// Handshake-sized datagram in the middle of the stream; not telemetry.
    Handshake,
    /// Neither known size.
    Undecodable(DecodeError),
}

/// Counters over the lifetime of a [`CaptureLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub sessions: u64,
    pub restarts: u64,
    pub datagrams: u64,
    pub frames: u64,
    pub unexpected_handshakes: u64,
    pub decode_failures: u64,
}

impl CaptureStats {
    fn record(&mut self, outcome: DatagramOutcome) {
        self.datagrams = self.datagrams.saturating_add(1);
        let counter = match outcome {
            DatagramOutcome::Frame => &mut self.frames,
            DatagramOutcome::Handshake => &mut self.unexpected_handshakes,
            DatagramOutcome::Undecodable(_) => &mut self.decode_failures,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Persist one datagram.
///
/// The raw line is always written first, so a datagram the decoder cannot
/// handle today can be reprocessed later.
///
/// # Errors
///
/// [`SessionError`] when either log cannot be written. Decode failures are
/// reported through [`DatagramOutcome`] instead.
pub fn record_datagram(
    session: &mut SessionStore,
    timestamp: UnixTimestamp,
    datagram: &[u8],
) -> Result<DatagramOutcome, SessionError> {
    session.append_raw(timestamp, datagram)?;

    match decode(datagram) {
        Ok(Decoded::Telemetry(frame)) => {
            session.append_parsed(timestamp, &frame)?;
            Ok(DatagramOutcome::Frame)
        }
        Ok(Decoded::Handshake(info)) => {
            warn!(
                car = %info.car_name,
                track = %info.track_name,
                "Handshake reply received mid-stream, not logged as telemetry"
            );
            Ok(DatagramOutcome::Handshake)
        }
        Err(e) => {
            info!(len = e.observed_len(), "Unexpected datagram size, skipping parse");
            Ok(DatagramOutcome::Undecodable(e))
        }
    }
}

/// Runs capture sessions until stopped or until the log files fail.
#[derive(Debug)]
pub struct CaptureLoop {
    config: CaptureConfig,
    stop: StopSignal,
    stats: CaptureStats,
}

impl CaptureLoop {
    pub fn new(config: CaptureConfig, stop: StopSignal) -> Self {
        Self {
            config,
            stop,
            stats: CaptureStats::default(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Connect, open a session, capture; on a transport failure start over
    /// with a fresh connection and a fresh session.
    ///
    /// Returns when the stop signal is observed.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Storage`] if a session cannot be created or appended
    /// to. The socket is dismissed before returning.
    pub fn run(&mut self) -> Result<CaptureStats, CaptureError> {
        loop {
            let mut client = ProtocolClient::new(&self.config);
            match client.connect(&self.stop) {
                Ok(()) => {}
                Err(ClientError::Stopped) => {
                    info!("Stop requested before a session was opened");
                    return Ok(self.stats);
                }
                Err(e) => return Err(e.into()),
            }

            let mut session = match SessionStore::open(&self.config.log_root, client.handshake()) {
                Ok(session) => session,
                Err(e) => {
                    error!(
                        log_root = %self.config.log_root.display(),
                        error = %e,
                        "Cannot open session"
                    );
                    client.disconnect();
                    return Err(e.into());
                }
            };
            self.stats.sessions = self.stats.sessions.saturating_add(1);

            let result = self.capture_session(&mut client, &mut session);
            client.disconnect();

            match result {
                Ok(()) => {
                    info!(dir = %session.dir().display(), stats = ?self.stats, "Capture stopped");
                    return Ok(self.stats);
                }
                Err(CaptureError::Storage(e)) => {
                    error!(dir = %session.dir().display(), error = %e, "Session storage failed");
                    return Err(CaptureError::Storage(e));
                }
                Err(CaptureError::Transport(e)) => {
                    error!(dir = %session.dir().display(), error = %e, "Capture interrupted");
                    info!(stats = ?self.stats, "Restarting everything");
                    self.stats.restarts = self.stats.restarts.saturating_add(1);
                }
            }
        }
    }

    fn capture_session(
        &mut self,
        client: &mut ProtocolClient,
        session: &mut SessionStore,
    ) -> Result<(), CaptureError> {
        while !self.stop.is_triggered() {
            let datagram = match client.receive() {
                Ok(datagram) => datagram,
                Err(e) if self.stop.is_triggered() => {
                    debug!(error = %e, "Receive ended after stop request");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let outcome = record_datagram(session, UnixTimestamp::now(), &datagram)?;
            self.stats.record(outcome);
        }
        Ok(())
    }
}
