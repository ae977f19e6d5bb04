//! Remote Telemetry UDP client.
//!
//! Connecting is a three-step exchange: send HANDSHAKE, wait for the 408-byte
//! reply, then send SUBSCRIBE_UPDATE and SUBSCRIBE_SPOT. The simulator then
//! streams 328-byte updates to the socket until it receives DISMISS.
//!
//! The socket is not connected. Requests go to the configured server address,
//! and datagrams are accepted from any source, since a multi-homed simulator
//! host may answer from a different interface than the one addressed.

use crate::{CaptureConfig, StopSignal};
use racing_wheel_ac_remote_protocol::{HANDSHAKE_SIZE, Handshake, Operation, encode_request};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Receive buffer size. Larger datagrams are truncated by the OS.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no datagram within {0:?}")]
    Timeout(Duration),

    #[error("UDP transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("client is not connected")]
    NotConnected,

    #[error("stop requested while connecting")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Handshaking,
    /// Subscribed to updates and spot events.
    Connected,
}

/// Owns the socket for one connection to the simulator.
#[derive(Debug)]
pub struct ProtocolClient {
    server: SocketAddr,
    recv_timeout: Duration,
    retry_backoff: Duration,
    socket: Option<UdpSocket>,
    state: ClientState,
    handshake: Option<Handshake>,
}

impl ProtocolClient {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            server: config.server_addr(),
            recv_timeout: config.recv_timeout(),
            retry_backoff: config.retry_backoff(),
            socket: None,
            state: ClientState::Disconnected,
            handshake: None,
        }
    }

    /// Handshake and subscribe, retrying after the backoff until it works.
    ///
    /// There is no retry limit; the only way out other than success is the
    /// stop signal. A socket left open by an earlier connect is dismissed
    /// first.
    ///
    /// # Errors
    ///
    /// [`ClientError::Stopped`] once the stop signal is observed, before or
    /// between attempts.
    pub fn connect(&mut self, stop: &StopSignal) -> Result<(), ClientError> {
        let mut attempt: u32 = 0;
        loop {
            if stop.is_triggered() {
                self.disconnect();
                return Err(ClientError::Stopped);
            }

            attempt = attempt.saturating_add(1);
            info!(server = %self.server, attempt, "Trying to connect");

            match self.try_connect() {
                Ok(()) => {
                    info!(server = %self.server, attempt, "Connected");
                    return Ok(());
                }
                Err(e) => {
                    error!(server = %self.server, attempt, error = %e, "Connection attempt failed");
                    self.disconnect();
                    if stop.sleep(self.retry_backoff) {
                        return Err(ClientError::Stopped);
                    }
                }
            }
        }
    }

    fn try_connect(&mut self) -> Result<(), ClientError> {
        self.disconnect();
        self.handshake = None;
        self.socket = Some(self.open_socket()?);
        self.state = ClientState::Handshaking;

        self.send(Operation::Handshake)?;
        let reply = self.receive()?;
        if reply.len() == HANDSHAKE_SIZE {
            match Handshake::from_reply(&reply) {
                Ok(handshake) => {
                    let info = &handshake.info;
                    info!(
                        car = %info.car_name,
                        user = %info.user_name,
                        track = %info.track_name,
                        track_config = %info.track_config,
                        version = info.version,
                        "Handshake received"
                    );
                    self.handshake = Some(handshake);
                }
                Err(e) => warn!(error = %e, "Could not decode handshake reply"),
            }
        } else {
            warn!(
                len = reply.len(),
                expected = HANDSHAKE_SIZE,
                "Unexpected handshake reply size, continuing without session info"
            );
        }

        self.send(Operation::SubscribeUpdate)?;
        self.send(Operation::SubscribeSpot)?;
        self.state = ClientState::Connected;
        Ok(())
    }

    fn open_socket(&self) -> Result<UdpSocket, ClientError> {
        let bind_addr = match self.server {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(self.recv_timeout))?;
        debug!(local = ?socket.local_addr().ok(), server = %self.server, "UDP socket opened");
        Ok(socket)
    }

    fn send(&self, operation: Operation) -> Result<(), ClientError> {
        let socket = self.socket.as_ref().ok_or(ClientError::NotConnected)?;
        socket.send_to(&encode_request(operation), self.server)?;
        debug!(?operation, "Request sent");
        Ok(())
    }

    /// Block until the next datagram arrives or the receive timeout expires.
    ///
    /// # Errors
    ///
    /// [`ClientError::Timeout`] when nothing arrives in time,
    /// [`ClientError::NotConnected`] without an open socket, and
    /// [`ClientError::Transport`] for any other socket failure.
    pub fn receive(&mut self) -> Result<Vec<u8>, ClientError> {
        let socket = self.socket.as_ref().ok_or(ClientError::NotConnected)?;
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((len, _)) => Ok(buf.get(..len).map(<[u8]>::to_vec).unwrap_or_default()),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(ClientError::Timeout(self.recv_timeout))
            }
            Err(e) => Err(ClientError::Transport(e)),
        }
    }

    /// Send DISMISS if possible, then close the socket regardless.
    pub fn disconnect(&mut self) {
        if let Some(socket) = self.socket.take() {
            match socket.send_to(&encode_request(Operation::Dismiss), self.server) {
                Ok(_) => debug!(server = %self.server, "Dismiss sent"),
                Err(e) => warn!(server = %self.server, error = %e, "Failed to send dismiss"),
            }
        }
        self.state = ClientState::Disconnected;
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Handshake from the last successful connect, if the reply was 408 bytes.
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        if self.socket.is_some() {
            self.disconnect();
        }
    }
}
