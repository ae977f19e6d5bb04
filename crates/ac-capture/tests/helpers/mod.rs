//! Loopback stand-in for the simulator's Remote Telemetry endpoint.

#![allow(dead_code)]

use racing_wheel_ac_capture::CaptureConfig;
use racing_wheel_ac_remote_protocol::{
    HANDSHAKE_SIZE, Operation, TELEMETRY_FRAME_SIZE, decode_request,
};
use std::fs;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const OFF_SPEED_KMH: usize = 8;
const OFF_COORDS: usize = 316;

pub struct StubSimulator {
    socket: UdpSocket,
}

impl StubSimulator {
    pub fn bind() -> io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        socket.set_read_timeout(Some(Duration::from_secs(5)))?;
        Ok(Self { socket })
    }

    pub fn addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Next well-formed control request and its sender. Other datagrams are
    /// ignored.
    pub fn recv_request(&self) -> io::Result<(Operation, SocketAddr)> {
        let mut buf = [0u8; 64];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf)?;
            if let Some(op) = buf.get(..len).and_then(decode_request) {
                return Ok((op, peer));
            }
        }
    }

    pub fn send_to(&self, data: &[u8], peer: SocketAddr) -> io::Result<()> {
        self.socket.send_to(data, peer).map(|_| ())
    }
}

fn utf16_field(text: &str) -> Vec<u8> {
    let mut field: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    field.resize(100, 0);
    field
}

/// A 408-byte handshake reply. Names are `%`-terminated followed by junk, the
/// way the simulator pads them.
pub fn handshake_reply(car: &str, user: &str, track: &str, config: &str) -> Vec<u8> {
    let mut reply = Vec::with_capacity(HANDSHAKE_SIZE);
    reply.extend(utf16_field(&format!("{car}%junk")));
    reply.extend(utf16_field(&format!("{user}%")));
    reply.extend_from_slice(&100i32.to_le_bytes());
    reply.extend_from_slice(&1i32.to_le_bytes());
    reply.extend(utf16_field(&format!("{track}%x%y")));
    reply.extend(utf16_field(&format!("{config}%")));
    reply
}

/// A 328-byte update with the given speed and world x/z position.
pub fn telemetry_frame(speed_kmh: f32, x: f32, z: f32) -> Vec<u8> {
    let mut frame = vec![0u8; TELEMETRY_FRAME_SIZE];
    frame[OFF_SPEED_KMH..OFF_SPEED_KMH + 4].copy_from_slice(&speed_kmh.to_le_bytes());
    frame[OFF_COORDS..OFF_COORDS + 4].copy_from_slice(&x.to_le_bytes());
    frame[OFF_COORDS + 8..OFF_COORDS + 12].copy_from_slice(&z.to_le_bytes());
    frame
}

/// Short timeouts so retries happen within a test's patience.
pub fn test_config(server: SocketAddr, log_root: &Path) -> CaptureConfig {
    CaptureConfig {
        address: server.ip(),
        port: server.port(),
        log_root: log_root.to_path_buf(),
        recv_timeout_ms: 300,
        retry_backoff_ms: 50,
    }
}

/// Session directories under `root`, oldest first.
pub fn session_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

pub fn line_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}
