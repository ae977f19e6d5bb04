//! Session directory lifecycle.

use crate::{ParsedLog, RawLog, SessionError, SessionInfo, UnixTimestamp};
use chrono::{DateTime, Utc};
use racing_wheel_ac_remote_protocol::{Handshake, TelemetryFrame};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const RAW_LOG: &str = "raw.csv";
pub const PARSED_LOG: &str = "parsed.csv";
pub const INFO_FILE: &str = "info.json";

/// Directory name for a session started at `at`.
///
/// UTC with microseconds, `YYYY-MM-DD--HH-MM-SS-ffffff`: sorts in creation
/// order and contains no characters that need escaping on any filesystem.
pub fn session_dir_name(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d--%H-%M-%S-%6f").to_string()
}

/// The open logs of one capture session.
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    raw: RawLog,
    parsed: ParsedLog,
    created: bool,
}

impl SessionStore {
    /// Open a new session under `root`, named after the current time.
    ///
    /// # Errors
    ///
    /// As for [`SessionStore::open_at`].
    pub fn open(root: &Path, handshake: Option<&Handshake>) -> Result<Self, SessionError> {
        let dir = root.join(session_dir_name(Utc::now()));
        Self::open_at(dir, handshake)
    }

    /// Open the session in `dir`.
    ///
    /// A fresh directory gets the parsed header and, when `handshake` is
    /// known, `info.json`. An existing directory is resumed: both logs are
    /// appended to and nothing else is written.
    ///
    /// # Errors
    ///
    /// [`SessionError::CreateDir`] if the directory cannot be created,
    /// [`SessionError::Open`] or [`SessionError::Write`] for the log files and
    /// [`SessionError::Info`] if `info.json` cannot be serialised.
    pub fn open_at(
        dir: impl Into<PathBuf>,
        handshake: Option<&Handshake>,
    ) -> Result<Self, SessionError> {
        let dir = dir.into();
        let created = create_session_dir(&dir)?;

        let raw = RawLog::open(dir.join(RAW_LOG))?;
        let parsed = ParsedLog::open(dir.join(PARSED_LOG), created)?;

        if created {
            if let Some(handshake) = handshake {
                let info = SessionInfo::new(handshake, UnixTimestamp::now());
                write_info(&dir.join(INFO_FILE), &info)?;
            }
            info!(
                dir = %dir.display(),
                raw = %raw.path().display(),
                parsed = %parsed.path().display(),
                car = handshake.map(|h| h.info.car_name.as_str()),
                track = handshake.map(|h| h.info.track_name.as_str()),
                "Session created"
            );
        } else {
            info!(
                dir = %dir.display(),
                raw = %raw.path().display(),
                parsed = %parsed.path().display(),
                "Session directory exists, appending"
            );
        }

        Ok(Self {
            dir,
            raw,
            parsed,
            created,
        })
    }

    /// Append one received datagram, decoded or not.
    ///
    /// # Errors
    ///
    /// [`SessionError::Write`] if `raw.csv` cannot be written.
    pub fn append_raw(
        &mut self,
        timestamp: UnixTimestamp,
        datagram: &[u8],
    ) -> Result<(), SessionError> {
        self.raw.append(timestamp, datagram)
    }

    /// Append one decoded telemetry frame.
    ///
    /// # Errors
    ///
    /// [`SessionError::Write`] if `parsed.csv` cannot be written.
    pub fn append_parsed(
        &mut self,
        timestamp: UnixTimestamp,
        frame: &TelemetryFrame,
    ) -> Result<(), SessionError> {
        self.parsed.append(timestamp, frame)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether this open created the directory (as opposed to resuming it).
    pub fn is_new(&self) -> bool {
        self.created
    }
}

/// Returns `true` when the directory did not exist before.
fn create_session_dir(dir: &Path) -> Result<bool, SessionError> {
    let create_err = |source| SessionError::CreateDir {
        path: dir.to_path_buf(),
        source,
    };

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(create_err)?;
    }

    match fs::create_dir(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {
            debug!(dir = %dir.display(), "Reopening existing session directory");
            Ok(false)
        }
        Err(e) => Err(create_err(e)),
    }
}

fn write_info(path: &Path, info: &SessionInfo) -> Result<(), SessionError> {
    let file = File::create(path).map_err(|source| SessionError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, info).map_err(|source| SessionError::Info {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    })
}
