//! Line-oriented CSV logs.
//!
//! Each append is one complete line. Writers are line-buffered, so a line is
//! handed to the OS as soon as it is written and any I/O error surfaces on the
//! append that caused it.

use crate::SessionError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use racing_wheel_ac_remote_protocol::{CHANNEL_NAMES, TelemetryFrame};
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// Header line of a parsed log: `time` followed by every channel name.
pub fn parsed_header() -> String {
    let mut header = String::from("time");
    for name in CHANNEL_NAMES {
        header.push(',');
        header.push_str(name);
    }
    header
}

fn open_append(path: &Path) -> Result<LineWriter<File>, SessionError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(LineWriter::new)
        .map_err(|source| SessionError::Open {
            path: path.to_path_buf(),
            source,
        })
}

fn write_line(
    writer: &mut LineWriter<File>,
    path: &Path,
    line: std::fmt::Arguments<'_>,
) -> Result<(), SessionError> {
    writer
        .write_fmt(line)
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(|source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// `raw.csv`: `<ts>,<base64>` per received datagram.
#[derive(Debug)]
pub struct RawLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl RawLog {
    /// Open for append, creating the file if needed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Open`] if the file cannot be opened for append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let writer = open_append(&path)?;
        Ok(Self { path, writer })
    }

    /// Write `<timestamp>,<base64>`.
    ///
    /// # Errors
    ///
    /// [`SessionError::Write`] if the line cannot be written.
    pub fn append(&mut self, timestamp: impl Display, datagram: &[u8]) -> Result<(), SessionError> {
        let encoded = BASE64.encode(datagram);
        write_line(
            &mut self.writer,
            &self.path,
            format_args!("{timestamp},{encoded}"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `parsed.csv`: header line, then `<ts>,<channels...>` per telemetry frame.
#[derive(Debug)]
pub struct ParsedLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl ParsedLog {
    /// Open for append, creating the file if needed. The header is written
    /// only when `write_header` is set.
    ///
    /// # Errors
    ///
    /// [`SessionError::Open`] if the file cannot be opened for append,
    /// [`SessionError::Write`] if the header cannot be written.
    pub fn open(path: impl Into<PathBuf>, write_header: bool) -> Result<Self, SessionError> {
        let path = path.into();
        let writer = open_append(&path)?;
        let mut log = Self { path, writer };
        if write_header {
            let header = parsed_header();
            write_line(&mut log.writer, &log.path, format_args!("{header}"))?;
        }
        Ok(log)
    }

    /// Write `<timestamp>,<channels...>`.
    ///
    /// # Errors
    ///
    /// [`SessionError::Write`] if the line cannot be written.
    pub fn append(
        &mut self,
        timestamp: impl Display,
        frame: &TelemetryFrame,
    ) -> Result<(), SessionError> {
        let fields = frame.to_csv_fields();
        write_line(
            &mut self.writer,
            &self.path,
            format_args!("{timestamp},{fields}"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One line of a raw log read back for reprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Timestamp exactly as written, so reprocessed output keeps its precision.
    pub timestamp: String,
    pub datagram: Vec<u8>,
}

impl RawRecord {
    /// Parse `<ts>,<base64>`.
    ///
    /// # Errors
    ///
    /// [`SessionError::MalformedRecord`] when the separator is missing or the
    /// payload is not base64.
    pub fn parse_line(line: &str) -> Result<Self, SessionError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (timestamp, payload) = line
            .split_once(',')
            .ok_or_else(|| SessionError::MalformedRecord(format!("missing ',' in '{line}'")))?;
        let datagram = BASE64
            .decode(payload.trim())
            .map_err(|e| SessionError::MalformedRecord(format!("bad base64 payload: {e}")))?;
        Ok(Self {
            timestamp: timestamp.trim().to_string(),
            datagram,
        })
    }
}
