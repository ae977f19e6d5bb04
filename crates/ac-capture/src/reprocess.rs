//! Rebuild a parsed log from a session's raw log.
//!
//! Raw lines are kept exactly so that captures can be decoded again with a
//! newer decoder. The output goes next to the originals as
//! `parsed.reprocessed.csv`; `parsed.csv` is left untouched.

use racing_wheel_ac_remote_protocol::{Decoded, decode};
use racing_wheel_ac_session_store::{ParsedLog, RAW_LOG, RawRecord, SessionError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub const REPROCESSED_LOG: &str = "parsed.reprocessed.csv";

#[derive(Debug, Error)]
pub enum ReprocessError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Storage(#[from] SessionError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReprocessSummary {
    pub lines: u64,
    pub frames: u64,
    pub handshakes: u64,
    pub undecodable: u64,
    pub malformed: u64,
}

/// Decode every line of `<dir>/raw.csv` into `<dir>/parsed.reprocessed.csv`.
///
/// Lines that are not `<ts>,<base64>` are counted and skipped.
///
/// # Errors
///
/// [`ReprocessError::Read`] if `raw.csv` cannot be read,
/// [`ReprocessError::Storage`] if the output cannot be written.
pub fn reprocess_session(dir: &Path) -> Result<ReprocessSummary, ReprocessError> {
    let raw_path = dir.join(RAW_LOG);
    let read_err = |source| ReprocessError::Read {
        path: raw_path.clone(),
        source,
    };
    let reader = BufReader::new(File::open(&raw_path).map_err(read_err)?);

    let out_path = dir.join(REPROCESSED_LOG);
    if out_path.exists() {
        warn!(path = %out_path.display(), "Replacing previous reprocessed log");
        fs::remove_file(&out_path).map_err(|source| SessionError::Write {
            path: out_path.clone(),
            source,
        })?;
    }
    let mut parsed = ParsedLog::open(&out_path, true)?;

    let mut summary = ReprocessSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(read_err)?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines = summary.lines.saturating_add(1);

        let record = match RawRecord::parse_line(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = index.saturating_add(1), error = %e, "Skipping malformed raw line");
                summary.malformed = summary.malformed.saturating_add(1);
                continue;
            }
        };

        match decode(&record.datagram) {
            Ok(decoded) => {
                trace!(line = index.saturating_add(1), kind = decoded.kind(), "Decoded raw line");
                match decoded {
                    Decoded::Telemetry(frame) => {
                        parsed.append(&record.timestamp, &frame)?;
                        summary.frames = summary.frames.saturating_add(1);
                    }
                    Decoded::Handshake(_) => {
                        summary.handshakes = summary.handshakes.saturating_add(1);
                    }
                }
            }
            Err(e) => {
                debug!(line = index.saturating_add(1), error = %e, "Undecodable datagram");
                summary.undecodable = summary.undecodable.saturating_add(1);
            }
        }
    }

    info!(
        dir = %dir.display(),
        output = %parsed.path().display(),
        lines = summary.lines,
        frames = summary.frames,
        undecodable = summary.undecodable,
        malformed = summary.malformed,
        "Reprocessed raw log"
    );
    Ok(summary)
}
