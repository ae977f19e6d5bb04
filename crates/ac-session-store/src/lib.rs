//! On-disk artifacts of one Assetto Corsa telemetry capture session.
//!
//! A session is one directory, named after the moment the capture started:
//!
//! ```text
//! <root>/2026-10-17--14-03-59-120345/
//!     raw.csv      <unix-ts>,<base64 datagram>
//!     parsed.csv   header line, then <unix-ts>,<84 channel values>
//!     info.json    handshake descriptor, written once
//! ```
//!
//! Files are only ever appended to. Opening a directory that already exists
//! resumes both logs without repeating the header or the descriptor.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod info;
pub mod logs;
pub mod session;
pub mod timestamp;

pub use error::SessionError;
pub use info::SessionInfo;
pub use logs::{ParsedLog, RawLog, RawRecord, parsed_header};
pub use session::{INFO_FILE, PARSED_LOG, RAW_LOG, SessionStore, session_dir_name};
pub use timestamp::UnixTimestamp;
