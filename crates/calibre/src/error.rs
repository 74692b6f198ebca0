//! Calibre Wrapper Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A wrapper error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for wrapper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Caller-supplied input rejected before any external invocation.
    #[display("invalid {what}: {value}")]
    InvalidInput {
        /// What was rejected (e.g. "id", "limit").
        what: &'static str,
        /// The offending value, stringified.
        value: String,
    },
    /// The calibredb executable could not be located or started.
    #[display("calibredb executable not found: {}", _0.display())]
    ExecutableNotFound(#[error(not(source))] PathBuf),
    /// No `metadata.db` at the configured library path.
    #[display("no calibre library found at {}", _0.display())]
    LibraryNotFound(#[error(not(source))] PathBuf),
    /// A file handed to us (book upload, OPF metadata) does not exist.
    #[display("file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// Another calibre instance holds the library. Retryable; the wrapper
    /// itself never retries.
    #[display("another calibre instance is running (`{command}` exited with status {exit_code})")]
    Concurrency {
        /// The command that was rejected.
        command: String,
        /// Exit code reported by calibredb.
        exit_code: i32,
    },
    /// calibredb ran and exited non-zero for any other reason.
    #[display("`{command}` exited with status {exit_code}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// Exit code reported by calibredb.
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
    /// An add attempt was refused because a matching book already exists.
    /// The message carries enough text for the caller to retry with
    /// `automerge=overwrite`.
    #[display("book already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// calibredb output matched none of the known patterns. Always logged
    /// with the full command and both streams before being raised; indicates
    /// tool-version drift or a genuine bug.
    #[display("could not interpret calibredb output")]
    UnexpectedOutput,
    /// Upload filename carries an extension outside the e-book allow-list.
    #[display("unsupported file format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Only a concurrent calibre instance is transient; everything else
        // needs caller or operator intervention.
        matches!(self, Self::Concurrency { .. })
    }
}
