//! Thread-safe wrapper around the `calibredb` command-line tool.
//!
//! calibredb is the only supported way to manipulate a calibre library from
//! outside calibre itself, and it refuses all concurrent access to its
//! storage. This crate turns its subcommands into typed operations: commands
//! are built as structured argument lists, executed one at a time under an
//! exclusive lock, and their free-form output is parsed back into results.

pub mod cmdline;
pub mod error;
pub mod models;
pub mod outcome;
pub mod upload;

mod client;
mod consts;
mod runner;

pub use crate::client::CalibreClient;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::models::{AutomergePolicy, Book};
pub use crate::outcome::AddOutcome;
pub use crate::runner::CommandRunner;
