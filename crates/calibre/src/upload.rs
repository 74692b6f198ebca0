//! Upload filename validation.
//!
//! The wrapper only ever hands calibredb files it recognises as e-book
//! formats, and refuses names that could be mistaken for command-line flags.

use crate::error::{ErrorKind, Result};
use std::path::Path;

/// File extensions `calibredb add` accepts, lowercase, without the dot.
pub const ALLOWED_FILE_EXTENSIONS: &[&str] = &[
    "azw", "azw3", "azw4", "cbz", "cbr", "cb7", "cbc", "chm", "djvu", "docx", "epub", "fb2",
    "fbz", "html", "htmlz", "lit", "lrf", "mobi", "odt", "pdf", "prc", "pdb", "pml", "rb", "rtf",
    "snb", "tcr", "txt", "txtz",
];

/// Validate an uploaded filename before it gets anywhere near a command line.
///
/// Names beginning with `-` are rejected outright (argument injection), and
/// the extension must be on the e-book allow-list (case-insensitive).
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.starts_with('-') {
        exn::bail!(ErrorKind::InvalidInput { what: "filename", value: filename.to_string() });
    }
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_FILE_EXTENSIONS.contains(&extension.as_str()) {
        exn::bail!(ErrorKind::UnsupportedFormat(filename.to_string()));
    }
    Ok(())
}
