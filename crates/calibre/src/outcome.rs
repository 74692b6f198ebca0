//! Classification of `calibredb add` output.
//!
//! The add subcommand reports what happened as free-form text. This module
//! matches it against an ordered pattern table: first match wins and the
//! remaining patterns are never consulted, so a conflict on stderr always
//! outranks a success line on stdout.

use crate::consts;
use regex::Regex;
use std::sync::LazyLock;

/// Typed outcome of one add invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// New records were created, with their assigned ids.
    Added(Vec<u64>),
    /// The book was merged into existing records. A single add can merge
    /// into several books at once.
    Merged(Vec<u64>),
    /// calibredb refused the add because a matching book already exists.
    /// Carries the raw (trimmed) stdout identifying the duplicate.
    Conflict(String),
}

enum Stream {
    Stdout,
    Stderr,
}

enum Kind {
    Conflict,
    Merged,
    Added,
}

/// Pattern table in priority order. Evaluated top to bottom.
static PATTERNS: &[(Stream, &LazyLock<Regex>, Kind)] = &[
    (Stream::Stderr, &consts::BOOK_IGNORED, Kind::Conflict),
    (Stream::Stdout, &consts::BOOK_MERGED, Kind::Merged),
    (Stream::Stdout, &consts::BOOK_ADDED, Kind::Added),
];

/// Match captured add output against the pattern table.
///
/// Returns `None` when no pattern matches; the caller owns the command and
/// is responsible for logging the full diagnostics before raising.
pub fn classify(stdout: &str, stderr: &str) -> Option<AddOutcome> {
    for (stream, regex, kind) in PATTERNS {
        let haystack = match stream {
            Stream::Stdout => stdout,
            Stream::Stderr => stderr,
        };
        let Some(captures) = regex.captures(haystack) else { continue };
        let ids = captures.get(1).map(|m| parse_ids(m.as_str())).unwrap_or_default();
        return Some(match kind {
            Kind::Conflict => AddOutcome::Conflict(stdout.trim().to_string()),
            Kind::Merged => AddOutcome::Merged(ids),
            Kind::Added => AddOutcome::Added(ids),
        });
    }
    None
}

fn parse_ids(list: &str) -> Vec<u64> {
    list.split(',').filter_map(|id| id.trim().parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_ids_parse_with_spaces() {
        let outcome = classify("Added book ids: 7, 8", "");
        assert_eq!(outcome, Some(AddOutcome::Added(vec![7, 8])));
    }

    #[test]
    fn merged_ids_parse() {
        let outcome = classify("Merged book ids: 3, 14, 15", "");
        assert_eq!(outcome, Some(AddOutcome::Merged(vec![3, 14, 15])));
    }

    #[test]
    fn conflict_carries_trimmed_stdout() {
        let stderr = "The following books were not added as they already exist in the database:\n";
        let outcome = classify("  Dune by Frank Herbert\n", stderr);
        assert_eq!(outcome, Some(AddOutcome::Conflict("Dune by Frank Herbert".to_string())));
    }

    #[test]
    fn conflict_outranks_added() {
        // Both streams match; the stderr conflict pattern is checked first
        // and the remaining patterns must not be consulted.
        let stderr = "The following books were not added as they already exist in the database:\n";
        let outcome = classify("Added book ids: 9", stderr);
        assert_eq!(outcome, Some(AddOutcome::Conflict("Added book ids: 9".to_string())));
    }

    #[test]
    fn merged_outranks_added() {
        let outcome = classify("Merged book ids: 2", "");
        assert!(matches!(outcome, Some(AddOutcome::Merged(_))));
    }

    #[test]
    fn patterns_anchor_to_the_start_of_the_stream() {
        assert_eq!(classify("some preamble\nAdded book ids: 1", ""), None);
    }

    #[test]
    fn unrecognised_output_is_unclassified() {
        assert_eq!(classify("something entirely different", "and on stderr too"), None);
    }

    #[test]
    fn structural_match_with_no_numeric_ids_yields_empty_list() {
        // The caller treats an empty list as a fatal inconsistency; the
        // classifier just reports what it parsed.
        assert_eq!(classify("Added book ids: ,", ""), Some(AddOutcome::Added(vec![])));
    }
}
