use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::sanitize;

/// Strategy calibredb applies when an added book duplicates an existing one.
///
/// Passed through as `--automerge=<value>`. Parsing never fails: an
/// unrecognised value is normalised to [`Ignore`](Self::Ignore) with a
/// warning, matching the tool's most conservative behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AutomergePolicy {
    /// Overwrite the existing file with the new one, keeping a single record.
    Overwrite,
    /// Create an entirely new record alongside the existing one.
    NewRecord,
    /// Leave the library untouched and report the duplicate as a conflict.
    #[default]
    Ignore,
}

impl AutomergePolicy {
    /// The value calibredb expects on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomergePolicy::Overwrite => "overwrite",
            AutomergePolicy::NewRecord => "new_record",
            AutomergePolicy::Ignore => "ignore",
        }
    }
}

impl FromStr for AutomergePolicy {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "overwrite" => Self::Overwrite,
            "new_record" | "newrecord" => Self::NewRecord,
            "ignore" => Self::Ignore,
            _ => {
                tracing::warn!(value = %s, "automerge value not supported, using \"ignore\"");
                Self::Ignore
            },
        })
    }
}
impl From<String> for AutomergePolicy {
    fn from(value: String) -> Self {
        value.as_str().parse().unwrap_or_default()
    }
}

impl Display for AutomergePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("overwrite", AutomergePolicy::Overwrite)]
    #[case("new_record", AutomergePolicy::NewRecord)]
    #[case("new-record", AutomergePolicy::NewRecord)]
    #[case("ignore", AutomergePolicy::Ignore)]
    #[case(" Overwrite ", AutomergePolicy::Overwrite)]
    fn parses_known_values(#[case] input: &str, #[case] expected: AutomergePolicy) {
        assert_eq!(input.parse::<AutomergePolicy>().unwrap(), expected);
    }

    #[rstest]
    #[case("bogus")]
    #[case("")]
    #[case("overwrite_all")]
    fn unknown_values_normalise_to_ignore(#[case] input: &str) {
        // Never an error, always the conservative default.
        assert_eq!(input.parse::<AutomergePolicy>().unwrap(), AutomergePolicy::Ignore);
    }

    #[test]
    fn default_is_ignore() {
        assert_eq!(AutomergePolicy::default(), AutomergePolicy::Ignore);
    }

    #[test]
    fn round_trips_through_as_str() {
        for policy in [AutomergePolicy::Overwrite, AutomergePolicy::NewRecord, AutomergePolicy::Ignore] {
            assert_eq!(policy.as_str().parse::<AutomergePolicy>().unwrap(), policy);
        }
    }
}
