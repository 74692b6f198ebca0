//! Structured command construction for calibredb invocations.
//!
//! Commands are built as a program plus an ordered list of argument tokens,
//! never as a single string that gets re-split later. Quoting only exists in
//! the [`Display`] rendering (for logs and error payloads); the runner hands
//! the tokens to the OS untouched, so embedded spaces can't break anything.

use crate::models::Book;
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// A calibredb command under construction: executable plus argument tokens.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Append a single pre-formed token (subcommand, `--for-machine`, …).
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Append `--<name> <value>` as two tokens. The value is trimmed.
    pub fn flag(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        self.args.push(format!("--{name}"));
        self.args.push(value.as_ref().trim().to_string());
        self
    }

    /// Append a valueless `--<name>` switch.
    pub fn switch(&mut self, name: &str) -> &mut Self {
        self.args.push(format!("--{name}"));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Shell-quote a value for display. Values without spaces pass through bare.
fn quote(s: &str) -> Cow<'_, str> {
    match s.contains(' ') {
        true => Cow::Owned(format!("'{}'", s.replace('\'', r"'\''"))),
        false => Cow::Borrowed(s),
    }
}

/// Book fields that can be rendered into command flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AuthorSort,
    Authors,
    Comments,
    Cover,
    Identifiers,
    Isbn,
    Languages,
    Pubdate,
    Publisher,
    Rating,
    Series,
    SeriesIndex,
    Size,
    Tags,
    Timestamp,
    Title,
}

/// Field → flag-name table for the `add` subcommand, in render order.
///
/// Identifiers are terminal: they always render last, and nothing is
/// appended after them.
const ADD_FLAGS: &[(Field, &str)] = &[
    (Field::Authors, "authors"),
    (Field::Cover, "cover"),
    (Field::Isbn, "isbn"),
    (Field::Languages, "languages"),
    (Field::Series, "series"),
    (Field::SeriesIndex, "series-index"),
    (Field::Tags, "tags"),
    (Field::Title, "title"),
    (Field::Identifiers, "identifier"),
];

/// Allow-list for `set_metadata`, rendered as repeated `--field name:value`.
/// Rendering identifiers short-circuits the remaining scan; the `add` and
/// update verbs expose different option surfaces, hence two tables.
const UPDATE_FIELDS: &[Field] = &[
    Field::AuthorSort,
    Field::Authors,
    Field::Comments,
    Field::Identifiers,
    Field::Languages,
    Field::Pubdate,
    Field::Publisher,
    Field::Rating,
    Field::Series,
    Field::SeriesIndex,
    Field::Size,
    Field::Tags,
    Field::Timestamp,
    Field::Title,
];

impl Field {
    /// The `--field` key used by `set_metadata`.
    fn name(self) -> &'static str {
        match self {
            Field::AuthorSort => "author_sort",
            Field::Authors => "authors",
            Field::Comments => "comments",
            Field::Cover => "cover",
            Field::Identifiers => "identifiers",
            Field::Isbn => "isbn",
            Field::Languages => "languages",
            Field::Pubdate => "pubdate",
            Field::Publisher => "publisher",
            Field::Rating => "rating",
            Field::Series => "series",
            Field::SeriesIndex => "series_index",
            Field::Size => "size",
            Field::Tags => "tags",
            Field::Timestamp => "timestamp",
            Field::Title => "title",
        }
    }

    /// Render this field's value from a record, or `None` when unpopulated.
    ///
    /// Authors join with `" & "`, every other list joins with `","`, and
    /// identifiers render each entry as `key:value` joined with `","`.
    /// Elements are trimmed before joining.
    fn render(self, book: &Book) -> Option<String> {
        match self {
            Field::Authors => join_nonempty(&book.authors, " & "),
            Field::Tags => join_nonempty(&book.tags, ","),
            Field::Languages => join_nonempty(&book.languages, ","),
            Field::Identifiers => match book.identifiers.is_empty() {
                true => None,
                false => Some(
                    book.identifiers
                        .iter()
                        .map(|(scheme, value)| format!("{}:{}", scheme.trim(), value.trim()))
                        .collect::<Vec<_>>()
                        .join(","),
                ),
            },
            Field::AuthorSort => nonempty(book.author_sort.as_deref()),
            Field::Comments => nonempty(book.comments.as_deref()),
            Field::Cover => nonempty(book.cover.as_deref()),
            Field::Isbn => nonempty(book.isbn.as_deref()),
            Field::Pubdate => nonempty(book.pubdate.as_deref()),
            Field::Publisher => nonempty(book.publisher.as_deref()),
            Field::Series => nonempty(book.series.as_deref()),
            Field::Timestamp => nonempty(book.timestamp.as_deref()),
            Field::Title => nonempty(book.title.as_deref()),
            Field::Rating => book.rating.map(|r| r.to_string()),
            // Zero means "unset", same as an absent value.
            Field::SeriesIndex => book.series_index.filter(|i| *i != 0.0).map(|i| i.to_string()),
            Field::Size => book.size.filter(|s| *s != 0).map(|s| s.to_string()),
        }
    }
}

fn nonempty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn join_nonempty(values: &[String], separator: &str) -> Option<String> {
    let trimmed: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    match trimmed.is_empty() {
        true => None,
        false => Some(trimmed.join(separator)),
    }
}

/// Append `add` flags for every populated field, in table order.
/// The command is left unchanged when no record is supplied.
pub fn append_add_flags(cmd: &mut CommandLine, book: Option<&Book>) {
    let Some(book) = book else { return };
    for &(field, flag) in ADD_FLAGS {
        if let Some(value) = field.render(book) {
            cmd.flag(flag, value);
            if field == Field::Identifiers {
                break;
            }
        }
    }
}

/// Append `set_metadata` update flags (`--field name:value`) for every
/// populated allow-listed field. Rendering identifiers stops the scan.
pub fn append_update_flags(cmd: &mut CommandLine, book: Option<&Book>) {
    let Some(book) = book else { return };
    for &field in UPDATE_FIELDS {
        if let Some(value) = field.render(book) {
            cmd.flag("field", format!("{}:{value}", field.name()));
            if field == Field::Identifiers {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn cmd() -> CommandLine {
        let mut cmd = CommandLine::new("/opt/calibre/calibredb");
        cmd.arg("add");
        cmd
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("two words", "'two words'")]
    #[case("it's", "it's")]
    #[case("it's two words", r"'it'\''s two words'")]
    fn quoting_only_applies_to_values_with_spaces(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote(input), expected);
    }

    #[test]
    fn no_record_leaves_command_unchanged() {
        let mut command = cmd();
        let before = command.args().to_vec();
        append_add_flags(&mut command, None);
        assert_eq!(command.args(), before.as_slice());
    }

    #[test]
    fn authors_join_into_one_quoted_value() {
        let book = Book { authors: vec!["A B".into(), "C".into()], ..Book::default() };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["add", "--authors", "A B & C"]);
        assert_eq!(command.to_string(), "/opt/calibre/calibredb add --authors 'A B & C'");
    }

    #[test]
    fn identifiers_join_into_one_flag() {
        let mut identifiers = BTreeMap::new();
        identifiers.insert("isbn".to_string(), "123".to_string());
        identifiers.insert("x".to_string(), "y".to_string());
        let book = Book { identifiers, ..Book::default() };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["add", "--identifier", "isbn:123,x:y"]);
    }

    #[test]
    fn add_flags_render_in_fixed_order_with_identifiers_last() {
        let mut identifiers = BTreeMap::new();
        identifiers.insert("isbn".to_string(), "123".to_string());
        let book = Book {
            title: Some("Dune".into()),
            authors: vec!["Frank Herbert".into()],
            tags: vec!["scifi".into(), "classic".into()],
            identifiers,
            ..Book::default()
        };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(
            command.args(),
            [
                "add",
                "--authors",
                "Frank Herbert",
                "--tags",
                "scifi,classic",
                "--title",
                "Dune",
                "--identifier",
                "isbn:123",
            ],
        );
    }

    #[test]
    fn values_are_trimmed_before_rendering() {
        let book = Book {
            title: Some("  Dune  ".into()),
            authors: vec![" Frank Herbert ".into()],
            ..Book::default()
        };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["add", "--authors", "Frank Herbert", "--title", "Dune"]);
    }

    #[test]
    fn empty_list_elements_are_dropped() {
        let book = Book { tags: vec!["  ".into(), "scifi".into(), String::new()], ..Book::default() };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["add", "--tags", "scifi"]);
    }

    #[test]
    fn update_flags_use_field_key_value_form() {
        let book = Book {
            title: Some("Dune".into()),
            rating: Some(9),
            ..Book::default()
        };
        let mut command = CommandLine::new("calibredb");
        append_update_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["--field", "rating:9", "--field", "title:Dune"]);
    }

    #[test]
    fn update_scan_short_circuits_after_identifiers() {
        let mut identifiers = BTreeMap::new();
        identifiers.insert("isbn".to_string(), "123".to_string());
        let book = Book {
            // comments sorts before identifiers in the allow-list, title after
            comments: Some("good".into()),
            title: Some("Dune".into()),
            identifiers,
            ..Book::default()
        };
        let mut command = CommandLine::new("calibredb");
        append_update_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["--field", "comments:good", "--field", "identifiers:isbn:123"]);
    }

    #[test]
    fn zero_series_index_is_treated_as_unset() {
        let book = Book { series_index: Some(0.0), ..Book::default() };
        let mut command = cmd();
        append_add_flags(&mut command, Some(&book));
        assert_eq!(command.args(), ["add"]);
    }
}
