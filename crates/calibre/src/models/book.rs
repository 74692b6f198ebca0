use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A single calibre library record.
///
/// Every field is optional: only populated fields are rendered into command
/// flags, and `calibredb list --for-machine` omits or nulls anything unset.
/// An `id` of `0` means "not yet assigned"; any operation addressing an
/// existing record requires `id > 0`.
///
/// `identifiers` is a scheme→value mapping (`isbn`, `doi`, …). A `BTreeMap`
/// keeps keys unique and the rendered `key:value` pairs deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: u64,
    pub uuid: Option<String>,
    pub title: Option<String>,
    /// Ordered author list. calibredb reports this as a single string joined
    /// with `" & "`; both shapes deserialize.
    #[serde(deserialize_with = "ampersand_list")]
    pub authors: Vec<String>,
    pub author_sort: Option<String>,
    pub identifiers: BTreeMap<String, String>,
    pub isbn: Option<String>,
    pub tags: Vec<String>,
    pub languages: Vec<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub cover: Option<String>,
    pub rating: Option<u8>,
    pub publisher: Option<String>,
    /// HTML fragment, passed through untouched.
    pub comments: Option<String>,
    pub pubdate: Option<String>,
    pub timestamp: Option<String>,
    pub last_modified: Option<String>,
    /// Paths of the formats calibre holds for this record. Read-only.
    pub formats: Vec<String>,
    pub size: Option<u64>,
}

impl Book {
    /// A record with only an id set, for addressing existing books.
    pub fn with_id(id: u64) -> Self {
        Self { id, ..Self::default() }
    }
}

/// Accepts either a JSON list of strings or calibredb's `"A & B"` join.
fn ampersand_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrJoined {
        List(Vec<String>),
        Joined(String),
    }
    Ok(match Option::<ListOrJoined>::deserialize(deserializer)? {
        Some(ListOrJoined::List(list)) => list,
        Some(ListOrJoined::Joined(joined)) => {
            joined.split(" & ").map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
        },
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_for_machine_payload() {
        // Trimmed-down `calibredb list --for-machine --fields=all` output.
        let json = r#"{
            "id": 4,
            "title": "A Wizard of Earthsea",
            "authors": "Ursula K. Le Guin",
            "tags": ["fantasy", "classic"],
            "languages": ["eng"],
            "identifiers": {"isbn": "9780547773742"},
            "series": null,
            "series_index": 1.0,
            "rating": 8,
            "size": 410223,
            "formats": ["/library/le-guin/earthsea.epub"],
            "last_modified": "2023-05-01T10:31:00+00:00"
        }"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.id, 4);
        assert_eq!(book.authors, vec!["Ursula K. Le Guin"]);
        assert_eq!(book.tags, vec!["fantasy", "classic"]);
        assert_eq!(book.identifiers.get("isbn").map(String::as_str), Some("9780547773742"));
        assert_eq!(book.series, None);
        assert_eq!(book.rating, Some(8));
        assert_eq!(book.formats.len(), 1);
    }

    #[test]
    fn authors_joined_string_splits() {
        let book: Book = serde_json::from_str(r#"{"authors": "Terry Pratchett & Neil Gaiman"}"#).unwrap();
        assert_eq!(book.authors, vec!["Terry Pratchett", "Neil Gaiman"]);
    }

    #[test]
    fn authors_list_passes_through() {
        let book: Book = serde_json::from_str(r#"{"authors": ["Terry Pratchett", "Neil Gaiman"]}"#).unwrap();
        assert_eq!(book.authors, vec!["Terry Pratchett", "Neil Gaiman"]);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        // --fields=all includes columns we don't model (custom columns etc).
        let book: Book = serde_json::from_str(r#"{"id": 1, "*genre": "scifi", "template": ""}"#).unwrap();
        assert_eq!(book.id, 1);
    }

    #[test]
    fn default_is_fully_unset() {
        let book = Book::default();
        assert_eq!(book.id, 0);
        assert!(book.title.is_none());
        assert!(book.authors.is_empty());
        assert!(book.identifiers.is_empty());
    }
}
