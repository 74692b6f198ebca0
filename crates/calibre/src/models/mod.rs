mod automerge;
mod book;

pub use self::automerge::AutomergePolicy;
pub use self::book::Book;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('-', "_").replace(' ', "_")
}
