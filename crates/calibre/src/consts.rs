use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// calibredb refuses to run while another calibre process has the library
// open; the message is anchored to the start of stderr.
regex!(CONCURRENCY_ERR, r"^Another calibre program.*is running");
regex!(CALIBRE_VERSION, r"calibre ([\d.]+)");
regex!(BOOK_ADDED, r"^Added book ids: ([0-9, ]+)");
regex!(BOOK_MERGED, r"^Merged book ids: ([0-9, ]+)");
regex!(BOOK_IGNORED, r"^The following books were not added as they already exist");
