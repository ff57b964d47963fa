use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Drive-style file identifiers, bare or inside a sharing URL.
regex!(FILE_ID_REGEX, r"[-\w]{25,}");
// Anything that may not appear in a filename segment.
regex!(UNSAFE_CHARS_REGEX, r"[^A-Za-z0-9_]+");
regex!(UNDERSCORES_REGEX, r"_{2,}");
