use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Suffix of every remote entry that is a readable document.
pub(crate) const DOCUMENT_SUFFIX: &str = ".txt";

// Chapter markers: "第", the numeral, then "章". The bare form without "第"
// is only consulted when no "第" marker is present. The numeral capture
// accepts any run of non-marker characters so that junk between the markers
// fails validation instead of matching a shorter numeral.
regex!(CHAPTER_MARKER_REGEX, r"第\s*([^\s第章]+)\s*章");
regex!(BARE_CHAPTER_MARKER_REGEX, r"([^\s第章]+)\s*章");
