//! Well-known state keys and key validation.
//!
//! The key names are a stable on-disk contract: renaming one silently drops
//! whatever a previous session persisted under the old name.

use crate::error::{ErrorKind, Result};

/// Cached listing of the primary (chapter) collection.
pub const CHAPTER_LISTING: &str = "chapterListCache";
/// Cached listing of the profile (character) collection.
pub const CHARACTER_LISTING: &str = "characterListCache";
/// Prefix of cached primary document bodies (`chapter_{sanitizedPath}`).
pub const CHAPTER_PREFIX: &str = "chapter";
/// Prefix of cached profile document bodies (`character_{sanitizedPath}`).
pub const CHARACTER_PREFIX: &str = "character";

/// Identifier (remote path) of the document last displayed.
pub const LAST_DOCUMENT: &str = "lastChapter";
/// Listing index of the last displayed primary document.
pub const LAST_CHAPTER_INDEX: &str = "lastChapterIndex";
/// Listing index of the last displayed profile document.
pub const LAST_CHARACTER_INDEX: &str = "lastCharacterIndex";
/// `"true"` when the last displayed document was a profile.
pub const IS_CHARACTER: &str = "isCharacterChapter";
/// Live scroll offset of the current document.
pub const SCROLL_POSITION: &str = "scrollPosition";
/// Explicitly saved reading position (JSON snapshot).
pub const BOOKMARK: &str = "bookmark";

/// Every key that together makes up the persisted *current* position.
pub const POSITION_KEYS: [&str; 5] = [LAST_DOCUMENT, LAST_CHAPTER_INDEX, LAST_CHARACTER_INDEX, IS_CHARACTER, SCROLL_POSITION];

/// Replace every character that is not alphanumeric, `.`, `-` or `_` with `_`.
///
/// ```
/// use folio_storage::keys::sanitize;
/// assert_eq!(sanitize("chapters/第1章.txt"), "chapters_第1章.txt");
/// assert_eq!(sanitize("a b/c?d"), "a_b_c_d");
/// ```
pub fn sanitize(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Build the key a document body is cached under.
///
/// ```
/// use folio_storage::keys::{CHAPTER_PREFIX, document_key};
/// assert_eq!(document_key(CHAPTER_PREFIX, "chapters/1.txt"), "chapter_chapters_1.txt");
/// ```
pub fn document_key(prefix: &str, path: &str) -> String {
    format!("{prefix}_{}", sanitize(path))
}

/// Validates a state key.
///
/// Keys double as file names for [`LocalStore`](crate::backend::LocalStore),
/// so anything that could escape the store root or collide with its
/// temporary files is rejected with [`InvalidKey`](ErrorKind::InvalidKey).
///
/// ```
/// use folio_storage::validate_key;
/// assert!(validate_key("chapterListCache").is_ok());
/// assert!(validate_key("chapter_chapters_第1章.txt").is_ok());
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key(".hidden").is_err());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    let invalid = key.is_empty()
        || key.starts_with('.')
        || key.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
        || key.chars().any(char::is_control);
    if invalid {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    Ok(key)
}
