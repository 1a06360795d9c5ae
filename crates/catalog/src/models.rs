use crate::consts::DOCUMENT_SUFFIX;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// One of the two independent document collections.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// The main multi-chapter text.
    #[display("章节")]
    Primary,
    /// Character profile documents.
    #[display("人物设定")]
    Profile,
}
impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Primary, Collection::Profile];

    /// Human-readable label, also matched by title search.
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "章节",
            Self::Profile => "人物设定",
        }
    }

    /// Only the primary sequence benefits from read-ahead.
    pub fn is_preloaded(self) -> bool {
        matches!(self, Self::Primary)
    }
}

/// Reference to a single remote document.
///
/// Created when a listing is fetched and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    /// Opaque remote path, e.g. `chapters/第1章.txt`.
    pub identifier: String,
    pub display_name: String,
    pub collection: Collection,
}
impl DocumentRef {
    /// Build a reference from a remote path, deriving the display name from
    /// the last path segment without its `.txt` suffix.
    ///
    /// ```
    /// use folio_catalog::{Collection, DocumentRef};
    /// let doc = DocumentRef::from_path(Collection::Primary, "chapters/第1章.txt");
    /// assert_eq!(doc.display_name, "第1章");
    /// ```
    pub fn from_path(collection: Collection, path: impl Into<String>) -> Self {
        let identifier = path.into();
        let file_name = identifier.rsplit('/').next().unwrap_or(&identifier);
        let display_name = file_name.strip_suffix(DOCUMENT_SUFFIX).unwrap_or(file_name).to_string();
        Self { identifier, display_name, collection }
    }
}
