use folio_catalog::Collection;
use std::fmt;

/// Position within the active listing, as shown next to the document title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub collection: Collection,
    /// Zero-based listing index.
    pub index: usize,
    pub total: usize,
}
impl Progress {
    pub fn label(&self) -> String {
        let number = self.index + 1;
        match self.collection {
            Collection::Primary => format!("第 {number} 章 / 共 {} 章", self.total),
            Collection::Profile => format!("人物设定 {number}/{}", self.total),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Which of the previous/next controls lead anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    pub previous: bool,
    pub next: bool,
}
impl Navigation {
    pub fn at(index: usize, total: usize) -> Self {
        Self { previous: index > 0 && total > 0, next: index.saturating_add(1) < total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Collection::Primary, 0, 12, "第 1 章 / 共 12 章")]
    #[case(Collection::Primary, 11, 12, "第 12 章 / 共 12 章")]
    #[case(Collection::Profile, 2, 5, "人物设定 3/5")]
    fn test_label(#[case] collection: Collection, #[case] index: usize, #[case] total: usize, #[case] expected: &str) {
        assert_eq!(Progress { collection, index, total }.to_string(), expected);
    }

    #[rstest]
    #[case(0, 3, false, true)]
    #[case(1, 3, true, true)]
    #[case(2, 3, true, false)]
    #[case(0, 1, false, false)]
    #[case(0, 0, false, false)]
    fn test_navigation(#[case] index: usize, #[case] total: usize, #[case] previous: bool, #[case] next: bool) {
        assert_eq!(Navigation::at(index, total), Navigation { previous, next });
    }
}
