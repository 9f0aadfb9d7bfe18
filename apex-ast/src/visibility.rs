use serde::{Deserialize, Serialize};

/// Half-open is deliberately not used here: both ends are byte offsets into
/// the source text and `begin <= end` always holds for produced ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteRange {
    pub begin: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.begin <= offset && offset <= self.end
    }
}

/// Visibility carried as data on each declaration.
///
/// The resolver and the completion engine consult the rule uniformly
/// instead of branching on where a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum Visibility {
    /// Visible everywhere: types, top-level declarations, class members.
    AlwaysVisible,
    /// Excluded from visible sets, e.g. non-public members of workspace types.
    NeverVisible,
    /// Visible at any cursor offset at or past the declaration begin.
    VisibleAfterDeclaration,
    /// Visible for cursor offsets in `[declaration.begin, scope_end]`.
    #[serde(rename_all = "camelCase")]
    VisibleBetweenDeclarationAndScopeEnd { scope_end: usize },
}

impl Visibility {
    /// Whether a declaration starting at `begin` is in scope at `offset`.
    pub fn admits(&self, begin: usize, offset: usize) -> bool {
        match *self {
            Visibility::AlwaysVisible => true,
            Visibility::NeverVisible => false,
            Visibility::VisibleAfterDeclaration => offset >= begin,
            Visibility::VisibleBetweenDeclarationAndScopeEnd { scope_end } => {
                begin <= offset && offset <= scope_end
            }
        }
    }
}
