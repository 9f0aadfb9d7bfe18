use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Case-insensitive identifier wrapper.
///
/// Apex identifiers compare without regard to case, but editors expect the
/// casing the author wrote. Equality and hashing fold ASCII `A-Z`; the
/// original spelling is preserved for display. Folding is deliberately
/// ASCII-only and locale-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationName {
    original: String,
}

impl DeclarationName {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
        }
    }

    /// The identifier as the author wrote it.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Case-insensitive comparison against a raw identifier.
    pub fn matches(&self, other: &str) -> bool {
        self.original.eq_ignore_ascii_case(other)
    }

    /// Exact comparison, casing included.
    pub fn matches_exact(&self, other: &str) -> bool {
        self.original == other
    }

    /// Case-insensitive prefix test, used by completion filtering.
    pub fn starts_with_ignore_case(&self, prefix: &str) -> bool {
        let name = self.original.as_bytes();
        let prefix = prefix.as_bytes();
        name.len() >= prefix.len()
            && name
                .iter()
                .zip(prefix.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Lower-cased form, used as the key of persisted index maps.
    pub fn folded(&self) -> String {
        self.original.to_ascii_lowercase()
    }
}

impl PartialEq for DeclarationName {
    fn eq(&self, other: &Self) -> bool {
        self.original.eq_ignore_ascii_case(&other.original)
    }
}

impl Eq for DeclarationName {}

impl Hash for DeclarationName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.original.bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for DeclarationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl From<&str> for DeclarationName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeclarationName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
