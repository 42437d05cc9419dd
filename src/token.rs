//! Token kinds and tokenized entries.

use crate::Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an EDI token.
///
/// Structural markers move the container state; primitive kinds carry a
/// value and stay at the current path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    SegmentName,
    ElementStart,
    ComponentStart,
    SegmentTerminator,
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Null,
}

impl TokenKind {
    /// Returns true for value-carrying kinds, including `Null`.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Integer
                | TokenKind::Float
                | TokenKind::Boolean
                | TokenKind::Date
                | TokenKind::Null
        )
    }

    #[must_use]
    pub const fn is_structural(self) -> bool {
        !self.is_primitive()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One tokenized unit: its path, its kind and its raw (unescaped) text.
///
/// Segment name entries carry the tag as text. Primitive entries carry the
/// field text, or nothing for `Null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    path: Path,
    token: TokenKind,
    value: Option<String>,
}

impl Entry {
    pub fn new(path: Path, token: TokenKind, value: Option<String>) -> Self {
        Entry { path, token, value }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> TokenKind {
        self.token
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn into_value(self) -> Option<String> {
        self.value
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.to_string();
        let path = if path.is_empty() { "-" } else { path.as_str() };
        write!(f, "{} {}", path, self.value.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_kinds() {
        assert!(TokenKind::Null.is_primitive());
        assert!(TokenKind::Date.is_primitive());
        assert!(!TokenKind::ElementStart.is_primitive());
        assert!(TokenKind::SegmentTerminator.is_structural());
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry::new(
            "PAC[1][1]".parse().unwrap(),
            TokenKind::String,
            Some("52".to_string()),
        );
        assert!(entry.has_value());
        assert_eq!(entry.to_string(), "PAC[1][1] 52");

        let null = Entry::new("PAC[1][0]".parse().unwrap(), TokenKind::Null, None);
        assert!(!null.has_value());
    }
}
