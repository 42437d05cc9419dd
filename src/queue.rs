//! Lookahead entry queue.
//!
//! A [`ReadQueue`] holds a short run of entries already produced by a
//! [`Reader`](crate::Reader) and hands out primitive values by path. It is
//! strictly forward-consuming: a read dequeues everything in front of the
//! matching entry, and dequeued entries are gone for good.
//!
//! ```rust
//! use edi_codec::{Entry, Path, ReadQueue, TokenKind};
//!
//! let mut queue: ReadQueue = vec![
//!     Entry::new(Path::new("A", 0, 0), TokenKind::String, Some("x".into())),
//!     Entry::new(Path::new("A", 1, 0), TokenKind::String, Some("y".into())),
//! ]
//! .into();
//!
//! assert_eq!(queue.read_as_string(&Path::new("A", 1, 0)), Some("y".to_string()));
//! assert!(!queue.contains_path(&Path::new("A", 0, 0)));
//! ```

use crate::picture::{self, Picture};
use crate::{DateFormat, Entry, Error, Path, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Forward-only buffer of tokenized entries, consumed by path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadQueue {
    entries: VecDeque<Entry>,
}

impl ReadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry a read would look at first.
    pub fn peek(&self) -> Option<&Entry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Returns true if a buffered primitive entry sits at `path`.
    pub fn contains_path(&self, path: &Path) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.token().is_primitive() && entry.path() == path)
    }

    /// Dequeues up to and including the first primitive entry at `path` and
    /// returns its text.
    ///
    /// Returns `None` without dequeuing anything when no buffered entry
    /// matches, and `None` after dequeuing when the match is `Null`.
    pub fn read_as_string(&mut self, path: &Path) -> Option<String> {
        if !self.contains_path(path) {
            return None;
        }
        while let Some(entry) = self.entries.pop_front() {
            if entry.token().is_primitive() && entry.path() == path {
                return entry.into_value();
            }
        }
        None
    }

    /// Reads a whole number, stripping suppressed leading zeros.
    ///
    /// Parsing is culture invariant: an optional sign followed by ASCII
    /// digits. Grouping marks are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] carrying `path` when the text is not a
    /// number or does not fit an `i32`.
    pub fn read_as_i32(&mut self, path: &Path) -> Result<Option<i32>> {
        match self.read_as_i64(path)? {
            Some(n) => i32::try_from(n).map(Some).map_err(|_| {
                Error::format(format!("{} does not fit a 32-bit integer", n)).at_path(path)
            }),
            None => Ok(None),
        }
    }

    /// Reads a whole number with the same invariant rules as
    /// [`ReadQueue::read_as_i32`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] carrying `path` when the text is not a number.
    pub fn read_as_i64(&mut self, path: &Path) -> Result<Option<i64>> {
        match self.read_as_string(path) {
            Some(text) => picture::decode_integer(&text).map_err(|err| err.at_path(path)),
            None => Ok(None),
        }
    }

    /// Reads a decimal through the picture codec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] carrying `path` for non-digit text.
    pub fn read_as_decimal(
        &mut self,
        path: &Path,
        picture: Option<&Picture>,
        decimal_mark: Option<char>,
    ) -> Result<Option<Decimal>> {
        match self.read_as_string(path) {
            Some(text) if !text.trim().is_empty() => {
                picture::decode_decimal(&text, picture, decimal_mark)
                    .map(Some)
                    .map_err(|err| err.at_path(path))
            }
            _ => Ok(None),
        }
    }

    /// Reads a date with `format`, or the default pattern.
    pub fn read_as_date(
        &mut self,
        path: &Path,
        format: Option<&DateFormat>,
    ) -> Result<Option<NaiveDateTime>> {
        match self.read_as_string(path) {
            Some(text) if !text.trim().is_empty() => {
                let parsed = match format {
                    Some(format) => format.parse(text.trim()),
                    None => DateFormat::default().parse(text.trim()),
                };
                parsed.map(Some).map_err(|err| err.at_path(path))
            }
            _ => Ok(None),
        }
    }

    /// Reads `1`/`0` (or `true`/`false`, any case).
    pub fn read_as_bool(&mut self, path: &Path) -> Result<Option<bool>> {
        let Some(text) = self.read_as_string(path) else {
            return Ok(None);
        };
        match text.trim() {
            "" => Ok(None),
            "1" => Ok(Some(true)),
            "0" => Ok(Some(false)),
            t if t.eq_ignore_ascii_case("true") => Ok(Some(true)),
            t if t.eq_ignore_ascii_case("false") => Ok(Some(false)),
            other => Err(Error::format(format!("'{}' is not a boolean", other)).at_path(path)),
        }
    }
}

impl From<Vec<Entry>> for ReadQueue {
    fn from(entries: Vec<Entry>) -> Self {
        ReadQueue {
            entries: entries.into(),
        }
    }
}

impl FromIterator<Entry> for ReadQueue {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        ReadQueue {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ReadQueue {
    type Item = Entry;
    type IntoIter = std::collections::vec_deque::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenKind;

    fn text(path: &str, value: &str) -> Entry {
        Entry::new(path.parse().unwrap(), TokenKind::String, Some(value.to_string()))
    }

    fn p(path: &str) -> Path {
        path.parse().unwrap()
    }

    #[test]
    fn test_no_match_discards_nothing() {
        let mut queue = ReadQueue::from(vec![text("A[0][0]", "1"), text("A[1][0]", "2")]);
        assert_eq!(queue.read_as_string(&p("B[0][0]")), None);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_structural_entries_do_not_match() {
        let mut queue = ReadQueue::from(vec![
            Entry::new(p("A[1]"), TokenKind::ElementStart, None),
            text("A[1][0]", "x"),
        ]);
        assert!(queue.contains_path(&p("A[1]")));
        assert_eq!(queue.read_as_string(&p("A[1]")), Some("x".to_string()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_null_entry_is_consumed() {
        let mut queue = ReadQueue::from(vec![
            Entry::new(p("A[0][0]"), TokenKind::Null, None),
            text("A[0][1]", "x"),
        ]);
        assert_eq!(queue.read_as_string(&p("A[0][0]")), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_numeric_reads() {
        let mut queue = ReadQueue::from(vec![
            text("QTY[0][0]", "ZZ12"),
            text("QTY[0][1]", "Z"),
            text("QTY[0][2]", "3000000000"),
            text("QTY[0][3]", "12a"),
        ]);
        assert_eq!(queue.read_as_i32(&p("QTY[0][0]")).unwrap(), Some(12));
        assert_eq!(queue.read_as_i64(&p("QTY[0][1]")).unwrap(), None);
        let err = queue.read_as_i32(&p("QTY[0][2]")).unwrap_err();
        assert_eq!(err.path(), Some("QTY[0][2]"));
        let err = queue.read_as_i64(&p("QTY[0][3]")).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(err.path(), Some("QTY[0][3]"));
    }

    #[test]
    fn test_decimal_and_date_reads() {
        let picture: Picture = "9(1)V9(2)".parse().unwrap();
        let mut queue = ReadQueue::from(vec![
            text("MOA[0][1]", "1042"),
            text("DTM[0][1]", "20121010"),
            text("DTM[0][2]", ""),
        ]);
        assert_eq!(
            queue
                .read_as_decimal(&p("MOA[0][1]"), Some(&picture), None)
                .unwrap(),
            Some(Decimal::new(1042, 2))
        );
        let format = DateFormat::new("yyyyMMdd").unwrap();
        let date = queue
            .read_as_date(&p("DTM[0][1]"), Some(&format))
            .unwrap()
            .unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2012-10-10");
        assert_eq!(queue.read_as_date(&p("DTM[0][2]"), None).unwrap(), None);
    }

    #[test]
    fn test_bool_reads() {
        let mut queue = ReadQueue::from(vec![
            text("A[0][0]", "1"),
            text("A[0][1]", "FALSE"),
            text("A[0][2]", "maybe"),
        ]);
        assert_eq!(queue.read_as_bool(&p("A[0][0]")).unwrap(), Some(true));
        assert_eq!(queue.read_as_bool(&p("A[0][1]")).unwrap(), Some(false));
        assert!(queue.read_as_bool(&p("A[0][2]")).is_err());
    }
}
