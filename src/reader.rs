//! Streaming EDI tokenizer.
//!
//! [`Reader`] walks raw text against the active [`Grammar`] and yields one
//! [`Entry`] per token, driving the same [`PathCursor`] transitions as the
//! [`Writer`](crate::Writer):
//!
//! - segment tag: `SegmentName` entry carrying the tag
//! - element separator: `ElementStart`, element index + 1
//! - component separator: `ComponentStart`, component index + 1
//! - segment terminator: `SegmentTerminator`, back to no container
//! - the text between delimiters: a `String` entry, or `Null` when empty
//!
//! A release character makes the following character literal. Line breaks
//! between segments are skipped unless they are delimiters themselves.
//!
//! A `UNA` header at the start of a segment replaces the delimiters for the
//! rest of the stream, unless disabled with
//! [`ReaderOptions::with_service_string_advice`]. It yields no entry.
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::{Grammar, Reader, TokenKind};
//!
//! let mut reader = Reader::new("UNA:+.? 'PAC+1+:52+P?+K'", Grammar::edifact());
//! let entries: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
//!
//! assert_eq!(entries[0].token(), TokenKind::SegmentName);
//! assert_eq!(entries[0].value(), Some("PAC"));
//! let last = &entries[entries.len() - 2];
//! assert_eq!(last.path().to_string(), "PAC[2][0]");
//! assert_eq!(last.value(), Some("P+K"));
//! ```

use crate::grammar::SERVICE_STRING_ADVICE_TAG;
use crate::pool::{BufferPool, FreeListPool, Scratch, DEFAULT_BUFFER_CAPACITY};
use crate::{Entry, Error, Grammar, Path, PathCursor, ReadQueue, ReaderOptions, Result, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Between segments.
    Top,
    /// Directly after a segment tag.
    AfterName,
    /// After a value, expecting a delimiter.
    Delimiter,
    /// At the start of a value run.
    Value,
}

/// Tokenizes EDI text into [`Entry`] values.
///
/// After an error the reader stops; [`Reader::skip_segment`] resynchronizes
/// at the next segment terminator.
pub struct Reader<'a, P: BufferPool = FreeListPool> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    grammar: Grammar,
    options: ReaderOptions,
    cursor: PathCursor,
    state: State,
    failed: bool,
    pool: P,
    scratch: Scratch,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, grammar: Grammar) -> Self {
        Reader::with_options(input, grammar, ReaderOptions::default())
    }

    pub fn with_options(input: &'a str, grammar: Grammar, options: ReaderOptions) -> Self {
        Reader::with_pool(input, grammar, options, FreeListPool::new())
    }
}

impl<'a, P: BufferPool> Reader<'a, P> {
    /// Creates a reader that rents its unescape buffer from `pool`.
    pub fn with_pool(input: &'a str, grammar: Grammar, options: ReaderOptions, pool: P) -> Self {
        Reader {
            input,
            position: 0,
            line: 1,
            column: 1,
            grammar,
            options,
            cursor: PathCursor::new(),
            state: State::Top,
            failed: false,
            pool,
            scratch: Scratch::default(),
        }
    }

    /// The active grammar, including delimiters declared by a `UNA` header.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn path(&self) -> Path {
        self.cursor.path()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns the next entry, or `None` at the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] for separators outside of a segment or
    /// an unterminated segment, [`Error::TruncatedEscape`] for a release
    /// character at the end of input, and [`Error::Configuration`] for an
    /// invalid `UNA` header.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        if self.failed {
            return Err(Error::state(
                "reader stopped after an error, skip_segment resynchronizes",
            ));
        }
        let result = self.scan();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Discards input up to and including the next unescaped segment
    /// terminator and clears the error state.
    pub fn skip_segment(&mut self) {
        log::warn!(
            "skipping segment at line {}, column {}",
            self.line,
            self.column
        );
        let terminator = self.grammar.segment_terminator();
        let release = self.grammar.release_character();
        while let Some(c) = self.next_char() {
            if Some(c) == release {
                self.next_char();
            } else if c == terminator {
                break;
            }
        }
        self.cursor = PathCursor::new();
        self.state = State::Top;
        self.failed = false;
    }

    /// Buffers the entries of the next segment, terminator included.
    ///
    /// Called inside a segment it buffers the rest of that segment. Returns
    /// `None` at the end of input.
    pub fn read_segment(&mut self) -> Result<Option<ReadQueue>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            let done = entry.token() == TokenKind::SegmentTerminator;
            entries.push(entry);
            if done {
                break;
            }
        }
        if entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ReadQueue::from(entries)))
        }
    }

    /// Buffers up to `count` entries; fewer at the end of input.
    pub fn lookahead(&mut self, count: usize) -> Result<ReadQueue> {
        let mut entries = Vec::with_capacity(count);
        while entries.len() < count {
            match self.next_entry()? {
                Some(entry) => entries.push(entry),
                None => break,
            }
        }
        Ok(ReadQueue::from(entries))
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.input[self.position..].chars().next()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn structural(&self, msg: &str) -> Error {
        Error::structural_at(self.line, self.column, msg)
    }

    fn scan(&mut self) -> Result<Option<Entry>> {
        loop {
            match self.state {
                State::Top => {
                    self.skip_line_breaks();
                    if self.peek_char().is_none() {
                        self.scratch.release(&mut self.pool);
                        return Ok(None);
                    }
                    if self.options.recognize_service_string_advice
                        && self.input[self.position..].starts_with(SERVICE_STRING_ADVICE_TAG)
                    {
                        self.read_service_string_advice()?;
                        continue;
                    }
                    return self.read_segment_name().map(Some);
                }
                State::AfterName | State::Delimiter => {
                    let Some(c) = self.peek_char() else {
                        return Err(self.structural("unterminated segment at end of input"));
                    };
                    let after_name = self.state == State::AfterName;
                    if c == self.grammar.segment_terminator() {
                        self.next_char();
                        let path = Path::segment_only(self.cursor.segment().unwrap_or_default());
                        self.cursor.end_segment()?;
                        self.state = State::Top;
                        return Ok(Some(Entry::new(path, TokenKind::SegmentTerminator, None)));
                    }
                    if after_name && c == self.grammar.effective_name_delimiter() {
                        self.next_char();
                        self.state = State::Value;
                        continue;
                    }
                    if c == self.grammar.element_separator() {
                        self.next_char();
                        self.cursor.start_element()?;
                        self.state = State::Value;
                        return Ok(Some(Entry::new(
                            self.cursor.path(),
                            TokenKind::ElementStart,
                            None,
                        )));
                    }
                    if c == self.grammar.component_separator() {
                        if self.cursor.start_component().is_err() {
                            return Err(self
                                .structural("component separator directly after a segment tag")
                                .at_path(self.cursor.path()));
                        }
                        self.next_char();
                        self.state = State::Value;
                        return Ok(Some(Entry::new(
                            self.cursor.path(),
                            TokenKind::ComponentStart,
                            None,
                        )));
                    }
                    return Err(self.structural(&format!("unexpected character {:?}", c)));
                }
                State::Value => {
                    let text = self.read_value_run()?;
                    self.cursor.advance_value()?;
                    self.state = State::Delimiter;
                    let entry = match text {
                        Some(text) => Entry::new(self.cursor.path(), TokenKind::String, Some(text)),
                        None => Entry::new(self.cursor.path(), TokenKind::Null, None),
                    };
                    return Ok(Some(entry));
                }
            }
        }
    }

    fn skip_line_breaks(&mut self) {
        while let Some(c) = self.peek_char() {
            if (c == '\r' || c == '\n') && !self.is_body_delimiter(c) {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn is_body_delimiter(&self, c: char) -> bool {
        c == self.grammar.component_separator()
            || c == self.grammar.element_separator()
            || c == self.grammar.segment_terminator()
    }

    /// Applies a `UNA` header: the tag followed by six advice characters.
    fn read_service_string_advice(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.column);
        for _ in 0..SERVICE_STRING_ADVICE_TAG.len() {
            self.next_char();
        }
        let mut chars = [' '; 6];
        for slot in chars.iter_mut() {
            *slot = self
                .next_char()
                .ok_or_else(|| Error::structural_at(line, col, "truncated service string advice"))?;
        }
        self.grammar.set_advice_chars(chars)?;
        log::debug!(
            "service string advice at line {} redefined delimiters to {:?}",
            line,
            chars
        );
        Ok(())
    }

    fn read_segment_name(&mut self) -> Result<Entry> {
        let input = self.input;
        let start = self.position;
        let name_delimiter = self.grammar.effective_name_delimiter();
        let release = self.grammar.release_character();
        while let Some(c) = self.peek_char() {
            if c == name_delimiter || self.is_body_delimiter(c) {
                break;
            }
            if Some(c) == release {
                return Err(self.structural("release character in a segment tag"));
            }
            self.next_char();
        }
        let name = &input[start..self.position];

        if name.is_empty() {
            let msg = match self.peek_char() {
                Some(c) if c == self.grammar.segment_terminator() => {
                    "segment terminator outside of a segment"
                }
                Some(c) if c == self.grammar.component_separator() => {
                    "component separator outside of a segment"
                }
                _ => "element separator outside of a segment",
            };
            return Err(self.structural(msg));
        }

        self.cursor.start_segment(name)?;
        self.state = State::AfterName;
        log::trace!("segment {} at line {}", name, self.line);
        Ok(Entry::new(
            self.cursor.path(),
            TokenKind::SegmentName,
            Some(name.to_string()),
        ))
    }

    /// Reads text up to the next unescaped body delimiter and unescapes it.
    ///
    /// Returns `None` for an empty run.
    fn read_value_run(&mut self) -> Result<Option<String>> {
        let input = self.input;
        let start = self.position;
        let release = self.grammar.release_character();
        let mut escaped = false;

        while let Some(c) = self.peek_char() {
            if Some(c) == release {
                let (line, col) = (self.line, self.column);
                self.next_char();
                if self.next_char().is_none() {
                    return Err(Error::truncated_escape(line, col));
                }
                escaped = true;
            } else if self.is_body_delimiter(c) {
                break;
            } else {
                self.next_char();
            }
        }

        let raw = &input[start..self.position];
        if raw.is_empty() {
            return Ok(None);
        }
        let Some(release) = release.filter(|_| escaped) else {
            return Ok(Some(raw.to_string()));
        };

        let buffer = self
            .scratch
            .get(&mut self.pool, raw.len().max(DEFAULT_BUFFER_CAPACITY));
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c == release {
                if let Some(literal) = chars.next() {
                    buffer.push(literal);
                }
            } else {
                buffer.push(c);
            }
        }
        Ok(Some(buffer.as_str().to_string()))
    }
}

impl<'a, P: BufferPool> Iterator for Reader<'a, P> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_entry().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str, grammar: Grammar) -> Vec<(TokenKind, String, Option<String>)> {
        Reader::new(input, grammar)
            .map(|entry| {
                let entry = entry.unwrap();
                (
                    entry.token(),
                    entry.path().to_string(),
                    entry.value().map(str::to_string),
                )
            })
            .collect()
    }

    #[test]
    fn test_tokenize_paths() {
        let got = tokens("AAA+1+:0'\n", Grammar::edifact());
        let expected = vec![
            (TokenKind::SegmentName, "AAA".to_string(), Some("AAA".to_string())),
            (TokenKind::String, "AAA[0][0]".to_string(), Some("1".to_string())),
            (TokenKind::ElementStart, "AAA[1]".to_string(), None),
            (TokenKind::Null, "AAA[1][0]".to_string(), None),
            (TokenKind::ComponentStart, "AAA[1][1]".to_string(), None),
            (TokenKind::String, "AAA[1][1]".to_string(), Some("0".to_string())),
            (TokenKind::SegmentTerminator, "AAA".to_string(), None),
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn test_segment_without_elements() {
        let got = tokens("UNS'UNT+2'", Grammar::edifact());
        assert_eq!(got[0].0, TokenKind::SegmentName);
        assert_eq!(got[1].0, TokenKind::SegmentTerminator);
        assert_eq!(got[2].2.as_deref(), Some("UNT"));
    }

    #[test]
    fn test_unescape() {
        let got = tokens("FTX+it?'s 1?+1?:2??'", Grammar::edifact());
        assert_eq!(got[1].2.as_deref(), Some("it's 1+1:2?"));
    }

    #[test]
    fn test_tradacoms_name_delimiter_is_data_in_body() {
        let got = tokens("MHD=1+ORD=9'", Grammar::tradacoms());
        assert_eq!(got[1].2.as_deref(), Some("1"));
        assert_eq!(got[3].1, "MHD[1][0]");
        assert_eq!(got[3].2.as_deref(), Some("ORD=9"));
    }

    #[test]
    fn test_line_breaks_between_segments() {
        let got = tokens("AAA+1'\r\nBBB+2'\n", Grammar::edifact());
        let names: Vec<_> = got
            .iter()
            .filter(|t| t.0 == TokenKind::SegmentName)
            .map(|t| t.2.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_truncated_escape() {
        let mut reader = Reader::new("FTX+abc?", Grammar::edifact());
        let err = reader.find_map(|r| r.err()).unwrap();
        assert!(matches!(err, Error::TruncatedEscape { line: 1, col: 8 }));
    }

    #[test]
    fn test_separator_outside_segment() {
        for input in ["+AAA'", ":AAA'", "'"] {
            let mut reader = Reader::new(input, Grammar::edifact());
            let err = reader.next_entry().unwrap_err();
            assert!(matches!(err, Error::Structural { line: Some(1), .. }), "{}", input);
        }
    }

    #[test]
    fn test_release_character_in_segment_tag() {
        let mut reader = Reader::new("AAA+1'B?+B+2'", Grammar::edifact());
        let entries: Vec<Entry> = reader.by_ref().take(3).collect::<Result<_>>().unwrap();
        assert_eq!(entries[2].token(), TokenKind::SegmentTerminator);

        let err = reader.next_entry().unwrap_err();
        match err {
            Error::Structural { line, col, msg, .. } => {
                assert_eq!((line, col), (Some(1), Some(8)));
                assert!(msg.contains("release character"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        reader.skip_segment();
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_unterminated_segment() {
        let mut reader = Reader::new("AAA+1", Grammar::edifact());
        let result: Result<Vec<_>> = reader.by_ref().collect();
        assert!(matches!(result, Err(Error::Structural { .. })));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_skip_segment_resynchronizes() {
        let mut reader = Reader::new("AAA:1'BBB+2'", Grammar::edifact());
        reader.next_entry().unwrap();
        assert!(reader.next_entry().is_err());
        assert!(matches!(reader.next_entry(), Err(Error::State(_))));

        reader.skip_segment();
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.value(), Some("BBB"));
    }

    #[test]
    fn test_service_string_advice_switches_delimiters() {
        let input = "UNA:+.? !\nAAA+x'y!";
        let mut reader = Reader::new(input, Grammar::edifact());
        let entries: Vec<Entry> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(entries[1].value(), Some("x'y"));
        assert_eq!(reader.grammar().segment_terminator(), '!');
    }

    #[test]
    fn test_service_string_advice_disabled() {
        let options = ReaderOptions::new().with_service_string_advice(false);
        let mut reader = Reader::with_options("UNA:+.? 'AAA'", Grammar::edifact(), options);
        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.value(), Some("UNA"));
        assert!(reader.next_entry().is_err());
    }

    #[test]
    fn test_lookahead_and_read_segment() {
        let mut reader = Reader::new("AAA+1:2'BBB+3'", Grammar::edifact());
        let mut queue = reader.read_segment().unwrap().unwrap();
        assert_eq!(queue.read_as_string(&"AAA[0][1]".parse::<Path>().unwrap()), Some("2".to_string()));

        let window = reader.lookahead(2).unwrap();
        assert_eq!(window.len(), 2);
        let rest = reader.read_segment().unwrap().unwrap();
        assert_eq!(rest.len(), 1);
        assert!(reader.read_segment().unwrap().is_none());
    }
}
