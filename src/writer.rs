//! Streaming EDI writer.
//!
//! [`Writer`] turns a sequence of typed write calls into the exact text of
//! one stream in a single pass. Container state lives in a [`PathCursor`];
//! separators are held back and emitted right before the next value, so a
//! segment that ends early never carries trailing empty elements.
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::{Grammar, TokenKind, Writer, WriterOptions};
//!
//! let mut writer = Writer::with_options(Vec::new(), Grammar::edifact(), WriterOptions::compact());
//! writer.write_segment_name("PAC").unwrap();
//! writer.write_value(1).unwrap();
//! writer.write_token(TokenKind::ElementStart).unwrap();
//! writer.write_token(TokenKind::Null).unwrap();
//! writer.write_value(52).unwrap();
//! writer.write_token(TokenKind::ElementStart).unwrap();
//! writer.write_value("PK").unwrap();
//! writer.write_segment_terminator().unwrap();
//!
//! let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(output, "PAC+1+:52+PK'");
//! ```

use crate::options::LINE_ENDING;
use crate::picture::{self, Picture};
use crate::pool::{BufferPool, FreeListPool, Scratch, DEFAULT_BUFFER_CAPACITY};
use crate::{
    Advice, ContainerType, DateFormat, Entry, Error, Formatting, Grammar, Path, PathCursor,
    Result, TokenKind, Value, WriterOptions,
};
use rust_decimal::Decimal;
use std::io;
use std::str::FromStr;

/// Rendered field text: `Text` is escaped on output, `Verbatim` is not.
enum Field {
    Text(String),
    Verbatim(String),
}

/// Writes EDI tokens to an [`io::Write`] sink.
///
/// Scratch space for escaping is rented from `P` and handed back on
/// [`close`](Writer::close). Dropping an unclosed writer closes it and
/// discards any error.
pub struct Writer<W: io::Write, P: BufferPool = FreeListPool> {
    sink: Option<W>,
    grammar: Grammar,
    options: WriterOptions,
    cursor: PathCursor,
    escaped: Vec<char>,
    pending: String,
    default_date: DateFormat,
    pool: P,
    scratch: Scratch,
    closed: bool,
}

impl<W: io::Write> Writer<W> {
    /// Creates a writer with default options (line per segment).
    pub fn new(sink: W, grammar: Grammar) -> Self {
        Writer::with_options(sink, grammar, WriterOptions::default())
    }

    pub fn with_options(sink: W, grammar: Grammar, options: WriterOptions) -> Self {
        Writer::with_pool(sink, grammar, options, FreeListPool::new())
    }
}

impl<W: io::Write, P: BufferPool> Writer<W, P> {
    /// Creates a writer that rents its scratch buffer from `pool`.
    pub fn with_pool(sink: W, grammar: Grammar, options: WriterOptions, pool: P) -> Self {
        let escaped = escape_set(&grammar, &options);
        Writer {
            sink: Some(sink),
            grammar,
            options,
            cursor: PathCursor::new(),
            escaped,
            pending: String::with_capacity(4),
            default_date: DateFormat::default(),
            pool,
            scratch: Scratch::default(),
            closed: false,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Path of the value most recently written, or of the container just opened.
    pub fn path(&self) -> Path {
        self.cursor.path()
    }

    pub fn container(&self) -> ContainerType {
        self.cursor.container()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Starts a segment, terminating the open one first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedValue`] when `name` is empty or contains a
    /// delimiter, and [`Error::State`] after close.
    pub fn write_segment_name(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        if name.is_empty() || name.chars().any(|c| self.grammar.is_special(c)) {
            return Err(Error::unsupported_value(format!(
                "'{}' is not a valid segment name",
                name
            )));
        }
        if self.cursor.in_segment() {
            self.write_segment_terminator()?;
        }

        self.cursor.start_segment(name)?;
        log::trace!("segment {}", name);
        self.emit(name)?;
        self.pending.push(self.grammar.effective_name_delimiter());
        Ok(())
    }

    /// Writes a structural token or `Null`.
    ///
    /// `ElementStart` and `ComponentStart` queue their separator for the next
    /// value. `Null` moves to the next value position and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] for a token out of container order and
    /// [`Error::UnsupportedValue`] for `SegmentName` or a value kind without
    /// a value.
    pub fn write_token(&mut self, token: TokenKind) -> Result<()> {
        self.ensure_open()?;
        match token {
            TokenKind::ElementStart => {
                self.cursor.start_element()?;
                self.pending.push(self.grammar.element_separator());
            }
            TokenKind::ComponentStart => {
                self.cursor.start_component()?;
                self.pending.push(self.grammar.component_separator());
            }
            TokenKind::SegmentTerminator => self.write_segment_terminator()?,
            TokenKind::Null => {
                if self.cursor.advance_value()? {
                    self.pending.push(self.grammar.component_separator());
                }
            }
            TokenKind::SegmentName => {
                return Err(Error::unsupported_value(
                    "a segment name token needs a name, use write_segment_name",
                ))
            }
            kind => {
                return Err(Error::unsupported_value(format!(
                    "{} token written without a value",
                    kind
                )))
            }
        }
        Ok(())
    }

    /// Writes one value in its default text form.
    pub fn write_value(&mut self, value: impl Into<Value>) -> Result<()> {
        self.write_value_with(value, None, None)
    }

    /// Writes one value, formatting numbers through `picture` and dates
    /// through `date_format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] outside of a segment,
    /// [`Error::UnsupportedValue`] for text that cannot be escaped, and
    /// [`Error::Format`] when the value does not fit an alphanumeric picture.
    pub fn write_value_with(
        &mut self,
        value: impl Into<Value>,
        picture: Option<&Picture>,
        date_format: Option<&DateFormat>,
    ) -> Result<()> {
        self.ensure_open()?;
        let value = value.into();
        if value.is_null() {
            return self.write_token(TokenKind::Null);
        }
        if !self.cursor.in_segment() {
            return Err(Error::structural(None, "value outside of a segment"));
        }

        let field = self.render(&value, picture, date_format).map_err(|err| {
            let mut next = self.cursor.clone();
            match next.advance_value() {
                Ok(_) => err.at_path(next.path()),
                Err(_) => err,
            }
        })?;

        if self.cursor.advance_value()? {
            self.pending.push(self.grammar.component_separator());
        }
        self.flush_pending()?;
        match field {
            Field::Text(text) => self.emit_escaped(&text),
            Field::Verbatim(text) => self.emit(&text),
        }
    }

    /// Replays an entry produced by a [`Reader`](crate::Reader).
    ///
    /// Primitive entries are written as text; entries without text as `Null`.
    pub fn write_entry(&mut self, entry: &Entry) -> Result<()> {
        match entry.token() {
            TokenKind::SegmentName => self.write_segment_name(entry.value().unwrap_or_default()),
            kind if kind.is_structural() => self.write_token(kind),
            _ => match entry.value() {
                Some(text) => self.write_value(text),
                None => self.write_token(TokenKind::Null),
            },
        }
    }

    /// Writes `fragment` unescaped and unvalidated, after any queued separator.
    pub fn write_raw(&mut self, fragment: &str) -> Result<()> {
        self.ensure_open()?;
        self.flush_pending()?;
        self.emit(fragment)
    }

    /// Terminates the open segment.
    ///
    /// Separators queued for a value that never came are dropped.
    pub fn write_segment_terminator(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.cursor.end_segment()?;
        self.pending.clear();
        let mut terminator = [0u8; 4];
        let terminator = self.grammar.segment_terminator().encode_utf8(&mut terminator);
        self.emit(terminator)?;
        self.emit_line_break()
    }

    /// Writes the `UNA` header for the current grammar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] inside a segment and
    /// [`Error::Configuration`] for dialects without a service string advice.
    pub fn write_service_string_advice(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.cursor.in_segment() {
            return Err(Error::structural(
                Some(self.cursor.path().to_string()),
                "service string advice inside a segment",
            ));
        }
        let advice = self.grammar.service_string_advice().ok_or_else(|| {
            Error::configuration(format!(
                "{:?} has no service string advice",
                self.grammar.dialect()
            ))
        })?;
        self.emit(&advice)?;
        self.emit_line_break()
    }

    /// Swaps the delimiter set between two segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] inside a segment and
    /// [`Error::Configuration`] for an invalid delimiter set; the grammar is
    /// unchanged on error.
    pub fn redefine_delimiters(&mut self, advice: Advice) -> Result<()> {
        self.ensure_open()?;
        if self.cursor.in_segment() {
            return Err(Error::structural(
                Some(self.cursor.path().to_string()),
                "delimiters redefined inside a segment",
            ));
        }
        self.grammar.set_advice(advice)?;
        self.escaped = escape_set(&self.grammar, &self.options);
        log::debug!(
            "writer delimiters redefined to {:?}",
            self.grammar.advice_chars()
        );
        Ok(())
    }

    /// Flushes the sink. A no-op after close.
    pub fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Terminates an open segment, flushes, and returns the scratch buffer.
    ///
    /// Closing twice is a no-op; every write after close fails with
    /// [`Error::State`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.cursor.in_segment() {
            self.write_segment_terminator()?;
        }
        self.flush()?;
        self.scratch.release(&mut self.pool);
        self.closed = true;
        log::debug!("writer closed");
        Ok(())
    }

    /// Closes the writer and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        self.sink
            .take()
            .ok_or_else(|| Error::state("writer sink already taken"))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::state("write after close"))
        } else {
            Ok(())
        }
    }

    fn render(
        &self,
        value: &Value,
        picture: Option<&Picture>,
        date_format: Option<&DateFormat>,
    ) -> Result<Field> {
        let mark = self.grammar.decimal_mark();
        let field = match value {
            Value::Null => Field::Verbatim(String::new()),
            Value::String(s) => self.text(s.clone(), picture)?,
            Value::Char(c) => self.text(c.to_string(), picture)?,
            Value::Guid(u) => self.text(u.hyphenated().to_string(), picture)?,
            Value::Uri(u) => self.text(u.to_string(), picture)?,
            Value::Boolean(b) => Field::Verbatim(if *b { "1" } else { "0" }.to_string()),
            Value::Integer(n) => Field::Verbatim(picture::encode_integer(*n, picture, mark)?),
            Value::BigInteger(n) => {
                let text = n.to_string();
                match picture {
                    Some(p) if p.is_numeric() => {
                        let decimal = Decimal::from_str(&text).map_err(|_| {
                            Error::unsupported_value(format!(
                                "{} does not fit a numeric picture",
                                text
                            ))
                        })?;
                        Field::Verbatim(picture::encode_decimal(decimal, picture, mark)?)
                    }
                    _ => Field::Verbatim(picture::fit_alphanumeric(text, picture)?),
                }
            }
            Value::Decimal(d) => Field::Verbatim(picture::encode_decimal(*d, picture, mark)?),
            Value::Float(x) => Field::Verbatim(picture::encode_float(*x, picture, mark)?),
            Value::Date(d) => {
                let format = date_format.unwrap_or(&self.default_date);
                Field::Verbatim(picture::fit_alphanumeric(format.format(d), picture)?)
            }
            Value::DateTimeOffset(d) => {
                let format = date_format.unwrap_or(&self.default_date);
                Field::Verbatim(picture::fit_alphanumeric(
                    format.format(&d.naive_utc()),
                    picture,
                )?)
            }
        };
        Ok(field)
    }

    fn text(&self, text: String, picture: Option<&Picture>) -> Result<Field> {
        let text = picture::fit_alphanumeric(text, picture)?;
        if self.grammar.release_character().is_none() {
            if let Some(c) = text.chars().find(|&c| self.grammar.is_special(c)) {
                return Err(Error::unsupported_value(format!(
                    "'{}' contains the delimiter {:?} and the grammar has no release character",
                    text, c
                )));
            }
        }
        Ok(Field::Text(text))
    }

    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let sink = self.sink.as_mut().ok_or_else(sink_taken)?;
        sink.write_all(self.pending.as_bytes())?;
        self.pending.clear();
        Ok(())
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        let sink = self.sink.as_mut().ok_or_else(sink_taken)?;
        sink.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Writes `text`, prefixing every escaped character with the release
    /// character. Unescaped runs are copied as whole slices.
    fn emit_escaped(&mut self, text: &str) -> Result<()> {
        let Some(release) = self.grammar.release_character() else {
            return self.emit(text);
        };

        let escapes = text.chars().filter(|c| self.escaped.contains(c)).count();
        if escapes == 0 {
            return self.emit(text);
        }

        let capacity = (text.len() + escapes * release.len_utf8()).max(DEFAULT_BUFFER_CAPACITY);
        let buffer = self.scratch.get(&mut self.pool, capacity);
        let mut run_start = 0;
        for (i, c) in text.char_indices() {
            if self.escaped.contains(&c) {
                buffer.push_str(&text[run_start..i]);
                buffer.push(release);
                buffer.push(c);
                run_start = i + c.len_utf8();
            }
        }
        buffer.push_str(&text[run_start..]);

        let sink = self.sink.as_mut().ok_or_else(sink_taken)?;
        sink.write_all(buffer.as_bytes())?;
        Ok(())
    }

    fn emit_line_break(&mut self) -> Result<()> {
        if self.options.formatting == Formatting::Compact {
            return Ok(());
        }
        match self.grammar.segment_terminator() {
            '\n' => Ok(()),
            '\r' => self.emit("\n"),
            _ => self.emit(LINE_ENDING),
        }
    }
}

impl<W: io::Write, P: BufferPool> Drop for Writer<W, P> {
    fn drop(&mut self) {
        if !self.closed && self.sink.is_some() {
            let _ = self.close();
        }
    }
}

fn sink_taken() -> Error {
    Error::state("writer sink already taken")
}

/// Characters escaped inside text: the grammar's set, plus the decimal mark
/// when requested and escapable.
fn escape_set(grammar: &Grammar, options: &WriterOptions) -> Vec<char> {
    let mut escaped = grammar.escaped_characters();
    if options.escape_decimal_mark_in_text && grammar.release_character().is_some() {
        if let Some(mark) = grammar.decimal_mark() {
            if !escaped.contains(&mark) {
                escaped.push(mark);
            }
        }
    }
    escaped
}
