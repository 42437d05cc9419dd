//! # edi_codec
//!
//! A streaming, grammar-configurable token codec for EDI flat files
//! (EDIFACT, X12, TRADACOMS).
//!
//! ## What is it?
//!
//! EDI messages are flat text built from three nested delimiters: segments
//! end with a terminator, elements are split by the element separator, and
//! components by the component separator. This crate converts between that
//! text and a flat sequence of tokens, each addressed by a path such as
//! `UNB[2][1]` (segment tag, element index, component index).
//!
//! ## Key Features
//!
//! - **Pluggable dialects**: one [`Grammar`] value holds every delimiter; a
//!   `UNA` header swaps it mid-stream
//! - **Exact output**: separators are emitted lazily, so writer output
//!   round-trips byte for byte through the reader
//! - **Escaping**: reserved characters in text are prefixed with the release
//!   character and unescaped on read
//! - **Pictures**: COBOL-style `9(3)V9(2)` / `X(35)` fixed-width number and
//!   text formats
//! - **Streaming**: no document tree; the writer and the reader are single
//!   pass and forward only
//!
//! ## Quick Start
//!
//! ### Writing
//!
//! ```rust
//! use edi_codec::{to_string, Grammar, TokenKind, WriterOptions};
//!
//! let text = to_string(Grammar::edifact(), WriterOptions::default(), |w| {
//!     w.write_service_string_advice()?;
//!     w.write_segment_name("PAC")?;
//!     w.write_value(1)?;
//!     w.write_token(TokenKind::ElementStart)?;
//!     w.write_token(TokenKind::Null)?;
//!     w.write_value(52)?;
//!     w.write_token(TokenKind::ElementStart)?;
//!     w.write_value("PK")?;
//!     w.write_segment_terminator()
//! })
//! .unwrap();
//!
//! assert!(text.starts_with("UNA:+.? '"));
//! assert!(text.contains("PAC+1+:52+PK'"));
//! ```
//!
//! ### Reading
//!
//! ```rust
//! use edi_codec::{read_entries, Grammar, Path, ReadQueue};
//!
//! let entries = read_entries("PAC+1+:52+PK'", Grammar::edifact()).unwrap();
//! let mut queue: ReadQueue = entries.into_iter().collect();
//!
//! let weight = Path::new("PAC", 1, 1);
//! assert_eq!(queue.read_as_i32(&weight).unwrap(), Some(52));
//! ```
//!
//! ## Modules
//!
//! - [`grammar`]: delimiter sets per dialect and runtime advice
//! - [`path`]: path addressing and the container state machine
//! - [`writer`] / [`reader`]: the two halves of the token engine
//! - [`picture`] / [`date`]: fixed-width number and date formats
//! - [`queue`]: lookahead reads of buffered entries by path
//! - [`schema`]: declarative field bindings over the queue and the writer
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger: `debug` when delimiters change and when a writer
//! closes, `trace` per segment, `warn` when the reader skips a segment.

pub mod date;
pub mod error;
pub mod grammar;
pub mod options;
pub mod path;
pub mod picture;
pub mod pool;
pub mod queue;
pub mod reader;
pub mod schema;
pub mod token;
pub mod value;
pub mod writer;

pub use date::{DateFormat, DEFAULT_DATE_FORMAT};
pub use error::{Error, Result};
pub use grammar::{Advice, Dialect, Grammar, GrammarConfig};
pub use options::{Formatting, ReaderOptions, WriterOptions};
pub use path::{ContainerType, Path, PathCursor};
pub use picture::{Picture, PictureKind};
pub use pool::{BufferPool, FreeListPool};
pub use queue::ReadQueue;
pub use reader::Reader;
pub use schema::{FieldBinding, FieldKind, Record, RecordSchema, SchemaCache};
pub use token::{Entry, TokenKind};
pub use value::{to_value, Value};
pub use writer::Writer;

use std::io;

/// Runs `write` against a fresh writer and returns the text it produced.
///
/// An open segment is terminated when `write` returns.
///
/// # Errors
///
/// Returns the first error raised by `write` or by closing the writer.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<F>(grammar: Grammar, options: WriterOptions, write: F) -> Result<String>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
{
    let mut writer = Writer::with_options(Vec::new(), grammar, options);
    write(&mut writer)?;
    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))
}

/// Runs `write` against a writer over `sink`, then closes it.
///
/// # Examples
///
/// ```rust
/// use edi_codec::{to_writer, Grammar, WriterOptions};
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, Grammar::edifact(), WriterOptions::compact(), |w| {
///     w.write_segment_name("UNS")?;
///     w.write_value("S")
/// })
/// .unwrap();
/// assert_eq!(buffer, b"UNS+S'");
/// ```
///
/// # Errors
///
/// Returns the first error raised by `write`, the sink, or closing the writer.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, F>(sink: W, grammar: Grammar, options: WriterOptions, write: F) -> Result<()>
where
    W: io::Write,
    F: FnOnce(&mut Writer<W>) -> Result<()>,
{
    let mut writer = Writer::with_options(sink, grammar, options);
    write(&mut writer)?;
    writer.close()
}

/// Tokenizes a whole string.
///
/// # Errors
///
/// Returns the first error raised by the [`Reader`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn read_entries(input: &str, grammar: Grammar) -> Result<Vec<Entry>> {
    Reader::new(input, grammar).collect()
}

/// Tokenizes an I/O stream of EDI text.
///
/// # Examples
///
/// ```rust
/// use edi_codec::{from_reader, Grammar, TokenKind};
/// use std::io::Cursor;
///
/// let entries = from_reader(Cursor::new(b"UNS+S'"), Grammar::edifact()).unwrap();
/// assert_eq!(entries.last().map(|e| e.token()), Some(TokenKind::SegmentTerminator));
/// ```
///
/// # Errors
///
/// Returns an error if reading fails or the text does not tokenize.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(mut reader: R, grammar: Grammar) -> Result<Vec<Entry>>
where
    R: io::Read,
{
    let mut string = String::new();
    reader.read_to_string(&mut string)?;
    read_entries(&string, grammar)
}

/// Tokenizes UTF-8 bytes of EDI text.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or do not tokenize.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice(bytes: &[u8], grammar: Grammar) -> Result<Vec<Entry>> {
    let s = std::str::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))?;
    read_entries(s, grammar)
}
