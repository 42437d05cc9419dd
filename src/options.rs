//! Configuration options for writing and reading EDI streams.
//!
//! - [`WriterOptions`]: formatting mode and decimal mark escaping
//! - [`ReaderOptions`]: service string advice recognition
//! - [`Formatting`]: `Compact` or `LinePerSegment` output
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::{Formatting, WriterOptions};
//!
//! let options = WriterOptions::new()
//!     .with_formatting(Formatting::Compact)
//!     .with_escape_decimal_mark_in_text(true);
//! assert_eq!(options.formatting, Formatting::Compact);
//! ```

use serde::{Deserialize, Serialize};

/// Platform line terminator written after segments in [`Formatting::LinePerSegment`] mode.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
/// Platform line terminator written after segments in [`Formatting::LinePerSegment`] mode.
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Whitespace policy between segments.
///
/// - **Compact**: segments follow each other with no whitespace
/// - **LinePerSegment**: a line break after every segment terminator
///
/// When the terminator itself is `\r`, only `\n` is appended; when it is
/// `\n`, nothing is appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatting {
    Compact,
    #[default]
    LinePerSegment,
}

/// Configuration options for [`Writer`](crate::Writer).
///
/// # Examples
///
/// ```rust
/// use edi_codec::{Formatting, WriterOptions};
///
/// let options = WriterOptions::default();
/// assert_eq!(options.formatting, Formatting::LinePerSegment);
/// assert!(!options.escape_decimal_mark_in_text);
///
/// let compact = WriterOptions::compact();
/// assert_eq!(compact.formatting, Formatting::Compact);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    pub formatting: Formatting,
    /// Escape the grammar's decimal mark when it appears inside text values.
    /// Numbers written through a picture never escape their own mark.
    pub escape_decimal_mark_in_text: bool,
}

impl WriterOptions {
    /// Creates default options (line per segment, decimal mark not escaped).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for output without whitespace between segments.
    #[must_use]
    pub fn compact() -> Self {
        WriterOptions {
            formatting: Formatting::Compact,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    /// Sets whether the decimal mark is escaped inside text values.
    ///
    /// Has no effect when the grammar has no decimal mark or no release character.
    #[must_use]
    pub fn with_escape_decimal_mark_in_text(mut self, escape: bool) -> Self {
        self.escape_decimal_mark_in_text = escape;
        self
    }
}

/// Configuration options for [`Reader`](crate::Reader).
///
/// # Examples
///
/// ```rust
/// use edi_codec::ReaderOptions;
///
/// let options = ReaderOptions::new().with_service_string_advice(false);
/// assert!(!options.recognize_service_string_advice);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Reconfigure the grammar when a `UNA` header starts a segment.
    pub recognize_service_string_advice: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            recognize_service_string_advice: true,
        }
    }
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_service_string_advice(mut self, recognize: bool) -> Self {
        self.recognize_service_string_advice = recognize;
        self
    }
}
