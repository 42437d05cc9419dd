//! Error types for EDI writing and reading.
//!
//! Every failure in the codec is immediate and terminal for the operation
//! that raised it. Nothing is retried and nothing is partially recovered;
//! a caller that wants to keep going after a malformed segment can use
//! [`Reader::skip_segment`](crate::Reader::skip_segment).
//!
//! ## Error Categories
//!
//! - **Configuration**: invalid or duplicate grammar delimiters, bad pictures,
//!   unsupported date patterns, unparsable paths
//! - **Structural**: a token written or read out of the legal container order
//! - **Unsupported value**: a value that cannot be represented as one token
//! - **Format**: numeric or date text that does not match its picture/pattern
//! - **Truncated escape**: a release character with nothing left to escape
//! - **State**: an operation attempted after the writer was closed
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::{read_entries, Error, Grammar};
//!
//! let result = read_entries("+AAA'", Grammar::edifact());
//! assert!(matches!(result, Err(Error::Structural { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors raised by the EDI token engine.
///
/// Errors raised while reading carry the line and column of the offending
/// character. Errors tied to a value position carry its path
/// (`SEG[element][component]`) so a mapping layer can report
/// "segment X, field Y" diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error on the underlying sink or source
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid grammar, picture, date pattern or path
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token out of the legal Segment > Element > Component order
    #[error("Structural error{}: {msg}", location(.path, .line, .col))]
    Structural {
        path: Option<String>,
        line: Option<usize>,
        col: Option<usize>,
        msg: String,
    },

    /// Value that cannot be written as a single token
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// Text that does not match the declared picture or date pattern
    #[error("Format error{}: {msg}", location(.path, &None, &None))]
    Format { path: Option<String>, msg: String },

    /// Release character at the end of input
    #[error("Truncated escape at line {line}, column {col}: release character at end of input")]
    TruncatedEscape { line: usize, col: usize },

    /// Operation on a closed writer
    #[error("State error: {0}")]
    State(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

fn location(path: &Option<String>, line: &Option<usize>, col: &Option<usize>) -> String {
    let mut out = String::new();
    if let Some(path) = path {
        out.push_str(" at path ");
        out.push_str(path);
    }
    if let (Some(line), Some(col)) = (line, col) {
        out.push_str(&format!(" (line {}, column {})", line, col));
    }
    out
}

impl Error {
    /// Creates a configuration error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edi_codec::Error;
    ///
    /// let err = Error::configuration("duplicate delimiter '+'");
    /// assert!(err.to_string().contains("duplicate delimiter"));
    /// ```
    pub fn configuration<T: fmt::Display>(msg: T) -> Self {
        Error::Configuration(msg.to_string())
    }

    /// Creates a structural error raised by the writer at the given path.
    pub fn structural(path: Option<String>, msg: &str) -> Self {
        Error::Structural {
            path,
            line: None,
            col: None,
            msg: msg.to_string(),
        }
    }

    /// Creates a structural error raised by the reader at a source position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edi_codec::Error;
    ///
    /// let err = Error::structural_at(3, 7, "element separator outside of a segment");
    /// assert!(err.to_string().contains("line 3, column 7"));
    /// ```
    pub fn structural_at(line: usize, col: usize, msg: &str) -> Self {
        Error::Structural {
            path: None,
            line: Some(line),
            col: Some(col),
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported value error.
    pub fn unsupported_value<T: fmt::Display>(msg: T) -> Self {
        Error::UnsupportedValue(msg.to_string())
    }

    /// Creates a format error that is not yet tied to a path.
    ///
    /// Use [`Error::at_path`] to attach the path once it is known.
    pub fn format<T: fmt::Display>(msg: T) -> Self {
        Error::Format {
            path: None,
            msg: msg.to_string(),
        }
    }

    /// Creates a truncated escape error.
    pub fn truncated_escape(line: usize, col: usize) -> Self {
        Error::TruncatedEscape { line, col }
    }

    /// Creates a state error.
    pub fn state(msg: &str) -> Self {
        Error::State(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for sink or source failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Attaches `path` to a format or structural error that has none yet.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edi_codec::Error;
    ///
    /// let err = Error::format("non-digit in numeric field").at_path("QTY[0][1]");
    /// assert_eq!(err.path(), Some("QTY[0][1]"));
    /// ```
    #[must_use]
    pub fn at_path<T: fmt::Display>(self, at: T) -> Self {
        match self {
            Error::Format { path: None, msg } => Error::Format {
                path: Some(at.to_string()),
                msg,
            },
            Error::Structural {
                path: None,
                line,
                col,
                msg,
            } => Error::Structural {
                path: Some(at.to_string()),
                line,
                col,
                msg,
            },
            other => other,
        }
    }

    /// Returns the path the error was raised at, if known.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Format { path, .. } | Error::Structural { path, .. } => path.as_deref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_carries_path() {
        let err = Error::format("bad digit").at_path("QTY[1][0]");
        assert_eq!(err.path(), Some("QTY[1][0]"));
        assert!(err.to_string().contains("at path QTY[1][0]"));
    }

    #[test]
    fn test_at_path_keeps_existing_path() {
        let err = Error::format("bad digit")
            .at_path("QTY[1][0]")
            .at_path("DTM[0][0]");
        assert_eq!(err.path(), Some("QTY[1][0]"));
    }

    #[test]
    fn test_structural_error_location() {
        let err = Error::structural_at(2, 5, "component separator outside of a segment");
        let text = err.to_string();
        assert!(text.contains("line 2, column 5"));
        assert!(text.contains("component separator"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
