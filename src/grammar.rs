//! Delimiter sets and escaping policy for EDI dialects.
//!
//! A [`Grammar`] is a small value object holding the delimiter characters of
//! one dialect. It is injected into a [`Writer`](crate::Writer) or
//! [`Reader`](crate::Reader) at construction and only changes through
//! [`Grammar::set_advice`] / [`Grammar::set_advice_chars`], which validate
//! the new delimiter set and swap it in as a whole.
//!
//! ## Dialects
//!
//! | dialect   | component | element | name delimiter | terminator | release | decimal |
//! |-----------|-----------|---------|----------------|------------|---------|---------|
//! | EDIFACT   | `:`       | `+`     | `+`            | `'`        | `?`     | `.`     |
//! | TRADACOMS | `:`       | `+`     | `=`            | `'`        | `?`     | `.`     |
//! | X12       | `>`       | `*`     | `*`            | `~`        | none    | `.`     |
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::Grammar;
//!
//! let mut grammar = Grammar::edifact();
//! assert!(grammar.is_special('\''));
//! assert_eq!(grammar.service_string_advice(), Some("UNA:+.? '".to_string()));
//!
//! grammar.set_advice_chars([':', '+', '.', '?', ' ', '\r']).unwrap();
//! assert!(grammar.is_special('\r'));
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tag of the EDIFACT service string advice header.
pub const SERVICE_STRING_ADVICE_TAG: &str = "UNA";

/// The dialect a grammar was created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Edifact,
    Tradacoms,
    X12,
}

/// A complete delimiter set, as accepted by [`Grammar::set_advice`].
///
/// `None` in a mandatory slot (element, component, terminator) is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Advice {
    /// Character following the segment tag. `None` means the element
    /// separator doubles as the name delimiter.
    pub segment_name_delimiter: Option<char>,
    pub element_separator: Option<char>,
    pub component_separator: Option<char>,
    pub segment_terminator: Option<char>,
    pub release_character: Option<char>,
    /// Reserved advice slot, used as the repetition separator by dialects that have one.
    pub reserved: Option<char>,
    pub decimal_mark: Option<char>,
}

/// Delimiter characters and escaping policy of one EDI dialect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GrammarConfig", into = "GrammarConfig")]
pub struct Grammar {
    dialect: Dialect,
    component_separator: char,
    element_separator: char,
    segment_terminator: char,
    segment_name_delimiter: Option<char>,
    release_character: Option<char>,
    decimal_mark: Option<char>,
    repetition_separator: Option<char>,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::edifact()
    }
}

impl Grammar {
    /// EDIFACT defaults, advice text `UNA:+.? '`.
    #[must_use]
    pub fn edifact() -> Self {
        Grammar {
            dialect: Dialect::Edifact,
            component_separator: ':',
            element_separator: '+',
            segment_terminator: '\'',
            segment_name_delimiter: Some('+'),
            release_character: Some('?'),
            decimal_mark: Some('.'),
            repetition_separator: None,
        }
    }

    /// TRADACOMS defaults: segment tags are followed by `=`.
    #[must_use]
    pub fn tradacoms() -> Self {
        Grammar {
            dialect: Dialect::Tradacoms,
            segment_name_delimiter: Some('='),
            ..Grammar::edifact()
        }
    }

    /// X12 defaults. X12 has no release character, so nothing is escaped.
    #[must_use]
    pub fn x12() -> Self {
        Grammar {
            dialect: Dialect::X12,
            component_separator: '>',
            element_separator: '*',
            segment_terminator: '~',
            segment_name_delimiter: Some('*'),
            release_character: None,
            decimal_mark: Some('.'),
            repetition_separator: Some('^'),
        }
    }

    /// Default grammar of `dialect`.
    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Edifact => Grammar::edifact(),
            Dialect::Tradacoms => Grammar::tradacoms(),
            Dialect::X12 => Grammar::x12(),
        }
    }

    /// Builds a validated grammar from a full delimiter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a mandatory delimiter is missing
    /// or two delimiters share a character.
    pub fn with_advice(dialect: Dialect, advice: Advice) -> Result<Self> {
        let mut grammar = Grammar::for_dialect(dialect);
        grammar.set_advice(advice)?;
        Ok(grammar)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn component_separator(&self) -> char {
        self.component_separator
    }

    pub fn element_separator(&self) -> char {
        self.element_separator
    }

    pub fn segment_terminator(&self) -> char {
        self.segment_terminator
    }

    /// The configured segment name delimiter, if it differs from the implicit default.
    pub fn segment_name_delimiter(&self) -> Option<char> {
        self.segment_name_delimiter
    }

    /// The character written after a segment tag.
    ///
    /// Falls back to the element separator when no explicit delimiter is set.
    pub fn effective_name_delimiter(&self) -> char {
        self.segment_name_delimiter.unwrap_or(self.element_separator)
    }

    pub fn release_character(&self) -> Option<char> {
        self.release_character
    }

    pub fn decimal_mark(&self) -> Option<char> {
        self.decimal_mark
    }

    pub fn repetition_separator(&self) -> Option<char> {
        self.repetition_separator
    }

    /// Returns true for the structural delimiters and the release character.
    #[inline]
    pub fn is_special(&self, c: char) -> bool {
        c == self.component_separator
            || c == self.element_separator
            || c == self.segment_terminator
            || Some(c) == self.segment_name_delimiter
            || Some(c) == self.release_character
    }

    /// The characters written escaped inside text, in a stable order.
    ///
    /// Empty when the grammar has no release character.
    pub fn escaped_characters(&self) -> Vec<char> {
        let Some(release) = self.release_character else {
            return Vec::new();
        };
        let mut chars = vec![
            self.element_separator,
            self.component_separator,
            self.effective_name_delimiter(),
            self.segment_terminator,
            release,
        ];
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    /// Current delimiter set.
    pub fn advice(&self) -> Advice {
        Advice {
            segment_name_delimiter: self.segment_name_delimiter,
            element_separator: Some(self.element_separator),
            component_separator: Some(self.component_separator),
            segment_terminator: Some(self.segment_terminator),
            release_character: self.release_character,
            reserved: self.repetition_separator,
            decimal_mark: self.decimal_mark,
        }
    }

    /// Replaces the whole delimiter set.
    ///
    /// The grammar is untouched when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on a missing mandatory delimiter or
    /// on duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edi_codec::{Advice, Grammar};
    ///
    /// let mut grammar = Grammar::edifact();
    /// grammar.set_advice(Advice {
    ///     segment_name_delimiter: Some('+'),
    ///     element_separator: Some('+'),
    ///     component_separator: Some(':'),
    ///     segment_terminator: Some('\''),
    ///     release_character: Some('?'),
    ///     reserved: None,
    ///     decimal_mark: Some(','),
    /// }).unwrap();
    /// assert_eq!(grammar.decimal_mark(), Some(','));
    /// ```
    pub fn set_advice(&mut self, advice: Advice) -> Result<()> {
        let element_separator = advice
            .element_separator
            .ok_or_else(|| Error::configuration("missing element separator"))?;
        let component_separator = advice
            .component_separator
            .ok_or_else(|| Error::configuration("missing component separator"))?;
        let segment_terminator = advice
            .segment_terminator
            .ok_or_else(|| Error::configuration("missing segment terminator"))?;

        let candidate = Grammar {
            dialect: self.dialect,
            component_separator,
            element_separator,
            segment_terminator,
            segment_name_delimiter: advice.segment_name_delimiter,
            release_character: advice.release_character,
            decimal_mark: advice.decimal_mark,
            repetition_separator: advice.reserved,
        };
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Replaces the delimiters from the six service string advice characters:
    /// component separator, element separator, decimal mark, release
    /// character, reserved, segment terminator.
    ///
    /// A space in the decimal mark, release or reserved slot means "not used".
    /// A segment name delimiter that tracked the old element separator tracks
    /// the new one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on a blank mandatory slot or on duplicates.
    pub fn set_advice_chars(&mut self, chars: [char; 6]) -> Result<()> {
        let slot = |c: char| if c == ' ' { None } else { Some(c) };
        let [component, element, decimal, release, reserved, terminator] = chars;

        let segment_name_delimiter = match self.segment_name_delimiter {
            Some(delimiter) if delimiter == self.element_separator => slot(element),
            other => other,
        };

        self.set_advice(Advice {
            segment_name_delimiter,
            element_separator: slot(element),
            component_separator: slot(component),
            segment_terminator: slot(terminator),
            release_character: slot(release),
            reserved: slot(reserved),
            decimal_mark: slot(decimal),
        })
    }

    /// The six advice characters in header order, unused slots as spaces.
    pub fn advice_chars(&self) -> [char; 6] {
        [
            self.component_separator,
            self.element_separator,
            self.decimal_mark.unwrap_or(' '),
            self.release_character.unwrap_or(' '),
            self.repetition_separator.unwrap_or(' '),
            self.segment_terminator,
        ]
    }

    /// Service string advice header text, for dialects that define one.
    pub fn service_string_advice(&self) -> Option<String> {
        match self.dialect {
            Dialect::Edifact => {
                let mut text = String::from(SERVICE_STRING_ADVICE_TAG);
                text.extend(self.advice_chars());
                Some(text)
            }
            Dialect::Tradacoms | Dialect::X12 => None,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen: Vec<(char, &str)> = Vec::with_capacity(6);
        let slots = [
            (Some(self.element_separator), "element separator"),
            (Some(self.component_separator), "component separator"),
            (Some(self.segment_terminator), "segment terminator"),
            (self.release_character, "release character"),
            (self.repetition_separator, "repetition separator"),
            (self.decimal_mark, "decimal mark"),
        ];

        for (c, name) in slots {
            let Some(c) = c else { continue };
            if let Some((_, other)) = seen.iter().find(|(s, _)| *s == c) {
                return Err(Error::configuration(format!(
                    "{} and {} share the character {:?}",
                    other, name, c
                )));
            }
            seen.push((c, name));
        }

        // The name delimiter may reuse the element separator, nothing else.
        if let Some(delimiter) = self.segment_name_delimiter {
            if delimiter != self.element_separator {
                if let Some((_, other)) = seen.iter().find(|(s, _)| *s == delimiter) {
                    return Err(Error::configuration(format!(
                        "segment name delimiter and {} share the character {:?}",
                        other, delimiter
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Serialized form of a [`Grammar`]: a dialect plus optional overrides.
///
/// # Examples
///
/// ```rust
/// use edi_codec::{Dialect, Grammar};
///
/// let grammar: Grammar = serde_json::from_str(
///     r#"{ "dialect": "edifact", "decimal_mark": "," }"#,
/// ).unwrap();
/// assert_eq!(grammar.dialect(), Dialect::Edifact);
/// assert_eq!(grammar.decimal_mark(), Some(','));
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrammarConfig {
    pub dialect: Dialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_separator: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_separator: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_terminator: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_name_delimiter: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_character: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_mark: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_separator: Option<char>,
}

impl TryFrom<GrammarConfig> for Grammar {
    type Error = Error;

    fn try_from(config: GrammarConfig) -> Result<Self> {
        let mut grammar = Grammar::for_dialect(config.dialect);
        let base = grammar.advice();
        grammar.set_advice(Advice {
            segment_name_delimiter: config
                .segment_name_delimiter
                .or(base.segment_name_delimiter),
            element_separator: config.element_separator.or(base.element_separator),
            component_separator: config.component_separator.or(base.component_separator),
            segment_terminator: config.segment_terminator.or(base.segment_terminator),
            release_character: config.release_character.or(base.release_character),
            reserved: config.repetition_separator.or(base.reserved),
            decimal_mark: config.decimal_mark.or(base.decimal_mark),
        })?;
        Ok(grammar)
    }
}

impl From<Grammar> for GrammarConfig {
    fn from(grammar: Grammar) -> Self {
        GrammarConfig {
            dialect: grammar.dialect,
            component_separator: Some(grammar.component_separator),
            element_separator: Some(grammar.element_separator),
            segment_terminator: Some(grammar.segment_terminator),
            segment_name_delimiter: grammar.segment_name_delimiter,
            release_character: grammar.release_character,
            decimal_mark: grammar.decimal_mark,
            repetition_separator: grammar.repetition_separator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_advice_changes_special_characters() {
        let mut grammar = Grammar::edifact();
        assert!(grammar.is_special('\''));
        grammar
            .set_advice_chars([':', '+', '.', '?', ' ', '\r'])
            .unwrap();
        assert!(grammar.is_special('\r'));
        assert!(!grammar.is_special('\''));
    }

    #[test]
    fn test_edifact_advice_text() {
        assert_eq!(
            Grammar::edifact().service_string_advice().as_deref(),
            Some("UNA:+.? '")
        );
        assert_eq!(Grammar::x12().service_string_advice(), None);
    }

    #[test]
    fn test_duplicate_delimiters_rejected() {
        let mut grammar = Grammar::edifact();
        let err = grammar
            .set_advice_chars([':', ':', '.', '?', ' ', '\''])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        // Unchanged after a failed swap.
        assert_eq!(grammar, Grammar::edifact());
    }

    #[test]
    fn test_missing_mandatory_delimiter_rejected() {
        let mut grammar = Grammar::edifact();
        let err = grammar
            .set_advice_chars([' ', '+', '.', '?', ' ', '\''])
            .unwrap_err();
        assert!(err.to_string().contains("component separator"));
    }

    #[test]
    fn test_name_delimiter_may_equal_element_separator_only() {
        let mut grammar = Grammar::edifact();
        let mut advice = grammar.advice();
        advice.segment_name_delimiter = Some(':');
        assert!(grammar.set_advice(advice).is_err());

        advice.segment_name_delimiter = Some('=');
        grammar.set_advice(advice).unwrap();
        assert_eq!(grammar.effective_name_delimiter(), '=');
    }

    #[test]
    fn test_name_delimiter_follows_element_separator() {
        let mut grammar = Grammar::edifact();
        grammar
            .set_advice_chars([':', '*', '.', '?', ' ', '\''])
            .unwrap();
        assert_eq!(grammar.segment_name_delimiter(), Some('*'));

        let mut tradacoms = Grammar::tradacoms();
        tradacoms
            .set_advice_chars([':', '*', '.', '?', ' ', '\''])
            .unwrap();
        assert_eq!(tradacoms.segment_name_delimiter(), Some('='));
    }

    #[test]
    fn test_x12_escapes_nothing() {
        let grammar = Grammar::x12();
        assert!(grammar.escaped_characters().is_empty());
        assert!(grammar.is_special('*'));
        assert!(!grammar.is_special('^'));
    }

    #[test]
    fn test_escaped_characters_edifact() {
        assert_eq!(
            Grammar::edifact().escaped_characters(),
            vec!['\'', '+', ':', '?']
        );
    }

    #[test]
    fn test_config_round_trip() {
        let grammar = Grammar::tradacoms();
        let config = GrammarConfig::from(grammar.clone());
        assert_eq!(Grammar::try_from(config).unwrap(), grammar);
    }
}
