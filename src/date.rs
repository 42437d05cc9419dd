//! Date/time patterns for EDI date fields.
//!
//! Patterns use the usual EDI notation against an invariant calendar:
//!
//! | token       | meaning                          |
//! |-------------|----------------------------------|
//! | `yyyy`      | four-digit year                  |
//! | `yy`        | two-digit year (00-49 → 20xx)    |
//! | `MM`        | month 01-12                      |
//! | `dd`        | day 01-31                        |
//! | `HH`        | hour 00-23                       |
//! | `mm`        | minute                           |
//! | `ss`        | second                           |
//! | `fff`       | milliseconds (also `ffffff`, `fffffffff`) |
//! | `'text'`    | literal text                     |
//!
//! Any other letter is rejected; month and day names are not supported.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use edi_codec::DateFormat;
//!
//! let format = DateFormat::new("ddMMyy").unwrap();
//! let date = NaiveDate::from_ymd_opt(2012, 10, 10).unwrap().and_hms_opt(11, 4, 0).unwrap();
//! assert_eq!(format.format(&date), "101012");
//! assert_eq!(format.parse("101012").unwrap().date(), date.date());
//! ```

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pattern used when a date is written or read without one.
pub const DEFAULT_DATE_FORMAT: &str = "yyyyMMddHHmmss";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Field {
    Year4,
    Year2,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Fraction(usize),
    Literal(String),
}

impl Field {
    fn width(&self) -> usize {
        match self {
            Field::Year4 => 4,
            Field::Fraction(n) => *n,
            Field::Literal(text) => text.chars().count(),
            _ => 2,
        }
    }
}

/// A compiled date pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateFormat {
    pattern: String,
    fields: Vec<Field>,
    strftime: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        DateFormat {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
            fields: vec![
                Field::Year4,
                Field::Month,
                Field::Day,
                Field::Hour,
                Field::Minute,
                Field::Second,
            ],
            strftime: "%Y%m%d%H%M%S".to_string(),
        }
    }
}

impl DateFormat {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for unsupported tokens or an
    /// unterminated quoted literal.
    pub fn new(pattern: &str) -> Result<Self> {
        let unsupported = |token: &str| {
            Error::configuration(format!(
                "unsupported date token '{}' in pattern '{}'",
                token, pattern
            ))
        };

        let chars: Vec<char> = pattern.chars().collect();
        let mut fields: Vec<Field> = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&q| q == '\'')
                    .ok_or_else(|| {
                        Error::configuration(format!(
                            "unterminated literal in date pattern '{}'",
                            pattern
                        ))
                    })?;
                push_literal(&mut fields, chars[i + 1..i + 1 + close].iter().collect());
                i += close + 2;
                continue;
            }
            if !c.is_ascii_alphabetic() {
                push_literal(&mut fields, c.to_string());
                i += 1;
                continue;
            }

            let run = chars[i..].iter().take_while(|&&r| r == c).count();
            let token: String = chars[i..i + run].iter().collect();
            let field = match (c, run) {
                ('y', 4) => Field::Year4,
                ('y', 2) => Field::Year2,
                ('M', 2) => Field::Month,
                ('d', 2) => Field::Day,
                ('H', 2) => Field::Hour,
                ('m', 2) => Field::Minute,
                ('s', 2) => Field::Second,
                ('f', 3) | ('f', 6) | ('f', 9) => Field::Fraction(run),
                _ => return Err(unsupported(&token)),
            };
            fields.push(field);
            i += run;
        }

        let strftime = fields.iter().map(strftime_item).collect();
        Ok(DateFormat {
            pattern: pattern.to_string(),
            fields,
            strftime,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Formats `value` with the pattern.
    pub fn format(&self, value: &NaiveDateTime) -> String {
        value.format(&self.strftime).to_string()
    }

    /// Parses `text` against the pattern.
    ///
    /// Missing date parts default to 0001-01-01 and missing time parts to
    /// midnight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] when the text does not match the pattern or
    /// names an impossible date.
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime> {
        let mismatch = || {
            Error::format(format!(
                "'{}' does not match date pattern '{}'",
                text, self.pattern
            ))
        };

        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;
        let (mut year, mut month, mut day) = (1i32, 1u32, 1u32);
        let (mut hour, mut minute, mut second, mut nano) = (0u32, 0u32, 0u32, 0u32);

        for field in &self.fields {
            let width = field.width();
            let slice: String = chars.get(pos..pos + width).ok_or_else(mismatch)?.iter().collect();
            pos += width;

            if let Field::Literal(expected) = field {
                if &slice != expected {
                    return Err(mismatch());
                }
                continue;
            }

            if !slice.chars().all(|c| c.is_ascii_digit()) {
                return Err(mismatch());
            }
            let number: u32 = slice.parse().map_err(|_| mismatch())?;
            match field {
                Field::Year4 => year = number as i32,
                Field::Year2 => year = (if number < 50 { 2000 } else { 1900 }) + number as i32,
                Field::Month => month = number,
                Field::Day => day = number,
                Field::Hour => hour = number,
                Field::Minute => minute = number,
                Field::Second => second = number,
                Field::Fraction(n) => nano = number * 10u32.pow(9 - *n as u32),
                Field::Literal(_) => {}
            }
        }

        if pos != chars.len() {
            return Err(mismatch());
        }

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(mismatch)?;
        let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nano).ok_or_else(mismatch)?;
        Ok(date.and_time(time))
    }
}

fn push_literal(fields: &mut Vec<Field>, text: String) {
    if let Some(Field::Literal(last)) = fields.last_mut() {
        last.push_str(&text);
    } else if !text.is_empty() {
        fields.push(Field::Literal(text));
    }
}

fn strftime_item(field: &Field) -> String {
    match field {
        Field::Year4 => "%Y".to_string(),
        Field::Year2 => "%y".to_string(),
        Field::Month => "%m".to_string(),
        Field::Day => "%d".to_string(),
        Field::Hour => "%H".to_string(),
        Field::Minute => "%M".to_string(),
        Field::Second => "%S".to_string(),
        Field::Fraction(n) => format!("%{}f", n),
        Field::Literal(text) => text.replace('%', "%%"),
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for DateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DateFormat::new(s)
    }
}

impl TryFrom<String> for DateFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DateFormat::new(&value)
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_default_pattern() {
        let format = DateFormat::default();
        assert_eq!(format, DateFormat::new(DEFAULT_DATE_FORMAT).unwrap());
        let value = at(2022, 6, 30, 7, 35, 0);
        assert_eq!(format.format(&value), "20220630073500");
        assert_eq!(format.parse("20220630073500").unwrap(), value);
    }

    #[test]
    fn test_partial_patterns() {
        let value = at(2012, 10, 10, 11, 4, 0);
        assert_eq!(DateFormat::new("HHmm").unwrap().format(&value), "1104");
        let time_only = DateFormat::new("HHmm").unwrap().parse("1104").unwrap();
        assert_eq!(time_only, at(1, 1, 1, 11, 4, 0));
    }

    #[test]
    fn test_literals_and_fractions() {
        let format = DateFormat::new("yyyy-MM-dd'T'HH:mm:ss.fff").unwrap();
        let value = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_milli_opt(10, 30, 0, 250)
            .unwrap();
        let text = format.format(&value);
        assert_eq!(text, "2024-01-15T10:30:00.250");
        assert_eq!(format.parse(&text).unwrap(), value);
    }

    #[test]
    fn test_two_digit_year_window() {
        let format = DateFormat::new("yyMMdd").unwrap();
        assert_eq!(format.parse("491231").unwrap().date(), at(2049, 12, 31, 0, 0, 0).date());
        assert_eq!(format.parse("500101").unwrap().date(), at(1950, 1, 1, 0, 0, 0).date());
    }

    #[test]
    fn test_unsupported_tokens() {
        for pattern in ["MMM", "dddd", "yyy", "tt", "'open"] {
            assert!(
                matches!(DateFormat::new(pattern), Err(Error::Configuration(_))),
                "{}",
                pattern
            );
        }
    }

    #[test]
    fn test_parse_mismatch() {
        let format = DateFormat::new("yyyyMMdd").unwrap();
        for text in ["2024011", "202401011", "2024AB01", "20241301"] {
            assert!(matches!(format.parse(text), Err(Error::Format { .. })), "{}", text);
        }
    }
}
