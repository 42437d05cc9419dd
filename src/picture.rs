//! Fixed-width picture formats for numeric and alphanumeric fields.
//!
//! A picture borrows COBOL data description syntax:
//!
//! - `X(n)` or `XXX`: `n` alphanumeric positions
//! - `9(n)` or `999`: `n` digit positions
//! - `V`: the implied decimal point between two digit groups (at most one)
//!
//! ## Encoding
//!
//! Numbers are rounded half away from zero to the digits after `V`. With a
//! decimal mark the mark is written between the integer and fraction digits;
//! without one the point is implied by position and the value is written as
//! `value * 10^precision`. Integer digits are left-padded with zeros to the
//! picture width and never truncated. A negative sign precedes the digits
//! and does not count against the width.
//!
//! ```rust
//! use edi_codec::picture::{encode_decimal, Picture};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let picture: Picture = "9(1)V9(2)".parse().unwrap();
//! let value = Decimal::from_str("10.42345").unwrap();
//!
//! assert_eq!(encode_decimal(value, Some(&picture), None).unwrap(), "1042");
//! assert_eq!(encode_decimal(value, Some(&picture), Some(',')).unwrap(), "10,42");
//! ```
//!
//! ## Decoding
//!
//! Leading `Z` characters (suppressed leading zeros) are stripped. Text that
//! contains a decimal mark is parsed directly; a bare run of digits is split
//! at the implied point.
//!
//! ```rust
//! use edi_codec::picture::{decode_decimal, Picture};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let picture: Picture = "9(1)V9(2)".parse().unwrap();
//! let value = decode_decimal("1042", Some(&picture), None).unwrap();
//! assert_eq!(value, Decimal::from_str("10.42").unwrap());
//! ```

use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest number of fraction digits a [`Decimal`] can carry.
const MAX_PRECISION: usize = 28;

/// Marker for a suppressed leading zero.
pub const SUPPRESSED_ZERO: char = 'Z';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PictureKind {
    Alphanumeric,
    Numeric,
}

/// A parsed picture: kind, total positions, and positions after the implied point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Picture {
    kind: PictureKind,
    scale: usize,
    precision: usize,
}

impl Picture {
    /// `X(width)`.
    #[must_use]
    pub fn alphanumeric(width: usize) -> Self {
        Picture {
            kind: PictureKind::Alphanumeric,
            scale: width,
            precision: 0,
        }
    }

    /// `9(integer)V9(fraction)`, or `9(integer)` when `fraction` is 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when `fraction` exceeds 28 digits.
    pub fn numeric(integer: usize, fraction: usize) -> Result<Self> {
        if fraction > MAX_PRECISION {
            return Err(Error::configuration(format!(
                "picture precision {} exceeds {} digits",
                fraction, MAX_PRECISION
            )));
        }
        let scale = integer
            .checked_add(fraction)
            .ok_or_else(|| Error::configuration("picture width overflows"))?;
        Ok(Picture {
            kind: PictureKind::Numeric,
            scale,
            precision: fraction,
        })
    }

    pub fn kind(&self) -> PictureKind {
        self.kind
    }

    /// Total number of positions.
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Positions after the implied decimal point.
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Positions before the implied decimal point.
    pub fn integer_digits(&self) -> usize {
        self.scale - self.precision
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == PictureKind::Numeric
    }
}

impl fmt::Display for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PictureKind::Alphanumeric => write!(f, "X({})", self.scale),
            PictureKind::Numeric if self.precision == 0 => write!(f, "9({})", self.scale),
            PictureKind::Numeric => write!(
                f,
                "9({})V9({})",
                self.integer_digits(),
                self.precision
            ),
        }
    }
}

impl FromStr for Picture {
    type Err = Error;

    /// Parses `X(n)`, `9(n)`, `9(n)V9(m)` and the repeated-letter forms `XXX`, `99V99`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::configuration(format!("invalid picture '{}': {}", s, why));
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.is_empty() {
            return Err(invalid("empty"));
        }

        let mut alpha = 0usize;
        let mut integer = 0usize;
        let mut fraction = 0usize;
        let mut seen_v = false;
        let mut i = 0;

        while i < chars.len() {
            let unit = chars[i].to_ascii_uppercase();
            i += 1;
            match unit {
                'V' => {
                    if seen_v {
                        return Err(invalid("more than one 'V'"));
                    }
                    if alpha > 0 {
                        return Err(invalid("'V' in an alphanumeric picture"));
                    }
                    seen_v = true;
                    continue;
                }
                'X' | '9' => {}
                other => return Err(invalid(&format!("unrecognized unit '{}'", other))),
            }

            let mut count = 1;
            if chars.get(i) == Some(&'(') {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ')')
                    .ok_or_else(|| invalid("unclosed '('"))?;
                let digits: String = chars[i + 1..i + close].iter().collect();
                count = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("repeat count is not a number"))?;
                if count == 0 {
                    return Err(invalid("zero repeat count"));
                }
                i += close + 1;
            }

            match unit {
                'X' if integer > 0 || seen_v => {
                    return Err(invalid("mixed alphanumeric and numeric units"))
                }
                'X' => {
                    alpha = alpha
                        .checked_add(count)
                        .ok_or_else(|| invalid("width overflows"))?
                }
                _ if alpha > 0 => return Err(invalid("mixed alphanumeric and numeric units")),
                _ if seen_v => {
                    fraction = fraction
                        .checked_add(count)
                        .ok_or_else(|| invalid("width overflows"))?
                }
                _ => {
                    integer = integer
                        .checked_add(count)
                        .ok_or_else(|| invalid("width overflows"))?
                }
            }
        }

        if alpha > 0 {
            Ok(Picture::alphanumeric(alpha))
        } else if integer == 0 && fraction == 0 {
            Err(invalid("no digit positions"))
        } else {
            Picture::numeric(integer, fraction)
        }
    }
}

impl TryFrom<String> for Picture {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Picture> for String {
    fn from(picture: Picture) -> Self {
        picture.to_string()
    }
}

/// Encodes a decimal under an optional picture.
///
/// Without a numeric picture the value is written in its invariant form with
/// `.` replaced by `decimal_mark`.
///
/// # Errors
///
/// Returns [`Error::Format`] when an alphanumeric picture is too narrow for
/// the invariant form.
pub fn encode_decimal(
    value: Decimal,
    picture: Option<&Picture>,
    decimal_mark: Option<char>,
) -> Result<String> {
    let picture = match picture {
        Some(p) if p.is_numeric() => p,
        other => {
            let text = replace_mark(&value.to_string(), decimal_mark);
            return fit_alphanumeric(text, other);
        }
    };

    // Bounded by MAX_PRECISION at construction.
    let precision = picture.precision as u32;
    let mut rounded =
        value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    rounded.set_sign_positive(true);
    rounded.rescale(precision);
    if rounded.scale() != precision {
        return Err(Error::format(format!(
            "{} has too many digits for picture {}",
            value, picture
        )));
    }

    let digits = rounded.mantissa().to_string();
    let mut out = String::with_capacity(picture.scale + 2);
    if negative {
        out.push('-');
    }

    match decimal_mark {
        Some(mark) if picture.precision > 0 => {
            let width = picture.integer_digits().max(1) + picture.precision;
            let padded = left_pad(&digits, width);
            let split = padded.len() - picture.precision;
            out.push_str(&padded[..split]);
            out.push(mark);
            out.push_str(&padded[split..]);
        }
        _ => out.push_str(&left_pad(&digits, picture.scale)),
    }
    Ok(out)
}

/// Encodes an integer under an optional picture.
///
/// A numeric picture with fraction positions scales the value as any decimal.
pub fn encode_integer(
    value: i64,
    picture: Option<&Picture>,
    decimal_mark: Option<char>,
) -> Result<String> {
    match picture {
        Some(p) if p.is_numeric() => encode_decimal(Decimal::from(value), picture, decimal_mark),
        other => fit_alphanumeric(value.to_string(), other),
    }
}

/// Encodes a float through its shortest round-trip decimal form.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] for NaN, infinities, and values
/// outside the decimal range when a numeric picture needs them.
pub fn encode_float(
    value: f64,
    picture: Option<&Picture>,
    decimal_mark: Option<char>,
) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::unsupported_value(format!(
            "non-finite number {}",
            value
        )));
    }
    match picture {
        Some(p) if p.is_numeric() => encode_decimal(decimal_from_f64(value)?, picture, decimal_mark),
        other => fit_alphanumeric(replace_mark(&value.to_string(), decimal_mark), other),
    }
}

/// Converts a finite float to the decimal with the same shortest representation.
pub fn decimal_from_f64(value: f64) -> Result<Decimal> {
    Decimal::from_str(&value.to_string())
        .or_else(|_| Decimal::from_scientific(&format!("{:e}", value)))
        .map_err(|_| Error::unsupported_value(format!("{} is outside the decimal range", value)))
}

/// Rejects text wider than an alphanumeric picture.
pub fn fit_alphanumeric(text: String, picture: Option<&Picture>) -> Result<String> {
    match picture {
        Some(p) if p.kind == PictureKind::Alphanumeric && text.chars().count() > p.scale => {
            Err(Error::format(format!(
                "'{}' does not fit picture {}",
                text, p
            )))
        }
        _ => Ok(text),
    }
}

/// Decodes field text to a decimal under an optional picture.
///
/// # Errors
///
/// Returns [`Error::Format`] when a digit position holds anything else.
pub fn decode_decimal(
    text: &str,
    picture: Option<&Picture>,
    decimal_mark: Option<char>,
) -> Result<Decimal> {
    let bad = || Error::format(format!("'{}' is not a valid number", text));
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let body = body.trim_start_matches(SUPPRESSED_ZERO);

    let mark = decimal_mark.unwrap_or('.');
    let has_mark = body.contains(mark) || body.contains('.');

    let mut value = if body.is_empty() {
        Decimal::ZERO
    } else if has_mark {
        let normalized: String = body
            .chars()
            .map(|c| if c == mark { '.' } else { c })
            .collect();
        if normalized.matches('.').count() > 1
            || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            return Err(bad());
        }
        Decimal::from_str(&normalized).map_err(|_| bad())?
    } else {
        if !body.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let mantissa = body.parse::<i128>().map_err(|_| bad())?;
        let scale = match picture {
            Some(p) if p.is_numeric() => p.precision as u32,
            _ => 0,
        };
        Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| bad())?
    };

    if negative {
        value.set_sign_negative(true);
    }
    Ok(value)
}

/// Strips suppressed zeros and parses a whole number.
///
/// Returns `Ok(None)` when nothing but suppressed zeros remains.
pub fn decode_integer(text: &str) -> Result<Option<i64>> {
    let trimmed = text.trim();
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let body = body.trim_start_matches(SUPPRESSED_ZERO);
    if body.is_empty() {
        return Ok(None);
    }
    if !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::format(format!("cannot parse integer from '{}'", text)));
    }
    format!("{}{}", sign, body)
        .parse::<i64>()
        .map(Some)
        .map_err(|_| Error::format(format!("integer '{}' is out of range", text)))
}

fn left_pad(digits: &str, width: usize) -> String {
    if digits.len() >= width {
        digits.to_string()
    } else {
        let mut out = "0".repeat(width - digits.len());
        out.push_str(digits);
        out
    }
}

fn replace_mark(text: &str, decimal_mark: Option<char>) -> String {
    match decimal_mark {
        Some(mark) if mark != '.' => text.replace('.', &mark.to_string()),
        _ => text.to_string(),
    }
}
