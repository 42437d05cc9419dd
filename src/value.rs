//! Values that can be written as a single EDI token.
//!
//! [`Value`] is the closed set of scalar kinds the writer understands. Rust
//! scalars convert through `From`; anything implementing `Serialize` goes
//! through [`to_value`], which rejects sequences, maps and structs with
//! [`Error::UnsupportedValue`].
//!
//! ```rust
//! use edi_codec::{to_value, Value, TokenKind};
//!
//! assert_eq!(Value::from(52).token_kind(), TokenKind::Integer);
//! assert_eq!(Value::from(Some("PK")), Value::String("PK".to_string()));
//! assert_eq!(Value::from(None::<i32>), Value::Null);
//!
//! assert!(to_value(&vec![1, 2]).is_err());
//! assert_eq!(to_value(&true).unwrap(), Value::Boolean(true));
//! ```

use crate::{Error, Result, TokenKind};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{ser, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// A scalar value written as one token.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Char(char),
    Boolean(bool),
    Integer(i64),
    BigInteger(BigInt),
    Decimal(Decimal),
    Float(f64),
    Date(NaiveDateTime),
    /// Date-time with offset, written as its UTC date-time.
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    Uri(Url),
}

impl Value {
    /// Token kind this value is written as.
    pub fn token_kind(&self) -> TokenKind {
        match self {
            Value::Null => TokenKind::Null,
            Value::String(_) | Value::Char(_) | Value::Guid(_) | Value::Uri(_) => {
                TokenKind::String
            }
            Value::Boolean(_) => TokenKind::Boolean,
            Value::Integer(_) | Value::BigInteger(_) => TokenKind::Integer,
            Value::Decimal(_) | Value::Float(_) => TokenKind::Float,
            Value::Date(_) | Value::DateTimeOffset(_) => TokenKind::Date,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(n) => Some(Decimal::from(*n)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTimeOffset(d) => Some(d.naive_utc()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Char(c) => write!(f, "{}", c),
            Value::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Integer(n) => write!(f, "{}", n),
            Value::BigInteger(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(x) => write!(f, "{}", x),
            Value::Date(d) => write!(f, "{}", d.format("%Y%m%d%H%M%S")),
            Value::DateTimeOffset(d) => write!(f, "{}", d.naive_utc().format("%Y%m%d%H%M%S")),
            Value::Guid(u) => write!(f, "{}", u.hyphenated()),
            Value::Uri(u) => f.write_str(u.as_str()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

macro_rules! from_lossless_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Integer(i64::from(n))
                }
            }
        )*
    };
}

from_lossless_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::BigInteger(BigInt::from(n)),
        }
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::BigInteger(BigInt::from(n)),
        }
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInteger(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(d: DateTime<Tz>) -> Self {
        Value::DateTimeOffset(d.fixed_offset())
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Guid(u)
    }
}

impl From<Url> for Value {
    fn from(u: Url) -> Self {
        Value::Uri(u)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Converts any scalar `T: Serialize` to a [`Value`].
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] for bytes, sequences, tuples, maps,
/// structs and data-carrying enum variants.
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Serializer accepting exactly one scalar.
pub struct ValueSerializer;

fn not_a_token(what: &str) -> Error {
    Error::unsupported_value(format!("{} cannot be written as a single EDI token", what))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = ser::Impossible<Value, Error>;
    type SerializeTuple = ser::Impossible<Value, Error>;
    type SerializeTupleStruct = ser::Impossible<Value, Error>;
    type SerializeTupleVariant = ser::Impossible<Value, Error>;
    type SerializeMap = ser::Impossible<Value, Error>;
    type SerializeStruct = ser::Impossible<Value, Error>;
    type SerializeStructVariant = ser::Impossible<Value, Error>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Integer(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value> {
        Err(not_a_token("a byte array"))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_token(&format!("variant {}::{}", name, variant)))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_token("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_token("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_token(&format!("tuple struct {}", name)))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_token(&format!("variant {}::{}", name, variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_a_token("a map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_a_token(&format!("struct {}", name)))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_token(&format!("variant {}::{}", name, variant)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Composite {
        a: i32,
    }

    #[derive(Serialize)]
    struct Quantity(u32);

    #[derive(Serialize)]
    enum Status {
        Accepted,
        Rejected(String),
    }

    #[test]
    fn test_from_scalars() {
        assert_eq!(Value::from("x").token_kind(), TokenKind::String);
        assert_eq!(Value::from('D').token_kind(), TokenKind::String);
        assert_eq!(Value::from(1.5f32), Value::Float(1.5));
        assert_eq!(Value::from(u64::MAX).token_kind(), TokenKind::Integer);
        assert!(matches!(Value::from(u64::MAX), Value::BigInteger(_)));
        assert_eq!(Value::from(7u64), Value::Integer(7));
    }

    #[test]
    fn test_to_value_accepts_scalars() {
        assert_eq!(to_value(&42u8).unwrap(), Value::Integer(42));
        assert_eq!(to_value(&Quantity(3)).unwrap(), Value::Integer(3));
        assert_eq!(to_value(&Status::Accepted).unwrap(), Value::from("Accepted"));
        assert_eq!(to_value(&None::<String>).unwrap(), Value::Null);
        assert_eq!(to_value(&Some("x")).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_to_value_rejects_composites() {
        let mut map = BTreeMap::new();
        map.insert("k", 1);
        let failures = [
            to_value(&vec![1, 2, 3]),
            to_value(&(1, 2)),
            to_value(&map),
            to_value(&Composite { a: 1 }),
            to_value(&Status::Rejected("late".to_string())),
        ];
        for result in failures {
            assert!(matches!(result, Err(Error::UnsupportedValue(_))));
        }
    }

    #[test]
    fn test_date_time_offset_is_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2022, 6, 30, 9, 35, 0).unwrap();
        let value = Value::from(local);
        assert_eq!(value.token_kind(), TokenKind::Date);
        assert_eq!(value.to_string(), "20220630073500");
    }
}
