//! Declarative field bindings on top of the token engine.
//!
//! A [`RecordSchema`] maps field names to [`FieldBinding`]s (path, kind,
//! picture, mandatory flag, date format). It is built once per record type
//! and kept in a [`SchemaCache`] owned by the caller.
//!
//! Fields are visited in declaration order, which must follow stream order:
//! the [`ReadQueue`] only reads forward, and the writer only moves forward.
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::schema::{FieldBinding, FieldKind, RecordSchema};
//! use edi_codec::{Grammar, Reader};
//!
//! let schema = RecordSchema::new("package")
//!     .with_field("count", FieldBinding::new("PAC[0][0]".parse().unwrap(), FieldKind::Integer))
//!     .with_field("kind", FieldBinding::new("PAC[2][0]".parse().unwrap(), FieldKind::String).mandatory());
//!
//! let grammar = Grammar::edifact();
//! let mut reader = Reader::new("PAC+1+:52+PK'", grammar.clone());
//! let mut queue = reader.read_segment().unwrap().unwrap();
//! let record = schema.read_record(&mut queue, &grammar).unwrap();
//!
//! assert_eq!(record["count"].as_i64(), Some(1));
//! assert_eq!(record["kind"].as_str(), Some("PK"));
//! ```

use crate::picture::Picture;
use crate::pool::BufferPool;
use crate::{DateFormat, Error, Grammar, Path, ReadQueue, Result, TokenKind, Value, Writer};
use indexmap::map::Entry as MapEntry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io;

/// Field values of one record, in schema order.
pub type Record = IndexMap<String, Value>;

/// How a bound field's text is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Decimal,
    Date,
    Boolean,
}

/// Binding of one field to a path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub path: Path,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DateFormat>,
}

impl FieldBinding {
    pub fn new(path: Path, kind: FieldKind) -> Self {
        FieldBinding {
            path,
            kind,
            picture: None,
            mandatory: false,
            format: None,
        }
    }

    #[must_use]
    pub fn with_picture(mut self, picture: Picture) -> Self {
        self.picture = Some(picture);
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: DateFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    fn missing(&self, name: &str) -> Error {
        Error::format(format!("mandatory field '{}' is missing", name)).at_path(&self.path)
    }
}

/// Ordered field bindings of one record type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    name: String,
    fields: IndexMap<String, FieldBinding>,
}

impl RecordSchema {
    pub fn new(name: &str) -> Self {
        RecordSchema {
            name: name.to_string(),
            fields: IndexMap::new(),
        }
    }

    /// Appends a field; a field of the same name is replaced in place.
    #[must_use]
    pub fn with_field(mut self, name: &str, binding: FieldBinding) -> Self {
        self.fields.insert(name.to_string(), binding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldBinding)> {
        self.fields.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pulls every bound field out of `queue`.
    ///
    /// Absent optional fields are `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] carrying the field path when a mandatory
    /// field is missing or its text does not decode.
    pub fn read_record(&self, queue: &mut ReadQueue, grammar: &Grammar) -> Result<Record> {
        let mut record = Record::with_capacity(self.fields.len());
        for (name, binding) in &self.fields {
            let path = &binding.path;
            let value = match binding.kind {
                FieldKind::String => queue.read_as_string(path).map(Value::String),
                FieldKind::Integer => queue.read_as_i64(path)?.map(Value::Integer),
                FieldKind::Decimal => queue
                    .read_as_decimal(path, binding.picture.as_ref(), grammar.decimal_mark())?
                    .map(Value::Decimal),
                FieldKind::Date => queue
                    .read_as_date(path, binding.format.as_ref())?
                    .map(Value::Date),
                FieldKind::Boolean => queue.read_as_bool(path)?.map(Value::Boolean),
            };
            match value {
                Some(value) => {
                    record.insert(name.clone(), value);
                }
                None if binding.mandatory => return Err(binding.missing(name)),
                None => {
                    record.insert(name.clone(), Value::Null);
                }
            }
        }
        Ok(record)
    }

    /// Writes the fields of `record` as segments, terminating the last one.
    ///
    /// Null and absent optional fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] for a missing mandatory field and
    /// [`Error::Structural`] when two fields are not in stream order.
    pub fn write_record<W: io::Write, P: BufferPool>(
        &self,
        writer: &mut Writer<W, P>,
        record: &Record,
    ) -> Result<()> {
        let mut at: Option<(&str, usize, usize)> = None;

        for (name, binding) in &self.fields {
            let value = record.get(name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if binding.mandatory {
                    return Err(binding.missing(name));
                }
                continue;
            };

            let segment = binding.path.segment();
            let element = binding.path.element().unwrap_or(0);
            let component = binding.path.component().unwrap_or(0);

            match at {
                Some((current, e, c)) if current == segment => {
                    if (element, component) <= (e, c) {
                        return Err(Error::structural(
                            Some(binding.path.to_string()),
                            "field is not in stream order",
                        ));
                    }
                    if element > e {
                        move_to(writer, element - e, component)?;
                    } else {
                        for _ in c..component {
                            writer.write_token(TokenKind::ComponentStart)?;
                        }
                    }
                }
                _ => {
                    writer.write_segment_name(segment)?;
                    if element == 0 && component > 0 {
                        writer.write_token(TokenKind::Null)?;
                    }
                    move_to(writer, element, component)?;
                }
            }

            writer.write_value_with(value.clone(), binding.picture.as_ref(), binding.format.as_ref())?;
            at = Some((segment, element, component));
        }

        if at.is_some() {
            writer.write_segment_terminator()?;
        }
        Ok(())
    }
}

/// Opens `elements` elements, then `component` components in the last one.
fn move_to<W: io::Write, P: BufferPool>(
    writer: &mut Writer<W, P>,
    elements: usize,
    component: usize,
) -> Result<()> {
    for _ in 0..elements {
        writer.write_token(TokenKind::ElementStart)?;
    }
    for _ in 0..component {
        writer.write_token(TokenKind::ComponentStart)?;
    }
    Ok(())
}

/// Record schemas keyed by name, built on first use and kept for the
/// lifetime of the cache.
#[derive(Clone, Debug, Default)]
pub struct SchemaCache {
    schemas: IndexMap<String, RecordSchema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RecordSchema> {
        self.schemas.get(name)
    }

    /// Stores `schema` under its name, returning the one it replaced.
    pub fn insert(&mut self, schema: RecordSchema) -> Option<RecordSchema> {
        self.schemas.insert(schema.name.clone(), schema)
    }

    /// Returns the schema called `name`, building it with `build` on first use.
    ///
    /// A failed build caches nothing.
    pub fn get_or_try_insert_with<F>(&mut self, name: &str, build: F) -> Result<&RecordSchema>
    where
        F: FnOnce() -> Result<RecordSchema>,
    {
        match self.schemas.entry(name.to_string()) {
            MapEntry::Occupied(entry) => Ok(&*entry.into_mut()),
            MapEntry::Vacant(entry) => Ok(&*entry.insert(build()?)),
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reader, WriterOptions};
    use rust_decimal::Decimal;

    fn p(path: &str) -> Path {
        path.parse().unwrap()
    }

    fn package() -> RecordSchema {
        RecordSchema::new("package")
            .with_field("count", FieldBinding::new(p("PAC[0][0]"), FieldKind::Integer))
            .with_field("weight", FieldBinding::new(p("PAC[1][1]"), FieldKind::Integer))
            .with_field(
                "kind",
                FieldBinding::new(p("PAC[2][0]"), FieldKind::String).mandatory(),
            )
    }

    #[test]
    fn test_write_record() {
        let mut record = Record::new();
        record.insert("count".to_string(), Value::from(1));
        record.insert("weight".to_string(), Value::from(52));
        record.insert("kind".to_string(), Value::from("PK"));

        let mut writer = Writer::with_options(Vec::new(), Grammar::edifact(), WriterOptions::compact());
        package().write_record(&mut writer, &record).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "PAC+1+:52+PK'");
    }

    #[test]
    fn test_read_record_round_trip() {
        let grammar = Grammar::edifact();
        let mut reader = Reader::new("PAC+1+:52+PK'", grammar.clone());
        let mut queue = reader.read_segment().unwrap().unwrap();
        let record = package().read_record(&mut queue, &grammar).unwrap();
        assert_eq!(record["count"], Value::Integer(1));
        assert_eq!(record["weight"], Value::Integer(52));
        assert_eq!(record["kind"], Value::from("PK"));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let grammar = Grammar::edifact();
        let mut reader = Reader::new("PAC+1'", grammar.clone());
        let mut queue = reader.read_segment().unwrap().unwrap();
        let err = package().read_record(&mut queue, &grammar).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(err.path(), Some("PAC[2][0]"));

        let mut writer = Writer::with_options(Vec::new(), grammar, WriterOptions::compact());
        let err = package().write_record(&mut writer, &Record::new()).unwrap_err();
        assert_eq!(err.path(), Some("PAC[2][0]"));
    }

    #[test]
    fn test_optional_field_is_null() {
        let grammar = Grammar::edifact();
        let mut reader = Reader::new("PAC+1++PK'", grammar.clone());
        let mut queue = reader.read_segment().unwrap().unwrap();
        let record = package().read_record(&mut queue, &grammar).unwrap();
        assert_eq!(record["weight"], Value::Null);
        assert_eq!(record.get_index(1).map(|(k, _)| k.as_str()), Some("weight"));
    }

    #[test]
    fn test_decimal_field_uses_grammar_mark() {
        let schema = RecordSchema::new("amount").with_field(
            "value",
            FieldBinding::new(p("MOA[1][1]"), FieldKind::Decimal)
                .with_picture("9(3)V9(2)".parse().unwrap()),
        );

        let mut writer = Writer::with_options(Vec::new(), Grammar::edifact(), WriterOptions::compact());
        let mut record = Record::new();
        record.insert("value".to_string(), Value::from(Decimal::new(12345, 2)));
        schema.write_record(&mut writer, &record).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "MOA++:123.45'");

        let grammar = Grammar::edifact();
        let mut queue = Reader::new(&text, grammar.clone())
            .read_segment()
            .unwrap()
            .unwrap();
        let back = schema.read_record(&mut queue, &grammar).unwrap();
        assert_eq!(back["value"], Value::Decimal(Decimal::new(12345, 2)));
    }

    #[test]
    fn test_out_of_order_fields_rejected() {
        let schema = RecordSchema::new("bad")
            .with_field("b", FieldBinding::new(p("A[2][0]"), FieldKind::String))
            .with_field("a", FieldBinding::new(p("A[1][0]"), FieldKind::String));
        let mut record = Record::new();
        record.insert("a".to_string(), Value::from("x"));
        record.insert("b".to_string(), Value::from("y"));
        let mut writer = Writer::with_options(Vec::new(), Grammar::edifact(), WriterOptions::compact());
        assert!(matches!(
            schema.write_record(&mut writer, &record),
            Err(Error::Structural { .. })
        ));
    }

    #[test]
    fn test_cache_builds_once() {
        let mut cache = SchemaCache::new();
        let mut builds = 0;
        for _ in 0..3 {
            let schema = cache
                .get_or_try_insert_with("package", || {
                    builds += 1;
                    Ok(package())
                })
                .unwrap();
            assert_eq!(schema.len(), 3);
        }
        assert_eq!(builds, 1);

        let failed = cache.get_or_try_insert_with("broken", || Err(Error::custom("no")));
        assert!(failed.is_err());
        assert!(cache.get("broken").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_prefers_inserted_schema() {
        let mut cache = SchemaCache::new();
        assert!(cache.insert(package()).is_none());
        let schema = cache
            .get_or_try_insert_with("package", || Err(Error::custom("not rebuilt")))
            .unwrap();
        assert_eq!(schema, &package());

        let built = cache
            .get_or_try_insert_with("empty", || Ok(RecordSchema::new("empty")))
            .unwrap();
        assert!(built.is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_schema_serde() {
        let json = serde_json::to_string(&package()).unwrap();
        let back: RecordSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, package());
        assert!(json.contains("\"PAC[2][0]\""));
    }
}
