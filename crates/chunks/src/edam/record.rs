//! Named EDAM record tree
//!
//! A decoded [`Wire`] value with field ids replaced by names from the
//! schema tables. This is the form in which remote records enter the sync
//! pipeline, adapted to [`Flattenable`].

use std::borrow::Cow;

use base64::prelude::*;

use super::protocol::Wire;
use super::schema::StructSchema;
use crate::flatten::heuristic::{Kind, classify};
use crate::flatten::{Flattenable, Scalar, Shape, flatten};

/// A remote record with named fields
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Struct(Vec<(Cow<'static, str>, Record)>),
    List(Vec<Record>),
    Map(Vec<(Record, Record)>),
}

impl Record {
    /// Attach names to a wire value
    ///
    /// # Arguments
    /// * `wire` - Decoded value
    /// * `schema` - Schema for `wire` if it is a struct, or for its
    ///   elements/values if it is a collection
    pub fn from_wire(wire: Wire, schema: Option<&'static StructSchema>) -> Self {
        match wire {
            Wire::Bool(b) => Record::Bool(b),
            Wire::Byte(n) => Record::Int(i64::from(n)),
            Wire::I16(n) => Record::Int(i64::from(n)),
            Wire::I32(n) => Record::Int(i64::from(n)),
            Wire::I64(n) => Record::Int(n),
            Wire::Double(f) => Record::Double(f),
            Wire::Binary(bytes) => Record::Bytes(bytes),
            Wire::Struct(fields) => Record::Struct(
                fields
                    .into_iter()
                    .map(|(id, value)| {
                        let field = schema.and_then(|s| s.field(id));
                        let name = match field {
                            Some(f) => Cow::Borrowed(f.name),
                            None => Cow::Owned(format!("field_{}", id)),
                        };
                        (name, Record::from_wire(value, field.and_then(|f| f.nested)))
                    })
                    .collect(),
            ),
            Wire::Set(_, items) | Wire::List(_, items) => Record::List(
                items
                    .into_iter()
                    .map(|item| Record::from_wire(item, schema))
                    .collect(),
            ),
            Wire::Map(_, _, entries) => Record::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Record::from_wire(k, None), Record::from_wire(v, schema)))
                    .collect(),
            ),
        }
    }

    /// Field of a struct by name
    pub fn field(&self, name: &str) -> Option<&Record> {
        match self {
            Record::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Record::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Record]> {
        match self {
            Record::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render a map key as a string
    ///
    /// Byte keys follow the same text/binary decision as values: text keys
    /// stay readable, anything else becomes base64.
    fn key_string(&self) -> Cow<'_, str> {
        match self {
            Record::Bytes(bytes) => match (classify(bytes), std::str::from_utf8(bytes)) {
                (Kind::Text, Ok(text)) => Cow::Borrowed(text),
                _ => Cow::Owned(BASE64_STANDARD.encode(bytes)),
            },
            Record::Int(n) => Cow::Owned(n.to_string()),
            Record::Bool(b) => Cow::Owned(b.to_string()),
            Record::Double(f) => Cow::Owned(f.to_string()),
            composite => Cow::Owned(
                serde_json::to_string(&flatten(composite)).unwrap_or_default(),
            ),
        }
    }
}

impl Flattenable for Record {
    fn shape(&self) -> Shape<'_> {
        match self {
            Record::Bool(b) => Shape::Scalar(Scalar::Bool(*b)),
            Record::Int(n) => Shape::Scalar(Scalar::Int(*n)),
            Record::Double(f) => Shape::Scalar(Scalar::Float(*f)),
            Record::Bytes(bytes) => Shape::Scalar(Scalar::Bytes(bytes)),
            Record::Struct(fields) => Shape::Composite(
                fields
                    .iter()
                    .map(|(name, value)| (Cow::Borrowed(&name[..]), value as &dyn Flattenable))
                    .collect(),
            ),
            Record::List(items) => {
                Shape::Sequence(items.iter().map(|item| item as &dyn Flattenable).collect())
            }
            Record::Map(entries) => Shape::Composite(
                entries
                    .iter()
                    .map(|(key, value)| (key.key_string(), value as &dyn Flattenable))
                    .collect(),
            ),
        }
    }
}
