//! Record flattening
//!
//! Remote records are adapted to [`Flattenable`] at the boundary where they
//! enter the crate. The flattener then only ever looks at three shapes:
//! composites (named fields), sequences and scalars. It never inspects the
//! concrete record type, so every record the remote schema defines is
//! handled the same way.

pub mod heuristic;

use std::borrow::Cow;

use crate::value::{Number, Value};
use heuristic::Kind;

/// A primitive leaf of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A string-like byte sequence, text or binary
    Bytes(&'a [u8]),
}

/// The structural view a record exposes to the flattener
pub enum Shape<'a> {
    /// Ordered (field name, field value) pairs
    Composite(Vec<(Cow<'a, str>, &'a dyn Flattenable)>),
    /// Ordered elements
    Sequence(Vec<&'a dyn Flattenable>),
    Scalar(Scalar<'a>),
}

/// Anything that can be converted into a [`Value`] tree
pub trait Flattenable {
    fn shape(&self) -> Shape<'_>;
}

/// Convert a record into a universal value tree
///
/// Total: every shape maps to a value. Byte strings go through
/// [`heuristic::classify`]; a text classification whose bytes are not valid
/// UTF-8 is kept as binary so that no byte is lost.
pub fn flatten<T: Flattenable + ?Sized>(record: &T) -> Value {
    match record.shape() {
        Shape::Composite(fields) => Value::map_from(
            fields
                .into_iter()
                .map(|(name, child)| (name.into_owned(), flatten(child))),
        ),
        Shape::Sequence(items) => Value::List(items.into_iter().map(|item| flatten(item)).collect()),
        Shape::Scalar(scalar) => flatten_scalar(scalar),
    }
}

fn flatten_scalar(scalar: Scalar<'_>) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(b),
        Scalar::Int(n) => Value::Number(Number::Int(n)),
        Scalar::Float(f) => Value::Number(Number::Float(f)),
        Scalar::Bytes(bytes) => match heuristic::classify(bytes) {
            Kind::Text => match std::str::from_utf8(bytes) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Binary(bytes.to_vec()),
            },
            Kind::Binary => Value::Binary(bytes.to_vec()),
        },
    }
}

impl<T: Flattenable> Flattenable for Option<T> {
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(inner) => inner.shape(),
            None => Shape::Scalar(Scalar::Null),
        }
    }
}

impl<T: Flattenable> Flattenable for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(self.iter().map(|item| item as &dyn Flattenable).collect())
    }
}

impl Flattenable for str {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Bytes(self.as_bytes()))
    }
}

impl Flattenable for String {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Bytes(self.as_bytes()))
    }
}

impl Flattenable for bool {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Bool(*self))
    }
}

impl Flattenable for i32 {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Int(i64::from(*self)))
    }
}

impl Flattenable for i64 {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Int(*self))
    }
}

impl Flattenable for f64 {
    fn shape(&self) -> Shape<'_> {
        Shape::Scalar(Scalar::Float(*self))
    }
}
