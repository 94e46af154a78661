//! Attribute kinds and dynamically typed attribute values.

use crate::error::{CodecError, CodecResult};
use crate::json;
use crate::scalar::Scalar;
use std::fmt;

/// The closed set of value kinds an attribute can hold.
///
/// Every kind maps onto the same storage shape, an ordered list of strings:
///
/// | Kind       | Stored as                                   |
/// |------------|---------------------------------------------|
/// | `Bool`     | `["true"]` or `["false"]`                   |
/// | `Int`      | one element, 32-bit decimal text            |
/// | `Long`     | one element, 64-bit decimal text            |
/// | `Str`      | one element, the string itself              |
/// | `Json`     | one element, canonical JSON of the value    |
/// | `JsonList` | one canonical JSON element per list element |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Boolean scalar.
    Bool,
    /// 32-bit signed integer scalar.
    Int,
    /// 64-bit signed integer scalar.
    Long,
    /// String scalar.
    Str,
    /// A single structured value.
    Json,
    /// A list of structured values.
    JsonList,
}

impl AttributeKind {
    /// Returns true for kinds stored as exactly one element.
    #[must_use]
    pub const fn is_single(self) -> bool {
        !matches!(self, Self::JsonList)
    }

    /// Parses a kind from its lowercase name.
    ///
    /// Accepts `bool`, `int`, `long`, `string`, `json` and `json-list`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "string" => Some(Self::Str),
            "json" => Some(Self::Json),
            "json-list" => Some(Self::JsonList),
            _ => None,
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Str => "string",
            Self::Json => "json",
            Self::JsonList => "json-list",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed attribute value.
///
/// Used where the kind is only known at runtime (tooling, property tests).
/// Domain code normally goes through the typed accessors on
/// [`crate::Attributes`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean scalar.
    Bool(bool),
    /// 32-bit signed integer scalar.
    Int(i32),
    /// 64-bit signed integer scalar.
    Long(i64),
    /// String scalar.
    Str(String),
    /// A single structured value.
    Json(serde_json::Value),
    /// A list of structured values.
    JsonList(Vec<serde_json::Value>),
}

impl AttributeValue {
    /// Returns the kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Bool(_) => AttributeKind::Bool,
            Self::Int(_) => AttributeKind::Int,
            Self::Long(_) => AttributeKind::Long,
            Self::Str(_) => AttributeKind::Str,
            Self::Json(_) => AttributeKind::Json,
            Self::JsonList(_) => AttributeKind::JsonList,
        }
    }

    /// Encodes the value into its stored list form.
    #[must_use]
    pub fn encode(&self) -> Vec<String> {
        match self {
            Self::Bool(v) => vec![v.to_text()],
            Self::Int(v) => vec![v.to_text()],
            Self::Long(v) => vec![v.to_text()],
            Self::Str(v) => vec![v.clone()],
            Self::Json(v) => vec![json::canonical_text(v)],
            Self::JsonList(items) => items.iter().map(json::canonical_text).collect(),
        }
    }

    /// Decodes a stored list as the given kind.
    ///
    /// Single-valued kinds read the first element and return `None` for an
    /// empty list. `JsonList` always yields a value, empty when nothing is
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if an element does not parse.
    pub fn decode(
        kind: AttributeKind,
        name: &str,
        stored: &[String],
    ) -> CodecResult<Option<Self>> {
        if kind == AttributeKind::JsonList {
            let items = stored
                .iter()
                .map(|text| parse_json(name, kind, text))
                .collect::<CodecResult<Vec<_>>>()?;
            return Ok(Some(Self::JsonList(items)));
        }

        let Some(first) = stored.first() else {
            return Ok(None);
        };
        let value = match kind {
            AttributeKind::Bool => Self::Bool(parse_scalar(name, first)?),
            AttributeKind::Int => Self::Int(parse_scalar(name, first)?),
            AttributeKind::Long => Self::Long(parse_scalar(name, first)?),
            AttributeKind::Str => Self::Str(first.clone()),
            AttributeKind::Json | AttributeKind::JsonList => {
                Self::Json(parse_json(name, kind, first)?)
            }
        };
        Ok(Some(value))
    }

    /// Parses a command-line style literal into a value of the given kind.
    ///
    /// `JsonList` expects a JSON array whose elements become the list.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the literal does not parse.
    pub fn parse_literal(kind: AttributeKind, name: &str, literal: &str) -> CodecResult<Self> {
        match kind {
            AttributeKind::JsonList => {
                match parse_json(name, kind, literal)? {
                    serde_json::Value::Array(items) => Ok(Self::JsonList(items)),
                    _ => Err(CodecError::decode(name, kind, "expected a JSON array")),
                }
            }
            _ => Self::decode(kind, name, &[literal.to_string()])?
                .ok_or_else(|| CodecError::decode(name, kind, "empty literal")),
        }
    }
}

fn parse_json(name: &str, kind: AttributeKind, text: &str) -> CodecResult<serde_json::Value> {
    json::parse_value(text).map_err(|e| CodecError::decode(name, kind, e.to_string()))
}

fn parse_scalar<T: Scalar>(name: &str, text: &str) -> CodecResult<T> {
    T::from_text(text).map_err(|message| CodecError::decode(name, T::KIND, message))
}
