//! Canonical text forms for scalar attribute values.

use crate::kind::AttributeKind;

/// A value stored as a single canonical-text element.
///
/// Text forms are locale independent: decimal digits with an optional
/// leading `-` for integers, the literal tokens `true`/`false` for
/// booleans.
pub trait Scalar: Sized {
    /// The kind tag this type is stored under.
    const KIND: AttributeKind;

    /// Renders the canonical text form.
    fn to_text(&self) -> String;

    /// Parses the canonical text form.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `text` is not a valid
    /// canonical form for this type.
    fn from_text(text: &str) -> Result<Self, String>;
}

impl Scalar for bool {
    const KIND: AttributeKind = AttributeKind::Bool;

    fn to_text(&self) -> String {
        String::from(if *self { "true" } else { "false" })
    }

    fn from_text(text: &str) -> Result<Self, String> {
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("expected 'true' or 'false', got '{other}'")),
        }
    }
}

impl Scalar for i32 {
    const KIND: AttributeKind = AttributeKind::Int;

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Result<Self, String> {
        text.parse().map_err(|e| format!("'{text}': {e}"))
    }
}

impl Scalar for i64 {
    const KIND: AttributeKind = AttributeKind::Long;

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Result<Self, String> {
        text.parse().map_err(|e| format!("'{text}': {e}"))
    }
}

impl Scalar for String {
    const KIND: AttributeKind = AttributeKind::Str;

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}
