//! The uniform attribute map and its typed accessors.

use crate::error::{CodecError, CodecResult};
use crate::json;
use crate::kind::{AttributeKind, AttributeValue};
use crate::scalar::Scalar;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute name to ordered list of strings.
///
/// This is the only shape the backing store ever sees. An absent attribute
/// and an empty list are equivalent; setters remove the entry instead of
/// storing an empty list so the stored attribute set stays minimal.
///
/// Structured reads decode a fresh `Vec` on every call. Mutating the
/// returned collection has no effect until it is written back with the
/// matching setter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw stored list, empty when the attribute is absent.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the first raw stored element, if any.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// Returns true if the attribute has at least one element.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Replaces the raw stored list. An empty list removes the attribute.
    pub fn replace(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        if values.is_empty() {
            self.0.remove(&name);
        } else {
            self.0.insert(name, values);
        }
    }

    /// Removes the attribute, returning its previous raw list.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(name)
    }

    /// Returns the attribute names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(name, raw list)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of stored attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no attribute is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the first element of `name`, or returns `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the stored text is not a valid
    /// canonical form for `T`.
    pub fn get_scalar<T: Scalar>(&self, name: &str, default: T) -> CodecResult<T> {
        Ok(self.get_scalar_opt(name)?.unwrap_or(default))
    }

    /// Decodes the first element of `name`, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] on unparsable text.
    pub fn get_scalar_opt<T: Scalar>(&self, name: &str) -> CodecResult<Option<T>> {
        self.first(name)
            .map(|text| {
                T::from_text(text).map_err(|message| CodecError::decode(name, T::KIND, message))
            })
            .transpose()
    }

    /// Stores a scalar as a single canonical-text element.
    ///
    /// `None` removes the attribute entirely.
    pub fn set_scalar<T: Scalar>(&mut self, name: &str, value: Option<T>) {
        match value {
            Some(value) => self.replace(name, vec![value.to_text()]),
            None => {
                self.remove(name);
            }
        }
    }

    /// Decodes a single structured value stored as one JSON element.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the element is not valid JSON for `T`.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> CodecResult<Option<T>> {
        self.first(name)
            .map(|text| {
                json::parse(text)
                    .map_err(|e| CodecError::decode(name, AttributeKind::Json, e.to_string()))
            })
            .transpose()
    }

    /// Stores a single structured value as one canonical JSON element.
    ///
    /// `None` removes the attribute entirely.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if `T` cannot be serialized.
    pub fn set_json<T: Serialize>(&mut self, name: &str, value: Option<&T>) -> CodecResult<()> {
        match value {
            Some(value) => {
                let text =
                    json::to_canonical(value).map_err(|e| CodecError::encode(name, e.to_string()))?;
                self.replace(name, vec![text]);
            }
            None => {
                self.remove(name);
            }
        }
        Ok(())
    }

    /// Decodes every stored element of `name` independently.
    ///
    /// An absent attribute yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] on the first element that does not
    /// decode as `T`.
    pub fn get_structured<T: DeserializeOwned>(&self, name: &str) -> CodecResult<Vec<T>> {
        self.values(name)
            .iter()
            .map(|text| {
                json::parse(text)
                    .map_err(|e| CodecError::decode(name, AttributeKind::JsonList, e.to_string()))
            })
            .collect()
    }

    /// Replaces the whole list with the JSON form of each element.
    ///
    /// There is no element-level patch; the previous list is discarded.
    /// The map is untouched if any element fails to serialize.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if an element cannot be serialized.
    pub fn set_structured<T: Serialize>(&mut self, name: &str, values: &[T]) -> CodecResult<()> {
        let encoded = values
            .iter()
            .map(|value| {
                json::to_canonical(value).map_err(|e| CodecError::encode(name, e.to_string()))
            })
            .collect::<CodecResult<Vec<_>>>()?;
        self.replace(name, encoded);
        Ok(())
    }

    /// Decodes `name` as a dynamically typed value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] on unparsable elements.
    pub fn get_value(&self, name: &str, kind: AttributeKind) -> CodecResult<Option<AttributeValue>> {
        AttributeValue::decode(kind, name, self.values(name))
    }

    /// Stores a dynamically typed value. `None` removes the attribute.
    pub fn set_value(&mut self, name: &str, value: Option<&AttributeValue>) {
        match value {
            Some(value) => self.replace(name, value.encode()),
            None => {
                self.remove(name);
            }
        }
    }
}

impl From<BTreeMap<String, Vec<String>>> for Attributes {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Attributes> for BTreeMap<String, Vec<String>> {
    fn from(attributes: Attributes) -> Self {
        attributes.0
    }
}

impl FromIterator<(String, Vec<String>)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, values) in iter {
            attributes.replace(name, values);
        }
        attributes
    }
}
