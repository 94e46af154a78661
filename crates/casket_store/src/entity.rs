//! The persisted record.

use crate::types::{EntityId, Version};
use casket_codec::Attributes;
use serde::{Deserialize, Serialize};

/// One stored row: `{id, version, attributes}`.
///
/// `version` is `None` until the first successful insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Immutable identifier.
    pub id: EntityId,
    /// Stored version, `None` if never persisted.
    pub version: Option<Version>,
    /// Attribute values.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Entity {
    /// Creates a never-persisted entity with no attributes.
    #[must_use]
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the initial attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns true if the entity has been inserted at least once.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.version.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_is_not_persisted() {
        let entity = Entity::new("r1");
        assert!(!entity.is_persisted());
        assert!(entity.attributes.is_empty());
    }

    #[test]
    fn wire_shape() {
        let mut entity = Entity::new("r1");
        entity.version = Some(Version::new(3));
        entity.attributes.set_scalar("enabled", Some(true));

        let text = serde_json::to_string(&entity).unwrap();
        assert_eq!(
            text,
            r#"{"id":"r1","version":3,"attributes":{"enabled":["true"]}}"#
        );
    }

    #[test]
    fn missing_attributes_default_to_empty() {
        let entity: Entity = serde_json::from_str(r#"{"id":"r1","version":null}"#).unwrap();
        assert_eq!(entity, Entity::new("r1"));
    }
}
