//! Property-based test generators using proptest.
//!
//! Provides strategies for generating attribute values, entities and
//! mutation sequences. Structured values never contain floats, so every
//! generated value survives a text round trip exactly.

use casket_codec::{AttributeKind, AttributeValue, Attributes};
use casket_store::{Entity, EntityId};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}")
        .expect("Invalid regex")
        .prop_map(EntityId::from)
}

/// Strategy for generating attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating attribute kinds.
pub fn attribute_kind_strategy() -> impl Strategy<Value = AttributeKind> {
    prop_oneof![
        Just(AttributeKind::Bool),
        Just(AttributeKind::Int),
        Just(AttributeKind::Long),
        Just(AttributeKind::Str),
        Just(AttributeKind::Json),
        Just(AttributeKind::JsonList),
    ]
}

/// Strategy for generating float-free JSON values.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for generating a value of the given kind.
pub fn attribute_value_of(kind: AttributeKind) -> BoxedStrategy<AttributeValue> {
    match kind {
        AttributeKind::Bool => any::<bool>().prop_map(AttributeValue::Bool).boxed(),
        AttributeKind::Int => any::<i32>().prop_map(AttributeValue::Int).boxed(),
        AttributeKind::Long => any::<i64>().prop_map(AttributeValue::Long).boxed(),
        AttributeKind::Str => ".{0,24}".prop_map(AttributeValue::Str).boxed(),
        AttributeKind::Json => json_value_strategy().prop_map(AttributeValue::Json).boxed(),
        AttributeKind::JsonList => prop::collection::vec(json_value_strategy(), 0..5)
            .prop_map(AttributeValue::JsonList)
            .boxed(),
    }
}

/// Strategy for generating attribute values of any kind.
pub fn attribute_value_strategy() -> impl Strategy<Value = AttributeValue> {
    attribute_kind_strategy().prop_flat_map(attribute_value_of)
}

/// Strategy for generating attribute maps.
pub fn attributes_strategy() -> impl Strategy<Value = Attributes> {
    prop::collection::btree_map(attribute_name_strategy(), attribute_value_strategy(), 0..6)
        .prop_map(|values| {
            let mut attributes = Attributes::new();
            for (name, value) in values {
                attributes.set_value(&name, Some(&value));
            }
            attributes
        })
}

/// Strategy for generating never-persisted entities.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    (entity_id_strategy(), attributes_strategy())
        .prop_map(|(id, attributes)| Entity::new(id).with_attributes(attributes))
}

/// One step of a generated unit-of-work workload.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Set an attribute
    Set {
        /// Attribute name
        name: String,
        /// New value
        value: AttributeValue,
    },
    /// Remove an attribute
    Remove {
        /// Attribute name
        name: String,
    },
    /// Commit the current transaction and start a new one
    Commit,
}

/// Strategy for generating a single mutation.
///
/// Names are drawn from a small pool so mutations overwrite each other.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    let name = prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string);
    prop_oneof![
        6 => (name.clone(), attribute_value_strategy())
            .prop_map(|(name, value)| Mutation::Set { name, value }),
        2 => name.prop_map(|name| Mutation::Remove { name }),
        1 => Just(Mutation::Commit),
    ]
}

/// Strategy for generating a sequence of mutations.
pub fn mutation_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_entity_id_generation() {
        let mut runner = TestRunner::default();
        let id = entity_id_strategy()
            .new_tree(&mut runner)
            .unwrap()
            .current();
        assert!(!id.as_str().is_empty());
    }

    proptest! {
        #[test]
        fn generated_values_match_requested_kind(kind in attribute_kind_strategy()) {
            let mut runner = TestRunner::default();
            let value = attribute_value_of(kind).new_tree(&mut runner).unwrap().current();
            prop_assert_eq!(value.kind(), kind);
        }

        #[test]
        fn generated_entities_are_new(entity in entity_strategy()) {
            prop_assert!(entity.version.is_none());
        }
    }
}
