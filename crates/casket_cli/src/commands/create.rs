//! Create command implementation.

use super::{open, CommandResult};
use casket_codec::{AttributeKind, AttributeValue};
use casket_core::{Casket, ConflictPolicy};
use casket_store::{Entity, EntityId, Version};
use std::path::Path;

/// Runs the create command.
pub fn run(path: &Path, id: Option<&str>, attrs: &[String]) -> CommandResult<()> {
    let (_, casket) = open(path, ConflictPolicy::Strict)?;
    let id = id.map_or_else(EntityId::generate, EntityId::from);
    let version = create(&casket, id.as_str(), attrs)?;
    println!("Created {id} ({version})");
    Ok(())
}

/// Creates the entity and returns its stored version.
pub(crate) fn create(casket: &Casket, id: &str, attrs: &[String]) -> CommandResult<Version> {
    let values = attrs
        .iter()
        .map(String::as_str)
        .map(parse_attr)
        .collect::<CommandResult<Vec<_>>>()?;

    casket.transaction(|uow| {
        let adapter = uow.create(Entity::new(id))?;
        let mut entity = adapter.lock();
        for (name, value) in &values {
            entity.set_value(name, Some(value))?;
        }
        Ok(())
    })?;

    let version = casket
        .get(&EntityId::from(id))?
        .and_then(|row| row.version)
        .ok_or("entity vanished after create")?;
    Ok(version)
}

/// Parses `name=value` or `name:kind=value`. The kind defaults to string.
pub(crate) fn parse_attr(attr: &str) -> CommandResult<(String, AttributeValue)> {
    let (key, literal) = attr
        .split_once('=')
        .ok_or_else(|| format!("Attribute '{attr}' is not name=value"))?;
    let (name, kind) = match key.split_once(':') {
        Some((name, kind)) => (
            name,
            AttributeKind::from_name(kind).ok_or_else(|| format!("Unknown kind '{kind}'"))?,
        ),
        None => (key, AttributeKind::Str),
    };
    if name.is_empty() {
        return Err(format!("Attribute '{attr}' has no name").into());
    }
    let value = AttributeValue::parse_literal(kind, name, literal)?;
    Ok((name.to_string(), value))
}
