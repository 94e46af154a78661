//! Set command implementation.

use super::{open, CommandResult};
use casket_codec::{AttributeKind, AttributeValue};
use casket_core::{Casket, ConflictPolicy};
use casket_store::{EntityId, Version};
use std::path::Path;

/// Runs the set command.
pub fn run(
    path: &Path,
    id: &str,
    name: &str,
    kind: &str,
    value: &str,
    lenient: bool,
) -> CommandResult<()> {
    let policy = if lenient {
        ConflictPolicy::Lenient
    } else {
        ConflictPolicy::Strict
    };
    let (_, casket) = open(path, policy)?;
    let version = set(&casket, id, name, kind, value)?;
    println!("Set {name} on {id} ({version})");
    Ok(())
}

/// Sets one attribute on an existing entity and returns the new version.
pub(crate) fn set(
    casket: &Casket,
    id: &str,
    name: &str,
    kind: &str,
    literal: &str,
) -> CommandResult<Version> {
    let kind = AttributeKind::from_name(kind)
        .filter(|kind| *kind != AttributeKind::JsonList)
        .ok_or_else(|| format!("Unknown kind '{kind}' (expected bool, int, long, string or json)"))?;
    let value = AttributeValue::parse_literal(kind, name, literal)?;
    let id = EntityId::from(id);

    let loaded = casket.transaction(|uow| {
        let Some(adapter) = uow.load(&id)? else {
            return Ok(None);
        };
        adapter.lock().set_value(name, Some(&value))?;
        Ok(Some(adapter))
    })?;

    let adapter = loaded.ok_or_else(|| format!("Entity '{id}' not found"))?;
    let version = adapter
        .lock()
        .version()
        .ok_or("entity has no version after set")?;
    Ok(version)
}
