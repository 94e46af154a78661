//! Get command implementation.

use super::{open, CommandResult};
use casket_core::ConflictPolicy;
use casket_store::EntityId;
use std::path::Path;

/// Runs the get command.
pub fn run(path: &Path, id: &str) -> CommandResult<()> {
    let (_, casket) = open(path, ConflictPolicy::Strict)?;
    let entity = casket
        .get(&EntityId::from(id))?
        .ok_or_else(|| format!("Entity '{id}' not found"))?;
    println!("{}", serde_json::to_string_pretty(&entity)?);
    Ok(())
}
