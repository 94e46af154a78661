//! Dump command implementation.

use super::{open, CommandResult};
use casket_core::ConflictPolicy;
use std::path::Path;

/// Runs the dump command.
pub fn run(path: &Path) -> CommandResult<()> {
    let (store, _) = open(path, ConflictPolicy::Strict)?;
    let rows = store.snapshot();
    tracing::debug!(rows = rows.len(), path = %path.display(), "dump");
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
