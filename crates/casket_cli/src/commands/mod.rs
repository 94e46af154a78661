//! CLI command implementations.

pub mod create;
pub mod delete;
pub mod dump;
pub mod get;
pub mod set;

use casket_core::{Casket, Config, ConflictPolicy};
use casket_store::{BackingStore, FileStore};
use std::path::Path;
use std::sync::Arc;

/// Result type shared by every command.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Opens the store at `path` and a casket over it.
pub fn open(path: &Path, policy: ConflictPolicy) -> CommandResult<(Arc<FileStore>, Casket)> {
    let store = Arc::new(FileStore::open_with_create_dirs(path)?);
    let casket = Casket::open(
        Arc::clone(&store) as Arc<dyn BackingStore>,
        Config::new().conflict_policy(policy),
    );
    Ok((store, casket))
}
