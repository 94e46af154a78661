//! Delete command implementation.

use super::{open, CommandResult};
use casket_core::{Casket, ConflictPolicy};
use casket_store::EntityId;
use std::path::Path;

/// Runs the delete command.
pub fn run(path: &Path, id: &str) -> CommandResult<()> {
    let (_, casket) = open(path, ConflictPolicy::Strict)?;
    if delete(&casket, id)? {
        println!("Deleted {id}");
    } else {
        println!("{id} did not exist");
    }
    Ok(())
}

/// Deletes `id`, returning false if it was already absent.
pub(crate) fn delete(casket: &Casket, id: &str) -> CommandResult<bool> {
    let id = EntityId::from(id);
    Ok(casket.transaction(|uow| uow.delete(&id))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create::create;
    use tempfile::tempdir;

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let (store, casket) = open(&dir.path().join("rows.json"), ConflictPolicy::Strict).unwrap();
        create(&casket, "r1", &[]).unwrap();

        assert!(delete(&casket, "r1").unwrap());
        assert!(!delete(&casket, "r1").unwrap());
        assert!(store.is_empty());
    }
}
