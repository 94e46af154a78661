//! File-backed row store.

use crate::backend::{BackingStore, UpdateOutcome};
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::table::RowTable;
use crate::types::{EntityId, Version};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A row store persisted as one JSON document.
///
/// Rows are kept in memory and every applied write rewrites the whole
/// document. The rewrite goes to a temporary sibling file which is then
/// renamed over the original, so a crash leaves either the old or the new
/// document, never a torn one.
///
/// # Thread Safety
///
/// Writes hold an exclusive lock across the file rewrite. A write that
/// fails to reach disk leaves the in-memory rows unchanged.
///
/// # Example
///
/// ```no_run
/// use casket_store::{BackingStore, Entity, FileStore, Version};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("rows.json")).unwrap();
/// let mut row = Entity::new("r1");
/// row.version = Some(Version::INITIAL);
/// store.insert_if_absent(&row).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    table: RwLock<RowTable>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing rows.
    ///
    /// A missing file is treated as an empty store; it is created on the
    /// first applied write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or contains the same id twice.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let rows = if path.exists() {
            Self::load(path)?
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), rows = rows.len(), "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            table: RwLock::new(RowTable::from_rows(rows)),
        })
    }

    /// Opens the store, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be loaded.
    pub fn open_with_create_dirs(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Returns true if no row is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of every row, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Entity> {
        self.table.read().sorted_rows()
    }

    fn load(path: &Path) -> StoreResult<HashMap<EntityId, Entity>> {
        let data = fs::read(path)?;
        if data.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<Entity> = serde_json::from_slice(&data)?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            if map.insert(id.clone(), row).is_some() {
                return Err(StoreError::corrupted(format!(
                    "duplicate row '{id}' in {}",
                    path.display()
                )));
            }
        }
        Ok(map)
    }

    /// Applies `op` to a copy of the rows and keeps the copy only if the
    /// operation applied and the document was written.
    fn write_with<T>(
        &self,
        op: impl FnOnce(&mut RowTable) -> T,
        applied: impl FnOnce(&T) -> bool,
    ) -> StoreResult<T> {
        let mut table = self.table.write();
        let mut next = table.clone();
        let result = op(&mut next);
        if applied(&result) {
            self.persist(&next)?;
            *table = next;
        }
        Ok(result)
    }

    fn persist(&self, table: &RowTable) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&table.sorted_rows())?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl BackingStore for FileStore {
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
        self.write_with(|table| table.insert_if_absent(entity), |applied| *applied)
    }

    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome> {
        self.write_with(
            |table| table.update_if_version_equals(entity, expected),
            |outcome| outcome.is_applied(),
        )
    }

    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
        self.write_with(|table| table.delete_if_exists(&entity.id), |applied| *applied)
    }

    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.table.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(id: &str, version: u64) -> Entity {
        let mut entity = Entity::new(id);
        entity.version = Some(Version::new(version));
        entity
    }

    #[test]
    fn file_open_missing_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("rows.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");

        {
            let store = FileStore::open(&path).unwrap();
            let mut entity = row("r1", 1);
            entity.attributes.set_scalar("enabled", Some(true));
            assert!(store.insert_if_absent(&entity).unwrap());
            assert!(store
                .update_if_version_equals(&row("r1", 2), Version::new(1))
                .unwrap()
                .is_applied());
        }

        let store = FileStore::open(&path).unwrap();
        let loaded = store.get_by_id(&EntityId::from("r1")).unwrap().unwrap();
        assert_eq!(loaded.version, Some(Version::new(2)));
    }

    #[test]
    fn file_rejected_write_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        let store = FileStore::open(&path).unwrap();

        let outcome = store
            .update_if_version_equals(&row("r1", 2), Version::new(1))
            .unwrap();
        assert!(!outcome.is_applied());
        assert!(!path.exists());
    }

    #[test]
    fn file_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        let store = FileStore::open(&path).unwrap();
        store.insert_if_absent(&row("r1", 1)).unwrap();
        assert!(store.delete_if_exists(&row("r1", 1)).unwrap());
        assert!(!store.delete_if_exists(&row("r1", 1)).unwrap());

        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn file_duplicate_rows_are_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(
            &path,
            r#"[{"id":"r1","version":1,"attributes":{}},{"id":"r1","version":2,"attributes":{}}]"#,
        )
        .unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn file_garbage_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn file_open_with_create_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("rows.json");
        let store = FileStore::open_with_create_dirs(&path).unwrap();
        store.insert_if_absent(&row("r1", 1)).unwrap();
        assert!(path.exists());
    }
}
