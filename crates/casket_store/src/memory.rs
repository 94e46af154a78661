//! In-memory row store.

use crate::backend::{BackingStore, UpdateOutcome};
use crate::entity::Entity;
use crate::error::StoreResult;
use crate::table::RowTable;
use crate::types::{EntityId, Version};
use parking_lot::RwLock;

/// An in-memory row store.
///
/// This store keeps every row in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// Conditional writes take an exclusive lock, so two racing updates from
/// the same observed version resolve to exactly one winner.
///
/// # Example
///
/// ```rust
/// use casket_store::{BackingStore, Entity, InMemoryStore, Version};
///
/// let store = InMemoryStore::new();
/// let mut row = Entity::new("r1");
/// row.version = Some(Version::INITIAL);
///
/// assert!(store.insert_if_absent(&row).unwrap());
/// assert!(!store.insert_if_absent(&row).unwrap());
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    table: RwLock<RowTable>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing rows.
    ///
    /// Later rows replace earlier rows with the same id.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = Entity>) -> Self {
        let rows = rows.into_iter().map(|row| (row.id.clone(), row)).collect();
        Self {
            table: RwLock::new(RowTable::from_rows(rows)),
        }
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

    /// Removes every row.
    pub fn clear(&self) {
        self.table.write().clear();
    }
}

impl BackingStore for InMemoryStore {
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
        Ok(self.table.write().insert_if_absent(entity))
    }

    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome> {
        Ok(self.table.write().update_if_version_equals(entity, expected))
    }

    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
        Ok(self.table.write().delete_if_exists(&entity.id))
    }

    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.table.read().get(id).cloned())
    }
}
