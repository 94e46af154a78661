//! Backing store trait definition.

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::types::{EntityId, Version};
use std::sync::Arc;

/// Result of a version-checked update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored version matched and the row was replaced.
    Applied,
    /// The stored version did not match; nothing was written.
    Conflict {
        /// Version currently stored, `None` if the row no longer exists.
        current: Option<Version>,
    },
}

impl UpdateOutcome {
    /// Returns true if the update was applied.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A row store offering only per-row compare-and-swap writes.
///
/// Stores never interpret attributes; they persist the row shape
/// `{id, version, attributes}` as given.
///
/// # Invariants
///
/// - `insert_if_absent` writes only if no row with the id exists
/// - `update_if_version_equals` writes only if the stored version equals
///   `expected`; the row is written with the entity's (already advanced)
///   version
/// - `delete_if_exists` is idempotent; deleting an absent row is not an error
/// - Stores must be `Send + Sync`; every unit of work shares the same store
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and ephemeral use
/// - [`super::FileStore`] - JSON document on disk
pub trait BackingStore: Send + Sync {
    /// Inserts the row if no row with the same id exists.
    ///
    /// Returns `false` if a row already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or written.
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool>;

    /// Replaces the row if its stored version equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or written.
    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome>;

    /// Deletes the row if it exists.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or written.
    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool>;

    /// Reads a row by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or read.
    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>>;
}

impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
        (**self).insert_if_absent(entity)
    }

    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome> {
        (**self).update_if_version_equals(entity, expected)
    }

    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
        (**self).delete_if_exists(entity)
    }

    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        (**self).get_by_id(id)
    }
}
