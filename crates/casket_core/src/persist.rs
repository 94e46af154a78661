//! Version-checked persistence over a CAS row store.
//!
//! Every durable write in Casket goes through [`PersistenceEngine`]; no row
//! is ever overwritten without a version check.

use crate::config::ConflictPolicy;
use crate::entity::FlushChanges;
use crate::error::{CoreError, CoreResult};
use casket_store::{BackingStore, Entity, EntityId, StoreError, UpdateOutcome, Version};
use std::sync::Arc;
use tracing::{debug, warn};

/// Performs conditional insert, update and delete of entities.
///
/// ## Update Algorithm
///
/// 1. An entity without a version is inserted with [`Version::INITIAL`];
///    an existing row is a [`CoreError::DuplicateId`].
/// 2. Otherwise the version is advanced by one and the row is replaced only
///    if the store still holds the previous version.
/// 3. On conflict, [`ConflictPolicy::Strict`] fails with
///    [`CoreError::StaleVersionConflict`]. [`ConflictPolicy::Lenient`]
///    adopts the stored version and attempts the update exactly once more,
///    strictly. A second conflict always fails.
///
/// The lenient reconciliation trusts the version number alone. It does not
/// check whether the other writer's change overlaps with this one, so the
/// other writer's update is silently overwritten.
pub struct PersistenceEngine {
    store: Arc<dyn BackingStore>,
}

impl PersistenceEngine {
    /// Creates an engine over the given store.
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// Reads the current row for `id`.
    pub fn load(&self, id: &EntityId) -> CoreResult<Option<Entity>> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Writes `entity`, inserting or updating depending on its version.
    ///
    /// On success `entity.version` holds the version now stored. On a
    /// conflict the version is left at the last value the engine expected
    /// to replace.
    pub fn persist(&self, entity: &mut Entity, policy: ConflictPolicy) -> CoreResult<()> {
        let Some(expected) = entity.version else {
            return self.insert(entity);
        };

        let current = match self.try_update(entity, expected)? {
            UpdateOutcome::Applied => return Ok(()),
            UpdateOutcome::Conflict { current } => current,
        };

        let adopted = match (policy, current) {
            (ConflictPolicy::Lenient, Some(adopted)) => adopted,
            _ => return Err(stale(entity, expected, current)),
        };

        warn!(
            id = %entity.id,
            %expected,
            %adopted,
            "version conflict, adopting stored version for one strict retry"
        );
        match self.try_update(entity, adopted)? {
            UpdateOutcome::Applied => Ok(()),
            UpdateOutcome::Conflict { current } => Err(stale(entity, adopted, current)),
        }
    }

    /// Deletes the row for `entity` if it exists.
    ///
    /// Returns `false` if the row was already absent.
    pub fn delete(&self, entity: &Entity) -> CoreResult<bool> {
        let deleted = self.store.delete_if_exists(entity)?;
        debug!(id = %entity.id, deleted, "delete");
        Ok(deleted)
    }

    fn insert(&self, entity: &mut Entity) -> CoreResult<()> {
        entity.version = Some(Version::INITIAL);
        match self.store.insert_if_absent(entity) {
            Ok(true) => {
                debug!(id = %entity.id, "inserted");
                Ok(())
            }
            Ok(false) => {
                entity.version = None;
                Err(CoreError::DuplicateId {
                    id: entity.id.clone(),
                })
            }
            Err(e) => {
                entity.version = None;
                Err(e.into())
            }
        }
    }

    /// Attempts one conditional update from `expected` to `expected + 1`.
    ///
    /// The entity keeps the advanced version only if the update applied.
    fn try_update(&self, entity: &mut Entity, expected: Version) -> CoreResult<UpdateOutcome> {
        let next = expected.checked_next().ok_or_else(|| {
            StoreError::corrupted(format!("version of '{}' cannot advance past {expected}", entity.id))
        })?;
        entity.version = Some(next);
        let outcome = self.store.update_if_version_equals(entity, expected);
        if !matches!(outcome, Ok(UpdateOutcome::Applied)) {
            entity.version = Some(expected);
        }

        let outcome = outcome?;
        if outcome.is_applied() {
            debug!(id = %entity.id, version = %next, "updated");
        }
        Ok(outcome)
    }
}

impl FlushChanges for PersistenceEngine {
    fn flush_changes(&self, entity: &mut Entity, policy: ConflictPolicy) -> CoreResult<()> {
        self.persist(entity, policy)
    }
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine").finish_non_exhaustive()
    }
}

fn stale(entity: &Entity, expected: Version, actual: Option<Version>) -> CoreError {
    warn!(id = %entity.id, %expected, ?actual, "stale version conflict");
    CoreError::StaleVersionConflict {
        id: entity.id.clone(),
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casket_store::{InMemoryStore, StoreResult};
    use parking_lot::Mutex;

    /// Store wrapper that lets another writer bump a row right before the
    /// next `n` update attempts.
    struct Interfering {
        inner: InMemoryStore,
        bumps: Mutex<u32>,
    }

    impl Interfering {
        fn new(inner: InMemoryStore, bumps: u32) -> Self {
            Self {
                inner,
                bumps: Mutex::new(bumps),
            }
        }
    }

    impl BackingStore for Interfering {
        fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
            self.inner.insert_if_absent(entity)
        }

        fn update_if_version_equals(
            &self,
            entity: &Entity,
            expected: Version,
        ) -> StoreResult<UpdateOutcome> {
            let mut bumps = self.bumps.lock();
            if *bumps > 0 {
                *bumps -= 1;
                let mut row = self.inner.get_by_id(&entity.id)?.unwrap();
                let stored = row.version.unwrap();
                row.version = stored.checked_next();
                self.inner.update_if_version_equals(&row, stored)?;
            }
            drop(bumps);
            self.inner.update_if_version_equals(entity, expected)
        }

        fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
            self.inner.delete_if_exists(entity)
        }

        fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
            self.inner.get_by_id(id)
        }
    }

    fn stored_at(id: &str, version: u64) -> Entity {
        let mut entity = Entity::new(id);
        entity.version = Some(Version::new(version));
        entity
    }

    fn stored_version(engine: &PersistenceEngine, id: &str) -> Option<Version> {
        engine
            .load(&EntityId::from(id))
            .unwrap()
            .and_then(|row| row.version)
    }

    #[test]
    fn insert_sets_initial_version() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::new()));
        let mut entity = Entity::new("r1");

        engine.persist(&mut entity, ConflictPolicy::Strict).unwrap();

        assert_eq!(entity.version, Some(Version::INITIAL));
        assert_eq!(stored_version(&engine, "r1"), Some(Version::INITIAL));
    }

    #[test]
    fn insert_existing_is_duplicate() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::with_rows([stored_at(
            "r1", 4,
        )])));
        let mut entity = Entity::new("r1");

        let err = engine.persist(&mut entity, ConflictPolicy::Lenient).unwrap_err();

        assert!(matches!(err, CoreError::DuplicateId { .. }));
        assert_eq!(entity.version, None);
        assert_eq!(stored_version(&engine, "r1"), Some(Version::new(4)));
    }

    #[test]
    fn versions_increase_by_one() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::new()));
        let mut entity = Entity::new("r1");

        for expected in 1..=5 {
            engine.persist(&mut entity, ConflictPolicy::Strict).unwrap();
            assert_eq!(entity.version, Some(Version::new(expected)));
            assert_eq!(stored_version(&engine, "r1"), Some(Version::new(expected)));
        }
    }

    #[test]
    fn exhausted_version_is_rejected_before_writing() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::with_rows([stored_at(
            "r1",
            u64::MAX,
        )])));
        let mut entity = stored_at("r1", u64::MAX);
        entity.attributes.set_scalar("name", Some("late".to_string()));

        let err = engine.persist(&mut entity, ConflictPolicy::Lenient).unwrap_err();

        assert!(matches!(err, CoreError::Store(StoreError::Corrupted(_))));
        assert_eq!(entity.version, Some(Version::new(u64::MAX)));
        let row = engine.load(&EntityId::from("r1")).unwrap().unwrap();
        assert_eq!(row.version, Some(Version::new(u64::MAX)));
        assert!(row.attributes.get_scalar_opt::<String>("name").unwrap().is_none());
    }

    #[test]
    fn strict_conflict_fails() {
        let store = InMemoryStore::with_rows([stored_at("r1", 4)]);
        let engine = PersistenceEngine::new(Arc::new(store));
        let mut entity = stored_at("r1", 3);

        let err = engine.persist(&mut entity, ConflictPolicy::Strict).unwrap_err();

        match err {
            CoreError::StaleVersionConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, Version::new(3));
                assert_eq!(actual, Some(Version::new(4)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(entity.version, Some(Version::new(3)));
        assert_eq!(stored_version(&engine, "r1"), Some(Version::new(4)));
    }

    #[test]
    fn lenient_reconciles_once() {
        let store = Interfering::new(InMemoryStore::with_rows([stored_at("r1", 5)]), 1);
        let engine = PersistenceEngine::new(Arc::new(store));
        let mut entity = stored_at("r1", 5);
        entity.attributes.set_scalar("name", Some("mine".to_string()));

        engine.persist(&mut entity, ConflictPolicy::Lenient).unwrap();

        assert_eq!(entity.version, Some(Version::new(7)));
        let row = engine.load(&EntityId::from("r1")).unwrap().unwrap();
        assert_eq!(row.version, Some(Version::new(7)));
        assert_eq!(row.attributes.first("name"), Some("mine"));
    }

    #[test]
    fn lenient_second_conflict_is_fatal() {
        let store = Interfering::new(InMemoryStore::with_rows([stored_at("r1", 5)]), 2);
        let engine = PersistenceEngine::new(Arc::new(store));
        let mut entity = stored_at("r1", 5);

        let err = engine.persist(&mut entity, ConflictPolicy::Lenient).unwrap_err();

        match err {
            CoreError::StaleVersionConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, Version::new(6));
                assert_eq!(actual, Some(Version::new(7)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stored_version(&engine, "r1"), Some(Version::new(7)));
    }

    #[test]
    fn strict_does_not_reconcile() {
        let store = Interfering::new(InMemoryStore::with_rows([stored_at("r1", 5)]), 1);
        let engine = PersistenceEngine::new(Arc::new(store));
        let mut entity = stored_at("r1", 5);

        let err = engine.persist(&mut entity, ConflictPolicy::Strict).unwrap_err();

        assert!(matches!(err, CoreError::StaleVersionConflict { .. }));
        assert_eq!(stored_version(&engine, "r1"), Some(Version::new(6)));
    }

    #[test]
    fn lenient_missing_row_fails() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::new()));
        let mut entity = stored_at("r1", 2);

        let err = engine.persist(&mut entity, ConflictPolicy::Lenient).unwrap_err();

        match err {
            CoreError::StaleVersionConflict { actual, .. } => assert_eq!(actual, None),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let engine = PersistenceEngine::new(Arc::new(InMemoryStore::with_rows([stored_at(
            "r1", 1,
        )])));
        let entity = stored_at("r1", 1);

        assert!(engine.delete(&entity).unwrap());
        assert!(!engine.delete(&entity).unwrap());
        assert!(engine.load(&EntityId::from("r1")).unwrap().is_none());
    }
}
