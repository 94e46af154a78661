//! Test fixtures and store helpers.
//!
//! Provides temporary caskets, pre-seeded stores and store wrappers that
//! simulate contention or outages.

use casket_core::{Casket, Config};
use casket_store::{
    BackingStore, Entity, EntityId, FileStore, InMemoryStore, StoreError, StoreResult,
    UpdateOutcome, Version,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A test casket with automatic cleanup.
pub struct TestCasket {
    /// The casket instance.
    pub casket: Casket,
    /// The store behind the casket.
    pub store: Arc<dyn BackingStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestCasket {
    /// Creates a casket over a new in-memory store.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates a casket over a new in-memory store with the given config.
    pub fn memory_with_config(config: Config) -> Self {
        let store: Arc<dyn BackingStore> = Arc::new(InMemoryStore::new());
        Self {
            casket: Casket::open(Arc::clone(&store), config),
            store,
            _temp_dir: None,
        }
    }

    /// Creates a casket over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("rows.json");
        let store: Arc<dyn BackingStore> =
            Arc::new(FileStore::open(&path).expect("Failed to open file store"));

        Self {
            casket: Casket::open(Arc::clone(&store), Config::default()),
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("rows.json"))
    }
}

impl std::ops::Deref for TestCasket {
    type Target = Casket;

    fn deref(&self) -> &Self::Target {
        &self.casket
    }
}

/// Runs a test with a temporary in-memory casket.
pub fn with_temp_casket<F, R>(f: F) -> R
where
    F: FnOnce(&Casket) -> R,
{
    let test_casket = TestCasket::memory();
    f(&test_casket.casket)
}

/// Runs a test with a temporary file-backed casket.
pub fn with_file_casket<F, R>(f: F) -> R
where
    F: FnOnce(&Casket, &std::path::Path) -> R,
{
    let test_casket = TestCasket::file();
    let path = test_casket
        .path()
        .expect("File casket should have a path");
    f(&test_casket.casket, &path)
}

/// Creates an in-memory store holding `count` rows at version 1.
///
/// Rows are named `e0`, `e1`, ... and carry a `name` and an `index`
/// attribute.
pub fn seeded_store(count: usize) -> InMemoryStore {
    InMemoryStore::with_rows((0..count).map(|i| {
        let mut entity = Entity::new(format!("e{i}"));
        entity.version = Some(Version::INITIAL);
        entity
            .attributes
            .set_scalar("name", Some(format!("entity {i}")));
        entity.attributes.set_scalar("index", Some(i as i64));
        entity
    }))
}

/// A store where a rival writer gets in just before conditional updates.
///
/// After [`RacingStore::race`]`(n)`, each of the next `n` calls to
/// `update_if_version_equals` first bumps the stored row by one version
/// and writes the rival attribute, then forwards the original call.
#[derive(Debug, Default)]
pub struct RacingStore {
    inner: InMemoryStore,
    races: Mutex<u32>,
    rival: Mutex<Option<(String, String)>>,
    attempts: AtomicUsize,
}

impl RacingStore {
    /// Wraps an existing store.
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Sets the attribute the rival writes on each race.
    #[must_use]
    pub fn with_rival(self, name: &str, value: &str) -> Self {
        *self.rival.lock() = Some((name.to_string(), value.to_string()));
        self
    }

    /// Makes the rival win the next `n` update races.
    pub fn race(&self, n: u32) {
        *self.races.lock() = n;
    }

    /// Returns the number of update attempts made by callers.
    pub fn update_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn rival_write(&self, id: &EntityId) -> StoreResult<()> {
        let Some(mut row) = self.inner.get_by_id(id)? else {
            return Ok(());
        };
        let Some(stored) = row.version else {
            return Ok(());
        };
        if let Some((name, value)) = self.rival.lock().clone() {
            row.attributes.replace(name, vec![value]);
        }
        row.version = Some(stored.checked_next().ok_or_else(|| {
            StoreError::corrupted(format!("version of '{id}' cannot advance"))
        })?);
        self.inner.update_if_version_equals(&row, stored)?;
        Ok(())
    }
}

impl BackingStore for RacingStore {
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
        self.inner.insert_if_absent(entity)
    }

    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome> {
        let race = {
            let mut races = self.races.lock();
            let race = *races > 0;
            if race {
                *races -= 1;
            }
            race
        };
        if race {
            self.rival_write(&entity.id)?;
        }
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.update_if_version_equals(entity, expected)
    }

    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
        self.inner.delete_if_exists(entity)
    }

    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        self.inner.get_by_id(id)
    }
}

/// A store that can be switched into an outage.
///
/// While failing, writes return [`StoreError::Unavailable`]. Reads keep
/// working unless [`FailingStore::fail_reads`] is also set.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemoryStore,
    failing: AtomicBool,
    reads_fail: AtomicBool,
    rejected: AtomicUsize,
}

impl FailingStore {
    /// Wraps an existing store.
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Starts failing writes.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Starts failing reads too.
    pub fn fail_reads(&self) {
        self.reads_fail.store(true, Ordering::SeqCst);
    }

    /// Ends the outage.
    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
        self.reads_fail.store(false, Ordering::SeqCst);
    }

    /// Returns how many calls were rejected.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::unavailable(format!("{op} rejected by outage")));
        }
        Ok(())
    }
}

impl BackingStore for FailingStore {
    fn insert_if_absent(&self, entity: &Entity) -> StoreResult<bool> {
        self.check(&self.failing, "insert")?;
        self.inner.insert_if_absent(entity)
    }

    fn update_if_version_equals(
        &self,
        entity: &Entity,
        expected: Version,
    ) -> StoreResult<UpdateOutcome> {
        self.check(&self.failing, "update")?;
        self.inner.update_if_version_equals(entity, expected)
    }

    fn delete_if_exists(&self, entity: &Entity) -> StoreResult<bool> {
        self.check(&self.failing, "delete")?;
        self.inner.delete_if_exists(entity)
    }

    fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<Entity>> {
        self.check(&self.reads_fail, "read")?;
        self.inner.get_by_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casket_core::{CoreError, ErrorCategory};

    #[test]
    fn test_memory_casket() {
        with_temp_casket(|casket| {
            casket
                .transaction(|uow| uow.create(Entity::new("r1")).map(drop))
                .unwrap();
            assert!(casket.get(&EntityId::from("r1")).unwrap().is_some());
        });
    }

    #[test]
    fn test_file_casket_persists() {
        with_file_casket(|casket, path| {
            casket
                .transaction(|uow| uow.create(Entity::new("r1")).map(drop))
                .unwrap();

            let reopened = FileStore::open(path).unwrap();
            assert_eq!(reopened.len(), 1);
        });
    }

    #[test]
    fn test_seeded_store() {
        let store = seeded_store(3);
        assert_eq!(store.len(), 3);

        let row = store.get_by_id(&EntityId::from("e2")).unwrap().unwrap();
        assert_eq!(row.version, Some(Version::INITIAL));
        assert_eq!(row.attributes.get_scalar("index", 0i64).unwrap(), 2);
    }

    #[test]
    fn test_racing_store_bumps_once_per_race() {
        let store = RacingStore::new(seeded_store(1)).with_rival("name", "rival");
        let mut row = store.get_by_id(&EntityId::from("e0")).unwrap().unwrap();
        row.version = Some(Version::new(2));

        store.race(1);
        let outcome = store.update_if_version_equals(&row, Version::INITIAL).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Conflict {
                current: Some(Version::new(2))
            }
        );

        let stored = store.get_by_id(&row.id).unwrap().unwrap();
        assert_eq!(stored.attributes.first("name"), Some("rival"));
        assert_eq!(store.update_attempts(), 1);
    }

    #[test]
    fn test_failing_store_maps_to_unavailable() {
        let store = Arc::new(FailingStore::new(seeded_store(1)));
        let casket = Casket::open(
            Arc::clone(&store) as Arc<dyn BackingStore>,
            Config::default(),
        );

        store.fail_writes();
        let err = casket
            .transaction(|uow| {
                let adapter = uow.load(&EntityId::from("e0"))?.unwrap();
                adapter.lock().set_scalar("name", Some("x".to_string()))?;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::Store(_)));
        assert_eq!(err.category(), ErrorCategory::Unavailable);
        assert_eq!(store.rejected(), 1);

        store.recover();
        let row = casket.get(&EntityId::from("e0")).unwrap().unwrap();
        assert_eq!(row.version, Some(Version::INITIAL));
    }
}
