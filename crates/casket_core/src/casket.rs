//! Top-level entry point.

use crate::config::Config;
use crate::error::CoreResult;
use crate::persist::PersistenceEngine;
use crate::unit_of_work::{LocalTransaction, TransactionBoundary, UnitOfWork};
use casket_store::{BackingStore, Entity, EntityId};
use std::sync::Arc;

/// A handle to a Casket over one backing store.
///
/// Cheap to share; every unit of work begun from it writes through the
/// same [`PersistenceEngine`].
///
/// # Example
///
/// ```rust
/// use casket_core::{Casket, Config};
/// use casket_store::{Entity, EntityId, InMemoryStore};
/// use std::sync::Arc;
///
/// let casket = Casket::open(Arc::new(InMemoryStore::new()), Config::default());
///
/// casket.transaction(|uow| {
///     let adapter = uow.create(Entity::new("r1"))?;
///     adapter.lock().set_scalar("name", Some("a".to_string()))?;
///     Ok(())
/// })?;
///
/// let row = casket.get(&EntityId::from("r1"))?.unwrap();
/// assert_eq!(row.attributes.first("name"), Some("a"));
/// # Ok::<(), casket_core::CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Casket {
    engine: Arc<PersistenceEngine>,
    config: Config,
}

impl Casket {
    /// Opens a Casket over the given store.
    pub fn open(store: Arc<dyn BackingStore>, config: Config) -> Self {
        Self {
            engine: Arc::new(PersistenceEngine::new(store)),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared persistence engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<PersistenceEngine> {
        &self.engine
    }

    /// Reads the stored row for `id`, bypassing any unit of work.
    pub fn get(&self, id: &EntityId) -> CoreResult<Option<Entity>> {
        self.engine.load(id)
    }

    /// Begins a unit of work bound to a host transaction.
    pub fn begin(&self, boundary: Arc<dyn TransactionBoundary>) -> UnitOfWork {
        UnitOfWork::begin(Arc::clone(&self.engine), boundary, self.config.clone())
    }

    /// Executes a function within a unit of work.
    ///
    /// If the function returns `Ok`, the transaction completes and every
    /// dirty adapter is flushed. If it returns `Err`, the unit of work is
    /// closed and nothing is written.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&UnitOfWork) -> CoreResult<T>,
    {
        let tx = Arc::new(LocalTransaction::new());
        let uow = self.begin(Arc::clone(&tx) as Arc<dyn TransactionBoundary>);
        match f(&uow) {
            Ok(result) => {
                tx.complete()?;
                Ok(result)
            }
            Err(e) => {
                uow.close();
                tx.rollback();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use casket_store::InMemoryStore;

    fn casket() -> Casket {
        Casket::open(Arc::new(InMemoryStore::new()), Config::default())
    }

    #[test]
    fn transaction_commits_on_ok() {
        let casket = casket();
        let id = EntityId::from("r1");

        casket
            .transaction(|uow| {
                let adapter = uow.create(Entity::new("r1"))?;
                adapter.lock().set_scalar("count", Some(7i64))?;
                Ok(())
            })
            .unwrap();

        let row = casket.get(&id).unwrap().unwrap();
        assert_eq!(row.attributes.get_scalar("count", 0i64).unwrap(), 7);
    }

    #[test]
    fn transaction_discards_on_err() {
        let casket = casket();

        let err = casket
            .transaction(|uow| -> CoreResult<()> {
                uow.create(Entity::new("r1"))?;
                Err(CoreError::invalid_operation("business rule"))
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        assert!(casket.get(&EntityId::from("r1")).unwrap().is_none());
    }

    #[test]
    fn reads_see_earlier_writes() {
        let casket = casket();
        casket
            .transaction(|uow| uow.create(Entity::new("r1")).map(drop))
            .unwrap();

        casket
            .transaction(|uow| {
                let id = EntityId::from("r1");
                let first = uow.load(&id)?.unwrap();
                first.lock().set_scalar("name", Some("b".to_string()))?;

                let second = uow.load(&id)?.unwrap();
                let name: Option<String> = second.lock().get_scalar_opt("name")?;
                assert_eq!(name.as_deref(), Some("b"));
                Ok(())
            })
            .unwrap();
    }
}
