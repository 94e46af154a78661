//! The per-transaction adapter cache.

use super::boundary::TransactionBoundary;
use crate::config::Config;
use crate::entity::{run_tasks, EntityAdapter, FlushChanges};
use crate::error::{CoreError, CoreResult};
use crate::persist::PersistenceEngine;
use casket_store::{Entity, EntityId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to a cached adapter.
///
/// Two handles for the same id within one unit of work always point to the
/// same adapter (`Arc::ptr_eq`).
pub type AdapterRef = Arc<Mutex<EntityAdapter>>;

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Accepting loads and mutations.
    Active,
    /// The completion hook ran; adapters were flushed.
    Completed,
    /// Closed without flushing.
    Closed,
}

struct Registry {
    adapters: HashMap<EntityId, AdapterRef>,
    state: UnitOfWorkState,
    enlisted: bool,
}

impl Registry {
    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            UnitOfWorkState::Active => Ok(()),
            state => Err(CoreError::invalid_operation(format!(
                "unit of work is {state:?}"
            ))),
        }
    }

    /// Claims the right to enlist the completion hook.
    ///
    /// Returns true exactly once per registry.
    fn claim_enlistment(&mut self) -> bool {
        !std::mem::replace(&mut self.enlisted, true)
    }
}

/// State reachable from the completion hook.
///
/// Holds no reference to the boundary so an enlisted hook never keeps its
/// own boundary alive.
struct Shared {
    registry: Mutex<Registry>,
    engine: Arc<PersistenceEngine>,
    config: Config,
}

impl Shared {
    fn on_transaction_end(&self) -> CoreResult<()> {
        let adapters = {
            let mut registry = self.registry.lock();
            if registry.state != UnitOfWorkState::Active {
                return Err(CoreError::invalid_operation(format!(
                    "transaction end on a unit of work that is {:?}",
                    registry.state
                )));
            }
            registry.state = UnitOfWorkState::Completed;
            let mut adapters: Vec<_> = registry.adapters.drain().collect();
            adapters.sort_by(|a, b| a.0.cmp(&b.0));
            adapters
        };

        debug!(adapters = adapters.len(), "flushing unit of work");
        for (_, adapter) in adapters {
            let tasks = adapter.lock().flush()?;
            run_tasks(tasks)?;
        }
        Ok(())
    }
}

/// A per-transaction identity map of entity adapters.
///
/// Construct one per logical transaction with [`UnitOfWork::begin`] and
/// pass it through the call chain. Cloning yields another handle to the same
/// cache. A unit of work is never shared by two transactions.
///
/// # Example
///
/// ```rust
/// use casket_core::{Config, LocalTransaction, PersistenceEngine, UnitOfWork};
/// use casket_store::{Entity, InMemoryStore};
/// use std::sync::Arc;
///
/// let engine = Arc::new(PersistenceEngine::new(Arc::new(InMemoryStore::new())));
/// let tx = Arc::new(LocalTransaction::new());
/// let uow = UnitOfWork::begin(engine, tx.clone(), Config::default());
///
/// let adapter = uow.create(Entity::new("r1"))?;
/// adapter.lock().set_scalar("enabled", Some(true))?;
///
/// tx.complete()?;
/// # Ok::<(), casket_core::CoreError>(())
/// ```
#[derive(Clone)]
pub struct UnitOfWork {
    shared: Arc<Shared>,
    boundary: Arc<dyn TransactionBoundary>,
}

impl UnitOfWork {
    /// Starts a unit of work bound to the given host transaction.
    ///
    /// With [`Config::enlist_on_first_use`] disabled the completion hook is
    /// enlisted immediately.
    pub fn begin(
        engine: Arc<PersistenceEngine>,
        boundary: Arc<dyn TransactionBoundary>,
        config: Config,
    ) -> Self {
        let eager = !config.enlist_on_first_use;
        let uow = Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry {
                    adapters: HashMap::new(),
                    state: UnitOfWorkState::Active,
                    enlisted: false,
                }),
                engine,
                config,
            }),
            boundary,
        };
        if eager {
            uow.enlist_if_needed();
        }
        uow
    }

    /// Returns the configuration of this unit of work.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> UnitOfWorkState {
        self.shared.registry.lock().state
    }

    /// Returns the number of cached adapters.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.shared.registry.lock().adapters.len()
    }

    /// Returns true if an adapter for `id` is cached.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.shared.registry.lock().adapters.contains_key(id)
    }

    /// Returns the cached adapter for `id`, or loads and caches one.
    ///
    /// `loader` runs only on a cache miss and without the cache locked.
    /// Returns `None` if it yields nothing; nothing is cached then.
    pub fn get_or_load<F>(&self, id: &EntityId, loader: F) -> CoreResult<Option<AdapterRef>>
    where
        F: FnOnce(&EntityId) -> CoreResult<Option<Entity>>,
    {
        {
            let registry = self.shared.registry.lock();
            registry.ensure_active()?;
            if let Some(adapter) = registry.adapters.get(id) {
                debug!(%id, "cache hit");
                return Ok(Some(Arc::clone(adapter)));
            }
        }

        let Some(entity) = loader(id)? else {
            return Ok(None);
        };
        if entity.id != *id {
            return Err(CoreError::invalid_operation(format!(
                "loader for '{id}' returned entity '{}'",
                entity.id
            )));
        }

        let adapter = {
            let mut registry = self.shared.registry.lock();
            registry.ensure_active()?;
            if let Some(existing) = registry.adapters.get(id) {
                return Ok(Some(Arc::clone(existing)));
            }
            let adapter = self.wrap(entity);
            registry.adapters.insert(id.clone(), Arc::clone(&adapter));
            adapter
        };
        debug!(%id, "cached");

        self.enlist_if_needed();
        Ok(Some(adapter))
    }

    /// Returns the adapter for `id`, reading the backing store on a miss.
    pub fn load(&self, id: &EntityId) -> CoreResult<Option<AdapterRef>> {
        let engine = Arc::clone(&self.shared.engine);
        self.get_or_load(id, |id| engine.load(id))
    }

    /// Registers a new entity that has never been persisted.
    ///
    /// The adapter starts dirty, so the insert happens when the transaction
    /// completes.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateId`] if the id is already cached.
    /// - [`CoreError::InvalidOperation`] if the entity already has a version.
    pub fn create(&self, entity: Entity) -> CoreResult<AdapterRef> {
        if entity.is_persisted() {
            return Err(CoreError::invalid_operation(format!(
                "entity '{}' already has a version",
                entity.id
            )));
        }

        let adapter = {
            let mut registry = self.shared.registry.lock();
            registry.ensure_active()?;
            if registry.adapters.contains_key(&entity.id) {
                return Err(CoreError::DuplicateId { id: entity.id });
            }
            let id = entity.id.clone();
            let adapter = self.wrap(entity);
            adapter.lock().mark_updated();
            registry.adapters.insert(id, Arc::clone(&adapter));
            adapter
        };
        debug!(id = %adapter.lock().id(), "created");

        self.enlist_if_needed();
        Ok(adapter)
    }

    /// Deletes `id` from the store immediately.
    ///
    /// A cached adapter is marked deleted and evicted, so existing handles
    /// reject further mutations and are never flushed. Returns `false` if the
    /// row was already absent.
    pub fn delete(&self, id: &EntityId) -> CoreResult<bool> {
        let cached = {
            let mut registry = self.shared.registry.lock();
            registry.ensure_active()?;
            registry.adapters.remove(id)
        };

        let entity = match cached {
            Some(adapter) => {
                let mut adapter = adapter.lock();
                adapter.mark_deleted();
                adapter.entity().clone()
            }
            None => Entity::new(id.clone()),
        };
        self.shared.engine.delete(&entity)
    }

    /// Commits every cached adapter and clears the cache.
    ///
    /// Normally invoked by the completion hook. The cache is cleared even if
    /// a commit fails; the first failure is returned and adapters already
    /// flushed stay flushed.
    pub fn on_transaction_end(&self) -> CoreResult<()> {
        self.shared.on_transaction_end()
    }

    /// Discards the cache without flushing.
    pub fn close(&self) {
        let mut registry = self.shared.registry.lock();
        let dropped = registry.adapters.len();
        registry.adapters.clear();
        if registry.state == UnitOfWorkState::Active {
            registry.state = UnitOfWorkState::Closed;
            debug!(dropped, "unit of work closed");
        }
    }

    fn wrap(&self, entity: Entity) -> AdapterRef {
        let flusher: Arc<dyn FlushChanges> = self.shared.engine.clone();
        Arc::new(Mutex::new(EntityAdapter::new(
            entity,
            flusher,
            self.shared.config.conflict_policy,
        )))
    }

    fn enlist_if_needed(&self) {
        if !self.shared.registry.lock().claim_enlistment() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        self.boundary
            .enlist_after_completion(Box::new(move || shared.on_transaction_end()));
        debug!("enlisted completion hook");
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.lock();
        f.debug_struct("UnitOfWork")
            .field("state", &registry.state)
            .field("cached", &registry.adapters.len())
            .field("enlisted", &registry.enlisted)
            .finish_non_exhaustive()
    }
}
