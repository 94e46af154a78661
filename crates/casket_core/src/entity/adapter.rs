//! Adapter state and lifecycle.

use crate::config::ConflictPolicy;
use crate::error::{CoreError, CoreResult};
use casket_codec::{AttributeKind, AttributeValue, Attributes, Scalar};
use casket_store::{Entity, EntityId, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Deferred action run once after the owning adapter's write succeeds.
pub type PostCommitTask = Box<dyn FnOnce() -> CoreResult<()> + Send>;

/// The single write path for adapters.
///
/// [`crate::PersistenceEngine`] is the production implementation.
pub trait FlushChanges: Send + Sync {
    /// Durably writes the entity's current state.
    ///
    /// On success the entity carries the version now stored.
    fn flush_changes(&self, entity: &mut Entity, policy: ConflictPolicy) -> CoreResult<()>;
}

/// Lifecycle state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// No unflushed mutations.
    Clean,
    /// Mutated since the last successful commit.
    Dirty,
    /// Marked deleted; terminal.
    Deleted,
}

/// Unit-of-work wrapper around one entity.
///
/// Tracks whether the entity was mutated, whether it was deleted, and the
/// tasks to run once its write has succeeded.
///
/// ## State Machine
///
/// ```text
/// Clean --mutation--> Dirty --commit--> Clean
/// Clean/Dirty --UnitOfWork::delete--> Deleted (terminal)
/// ```
///
/// A deleted adapter is never flushed, even if it was mutated earlier in
/// the same unit of work, and rejects further mutations. Deletion always
/// goes through the unit of work, which evicts the adapter from its cache:
///
/// ```compile_fail
/// fn remove(adapter: &mut casket_core::EntityAdapter) {
///     adapter.mark_deleted();
/// }
/// ```
pub struct EntityAdapter {
    entity: Entity,
    updated: bool,
    deleted: bool,
    policy: ConflictPolicy,
    tasks: Vec<PostCommitTask>,
    flusher: Arc<dyn FlushChanges>,
}

impl EntityAdapter {
    /// Wraps an entity. The adapter starts clean.
    pub fn new(entity: Entity, flusher: Arc<dyn FlushChanges>, policy: ConflictPolicy) -> Self {
        Self {
            entity,
            updated: false,
            deleted: false,
            policy,
            tasks: Vec::new(),
            flusher,
        }
    }

    /// Returns the stable entity id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    /// Returns the version the adapter believes is stored.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        self.entity.version
    }

    /// Returns the wrapped entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Returns the raw attribute map.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.entity.attributes
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AdapterState {
        if self.deleted {
            AdapterState::Deleted
        } else if self.updated {
            AdapterState::Dirty
        } else {
            AdapterState::Clean
        }
    }

    /// Returns true if there are unflushed mutations.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Returns true if the adapter was marked deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the number of queued post-commit tasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the conflict policy used on flush.
    #[must_use]
    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Overrides the conflict policy for this adapter.
    pub fn set_conflict_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    /// Marks the adapter dirty.
    pub fn mark_updated(&mut self) {
        self.updated = true;
    }

    /// Marks the adapter dirty and queues a task to run after its write.
    ///
    /// Tasks run in registration order, only after a successful flush, and
    /// never more than once. When the unit of work commits, tasks run after
    /// the adapter's lock is released, so a task may lock its own
    /// [`crate::AdapterRef`]. Calling [`EntityAdapter::commit`] directly
    /// runs them while the caller still holds that lock.
    pub fn mark_updated_with<F>(&mut self, task: F)
    where
        F: FnOnce() -> CoreResult<()> + Send + 'static,
    {
        self.updated = true;
        self.tasks.push(Box::new(task));
    }

    /// Marks the adapter deleted. Queued tasks are discarded.
    ///
    /// Only [`crate::UnitOfWork::delete`] calls this, so a deleted adapter
    /// is never left in the cache.
    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
        self.tasks.clear();
    }

    /// Flushes pending mutations and runs the queued tasks.
    ///
    /// Does nothing unless the adapter is dirty and not deleted. If the
    /// flush fails no task runs and the adapter stays dirty, so a later
    /// commit attempts the write again. Once the flush succeeds the task
    /// list is drained before the first task runs: a failing task stops the
    /// remaining ones and its error is returned, but no task is ever run a
    /// second time.
    pub fn commit(&mut self) -> CoreResult<()> {
        let tasks = self.flush()?;
        run_tasks(tasks)
    }

    /// Flushes pending mutations and hands back the drained task list.
    pub(crate) fn flush(&mut self) -> CoreResult<Vec<PostCommitTask>> {
        if !self.updated || self.deleted {
            return Ok(Vec::new());
        }

        self.flusher.flush_changes(&mut self.entity, self.policy)?;
        self.updated = false;

        let tasks = std::mem::take(&mut self.tasks);
        debug!(id = %self.entity.id, version = ?self.entity.version, tasks = tasks.len(), "committed");
        Ok(tasks)
    }

    /// Decodes a scalar attribute, or `default` when absent.
    pub fn get_scalar<T: Scalar>(&self, name: &str, default: T) -> CoreResult<T> {
        Ok(self.entity.attributes.get_scalar(name, default)?)
    }

    /// Decodes a scalar attribute, `None` when absent.
    pub fn get_scalar_opt<T: Scalar>(&self, name: &str) -> CoreResult<Option<T>> {
        Ok(self.entity.attributes.get_scalar_opt(name)?)
    }

    /// Stores a scalar attribute and marks the adapter dirty.
    ///
    /// `None` removes the attribute.
    pub fn set_scalar<T: Scalar>(&mut self, name: &str, value: Option<T>) -> CoreResult<()> {
        self.ensure_live()?;
        self.entity.attributes.set_scalar(name, value);
        self.mark_updated();
        Ok(())
    }

    /// Decodes a single structured attribute.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Option<T>> {
        Ok(self.entity.attributes.get_json(name)?)
    }

    /// Stores a single structured attribute and marks the adapter dirty.
    pub fn set_json<T: Serialize>(&mut self, name: &str, value: Option<&T>) -> CoreResult<()> {
        self.ensure_live()?;
        self.entity.attributes.set_json(name, value)?;
        self.mark_updated();
        Ok(())
    }

    /// Decodes a structured collection; empty when absent.
    ///
    /// The result is freshly decoded on every call.
    pub fn get_structured<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Vec<T>> {
        Ok(self.entity.attributes.get_structured(name)?)
    }

    /// Replaces a structured collection and marks the adapter dirty.
    pub fn set_structured<T: Serialize>(&mut self, name: &str, values: &[T]) -> CoreResult<()> {
        self.ensure_live()?;
        self.entity.attributes.set_structured(name, values)?;
        self.mark_updated();
        Ok(())
    }

    /// Replaces a structured collection and queues a post-commit task.
    pub fn set_structured_with<T, F>(&mut self, name: &str, values: &[T], task: F) -> CoreResult<()>
    where
        T: Serialize,
        F: FnOnce() -> CoreResult<()> + Send + 'static,
    {
        self.ensure_live()?;
        self.entity.attributes.set_structured(name, values)?;
        self.mark_updated_with(task);
        Ok(())
    }

    /// Decodes an attribute as a dynamically typed value.
    pub fn get_value(&self, name: &str, kind: AttributeKind) -> CoreResult<Option<AttributeValue>> {
        Ok(self.entity.attributes.get_value(name, kind)?)
    }

    /// Stores a dynamically typed value and marks the adapter dirty.
    pub fn set_value(&mut self, name: &str, value: Option<&AttributeValue>) -> CoreResult<()> {
        self.ensure_live()?;
        self.entity.attributes.set_value(name, value);
        self.mark_updated();
        Ok(())
    }

    fn ensure_live(&self) -> CoreResult<()> {
        if self.deleted {
            return Err(CoreError::invalid_operation(format!(
                "entity '{}' was deleted in this unit of work",
                self.entity.id
            )));
        }
        Ok(())
    }
}

/// Runs drained post-commit tasks in order, stopping at the first error.
pub(crate) fn run_tasks(tasks: Vec<PostCommitTask>) -> CoreResult<()> {
    for task in tasks {
        task()?;
    }
    Ok(())
}

impl fmt::Debug for EntityAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityAdapter")
            .field("entity", &self.entity)
            .field("state", &self.state())
            .field("policy", &self.policy)
            .field("pending_tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casket_store::StoreError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Flusher that counts writes and can be told to fail.
    #[derive(Default)]
    struct Recorder {
        writes: AtomicUsize,
        fail: Mutex<bool>,
    }

    impl Recorder {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl FlushChanges for Recorder {
        fn flush_changes(&self, entity: &mut Entity, _policy: ConflictPolicy) -> CoreResult<()> {
            if *self.fail.lock() {
                return Err(StoreError::unavailable("down").into());
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            entity.version = Some(entity.version.map_or(Version::INITIAL, |v| v.checked_next().unwrap()));
            Ok(())
        }
    }

    fn adapter(recorder: &Arc<Recorder>) -> EntityAdapter {
        EntityAdapter::new(
            Entity::new("r1"),
            Arc::clone(recorder) as Arc<dyn FlushChanges>,
            ConflictPolicy::Strict,
        )
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() -> CoreResult<()> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let task_count = Arc::clone(&count);
        (count, move || {
            task_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn new_adapter_is_clean() {
        let recorder = Arc::new(Recorder::default());
        let adapter = adapter(&recorder);
        assert_eq!(adapter.state(), AdapterState::Clean);
        assert_eq!(adapter.id().as_str(), "r1");
    }

    #[test]
    fn clean_commit_is_noop() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        adapter.commit().unwrap();
        assert_eq!(recorder.writes(), 0);
    }

    #[test]
    fn mutation_marks_dirty() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        adapter.set_scalar("enabled", Some(true)).unwrap();
        assert_eq!(adapter.state(), AdapterState::Dirty);
        assert!(adapter.get_scalar("enabled", false).unwrap());
    }

    #[test]
    fn commit_flushes_once() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        adapter.set_scalar("count", Some(3i32)).unwrap();

        adapter.commit().unwrap();
        adapter.commit().unwrap();

        assert_eq!(recorder.writes(), 1);
        assert_eq!(adapter.state(), AdapterState::Clean);
        assert_eq!(adapter.version(), Some(Version::INITIAL));
    }

    #[test]
    fn tasks_run_once_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            adapter.mark_updated_with(move || {
                order.lock().push(i);
                Ok(())
            });
        }

        adapter.commit().unwrap();
        adapter.mark_updated();
        adapter.commit().unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(adapter.pending_tasks(), 0);
    }

    #[test]
    fn failed_flush_keeps_tasks_and_dirty_flag() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        let (count, task) = counter();
        adapter.mark_updated_with(task);

        *recorder.fail.lock() = true;
        assert!(adapter.commit().is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(adapter.is_updated());
        assert_eq!(adapter.pending_tasks(), 1);

        *recorder.fail.lock() = false;
        adapter.commit().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.writes(), 1);
    }

    #[test]
    fn deleted_adapter_never_flushes() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        let (count, task) = counter();
        adapter.set_scalar("name", Some("a".to_string())).unwrap();
        adapter.mark_updated_with(task);

        adapter.mark_deleted();
        adapter.commit().unwrap();

        assert_eq!(adapter.state(), AdapterState::Deleted);
        assert_eq!(recorder.writes(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn deleted_adapter_rejects_mutation() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        adapter.mark_deleted();

        let err = adapter.set_scalar("enabled", Some(true)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn failing_task_stops_the_rest_but_is_not_rerun() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        let (count, task) = counter();
        adapter.mark_updated_with(|| Err(CoreError::invalid_operation("index cleanup failed")));
        adapter.mark_updated_with(task);

        assert!(adapter.commit().is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!adapter.is_updated());

        adapter.commit().unwrap();
        assert_eq!(recorder.writes(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn structured_set_with_task() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = adapter(&recorder);
        let (count, task) = counter();

        adapter
            .set_structured_with("aliases", &["old", "new"], task)
            .unwrap();
        let aliases: Vec<String> = adapter.get_structured("aliases").unwrap();
        assert_eq!(aliases, ["old", "new"]);

        adapter.commit().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decode_error_surfaces_as_codec() {
        let recorder = Arc::new(Recorder::default());
        let mut entity = Entity::new("r1");
        entity.attributes.replace("enabled", vec!["perhaps".into()]);
        let adapter = EntityAdapter::new(
            entity,
            Arc::clone(&recorder) as Arc<dyn FlushChanges>,
            ConflictPolicy::Strict,
        );

        let err = adapter.get_scalar("enabled", false).unwrap_err();
        assert!(matches!(err, CoreError::Codec(_)));
    }
}
