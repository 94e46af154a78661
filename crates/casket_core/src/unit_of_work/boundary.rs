//! Host transaction boundary.

use crate::error::CoreResult;
use parking_lot::Mutex;
use std::fmt;
use tracing::debug;

/// Callback run once after the host transaction completes.
pub type CompletionHook = Box<dyn FnOnce() -> CoreResult<()> + Send>;

/// The host's notion of a logical transaction.
///
/// A unit of work registers exactly one hook. The boundary must run it at
/// most once, and only after the business logic finished successfully.
pub trait TransactionBoundary: Send + Sync {
    /// Registers a hook to run after successful completion.
    fn enlist_after_completion(&self, hook: CompletionHook);
}

/// A boundary driven explicitly by the caller.
///
/// Used by [`crate::Casket::transaction`] and by hosts with no transaction
/// manager of their own.
#[derive(Default)]
pub struct LocalTransaction {
    hooks: Mutex<Vec<CompletionHook>>,
}

impl LocalTransaction {
    /// Creates a boundary with no enlisted hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of hooks waiting for completion.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Marks the transaction complete and runs every hook.
    ///
    /// Hooks run in enlistment order. A failing hook does not prevent the
    /// others from running; the first error is returned.
    pub fn complete(&self) -> CoreResult<()> {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        debug!(hooks = hooks.len(), "transaction complete");

        let mut first_error = None;
        for hook in hooks {
            if let Err(e) = hook() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Discards every hook without running it.
    pub fn rollback(&self) {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        debug!(hooks = hooks.len(), "transaction rolled back");
    }
}

impl TransactionBoundary for LocalTransaction {
    fn enlist_after_completion(&self, hook: CompletionHook) {
        self.hooks.lock().push(hook);
    }
}

impl fmt::Debug for LocalTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransaction")
            .field("hooks", &self.hook_count())
            .finish()
    }
}
