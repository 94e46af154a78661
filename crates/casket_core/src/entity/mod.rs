//! Entity adapters: the unit-of-work wrapper around one stored row.

mod adapter;

pub(crate) use adapter::run_tasks;
pub use adapter::{AdapterState, EntityAdapter, FlushChanges, PostCommitTask};
