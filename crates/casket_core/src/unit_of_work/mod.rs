//! Per-transaction identity map with deferred, version-checked flushing.
//!
//! A [`UnitOfWork`] guarantees that every id resolves to exactly one
//! [`EntityAdapter`](crate::EntityAdapter) for the lifetime of one host
//! transaction. When the host confirms completion through its
//! [`TransactionBoundary`], every dirty adapter is flushed exactly once.

mod boundary;
mod registry;

pub use boundary::{CompletionHook, LocalTransaction, TransactionBoundary};
pub use registry::{AdapterRef, UnitOfWork, UnitOfWorkState};
