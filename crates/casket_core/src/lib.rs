//! # Casket Core
//!
//! Optimistic-concurrency unit of work over compare-and-swap row stores.
//!
//! Casket maps a mutable domain model onto rows of the shape
//! `id -> version -> {name: [string]}` in a store that only offers per-row
//! conditional writes. Within one host transaction it provides:
//!
//! - one adapter per entity id, so reads see earlier writes
//! - deferred, at-most-once flushing of dirty entities on completion
//! - lost-update detection through version checks on every write
//! - post-commit tasks that run exactly once after a successful flush
//!
//! There is no multi-entity atomicity. If one adapter fails to flush, the
//! adapters flushed before it stay flushed.
//!
//! ## Quick Start
//!
//! ```rust
//! use casket_core::{Casket, Config, ConflictPolicy};
//! use casket_store::{Entity, EntityId, InMemoryStore};
//! use std::sync::Arc;
//!
//! let casket = Casket::open(
//!     Arc::new(InMemoryStore::new()),
//!     Config::new().conflict_policy(ConflictPolicy::Strict),
//! );
//!
//! casket.transaction(|uow| {
//!     let room = uow.create(Entity::new("r1"))?;
//!     let mut room = room.lock();
//!     room.set_scalar("enabled", Some(true))?;
//!     room.set_structured("aliases", &["lobby"])?;
//!     Ok(())
//! })?;
//!
//! let row = casket.get(&EntityId::from("r1"))?.unwrap();
//! assert_eq!(row.version.map(|v| v.as_u64()), Some(1));
//! # Ok::<(), casket_core::CoreError>(())
//! ```

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod casket;
mod config;
mod entity;
mod error;
mod persist;
mod unit_of_work;

pub use casket::Casket;
pub use config::{Config, ConflictPolicy};
pub use entity::{AdapterState, EntityAdapter, FlushChanges, PostCommitTask};
pub use error::{CoreError, CoreResult, ErrorCategory};
pub use persist::PersistenceEngine;
pub use unit_of_work::{
    AdapterRef, CompletionHook, LocalTransaction, TransactionBoundary, UnitOfWork,
    UnitOfWorkState,
};
