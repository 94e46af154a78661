//! # Casket Store
//!
//! Backing store contract and row store implementations for Casket.
//!
//! This crate provides the lowest-level persistence abstraction. A store
//! holds rows of the shape `{id, version, attributes}` and offers only
//! per-row conditional writes. It never interprets attribute values.
//!
//! ## Design Principles
//!
//! - Every write is conditional: insert-if-absent, update-if-version-equals,
//!   delete-if-exists
//! - A conditional write that does not apply is a normal result, not an error
//! - Stores must be `Send + Sync`; all units of work share one store
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral storage
//! - [`FileStore`] - A JSON document on disk, rewritten atomically
//!
//! ## Example
//!
//! ```rust
//! use casket_store::{BackingStore, Entity, InMemoryStore, UpdateOutcome, Version};
//!
//! let store = InMemoryStore::new();
//! let mut row = Entity::new("r1");
//! row.version = Some(Version::INITIAL);
//! store.insert_if_absent(&row).unwrap();
//!
//! row.version = Some(Version::new(2));
//! let outcome = store.update_if_version_equals(&row, Version::INITIAL).unwrap();
//! assert_eq!(outcome, UpdateOutcome::Applied);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod entity;
mod error;
mod file;
mod memory;
mod table;
mod types;

pub use backend::{BackingStore, UpdateOutcome};
pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use types::{EntityId, Version};
