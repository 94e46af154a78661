//! # Casket Testkit
//!
//! Test utilities for Casket.
//!
//! This crate provides:
//! - Test fixtures: temporary caskets and seeded stores
//! - Misbehaving stores that inject concurrent writers or outages
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use casket_testkit::prelude::*;
//! use casket_store::{Entity, EntityId};
//!
//! with_temp_casket(|casket| {
//!     casket
//!         .transaction(|uow| uow.create(Entity::new("r1")).map(drop))
//!         .unwrap();
//!     assert!(casket.get(&EntityId::from("r1")).unwrap().is_some());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
