//! # Casket Codec
//!
//! Typed attribute encoding for Casket.
//!
//! Every entity attribute is stored in one uniform shape: a name mapped to
//! an ordered list of strings. This crate maps typed domain values onto that
//! shape and back:
//!
//! - Scalars (`bool`, `i32`, `i64`, `String`) become a single canonical-text
//!   element
//! - A single structured value becomes one canonical JSON element
//! - A structured collection becomes one canonical JSON element per item
//! - An absent attribute reads as "no value" or an empty list, never an error
//!
//! ## Canonical Rules
//!
//! - Integers are plain decimal text, no locale formatting
//! - Booleans are the literal tokens `true` and `false`
//! - JSON object keys are emitted sorted, so equal values encode identically
//!
//! ## Usage
//!
//! ```
//! use casket_codec::Attributes;
//!
//! let mut attrs = Attributes::new();
//! attrs.set_scalar("enabled", Some(true));
//! attrs.set_structured("aliases", &["ops", "admin"]).unwrap();
//!
//! assert!(attrs.get_scalar("enabled", false).unwrap());
//! let aliases: Vec<String> = attrs.get_structured("aliases").unwrap();
//! assert_eq!(aliases, ["ops", "admin"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attributes;
mod error;
mod json;
mod kind;
mod scalar;

pub use attributes::Attributes;
pub use error::{CodecError, CodecResult};
pub use kind::{AttributeKind, AttributeValue};
pub use scalar::Scalar;
