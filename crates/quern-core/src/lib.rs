//! Quern Core
//!
//! This crate provides the value model shared by every layer of the Quern
//! query engine.
//!
//! # Overview
//!
//! The core crate defines the types that flow through relational pipelines:
//!
//! - **Values**: the [`Value`] enum covering null, booleans, integers,
//!   floats, and strings
//! - **Ordering**: [`cmp_values`] gives every pair of values a total order
//!   suitable for sorting and range lookups
//! - **Errors**: [`CoreError`] for type mismatches surfaced during
//!   evaluation
//!
//! # Example
//!
//! ```
//! use quern_core::Value;
//!
//! let name: Value = "Alice".into();
//! let age: Value = 30i64.into();
//! let score: Value = 95.5f64.into();
//!
//! assert_eq!(name.as_str(), Some("Alice"));
//! assert_eq!(age.as_int(), Some(30));
//! assert_eq!(score.as_float(), Some(95.5));
//!
//! // Integers and floats compare numerically
//! assert_eq!(Value::Int(2).as_number(), Some(2.0));
//! ```
//!
//! # Modules
//!
//! - [`types`] - Core data types ([`Value`]) and value ordering
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use types::{cmp_values, Value};
