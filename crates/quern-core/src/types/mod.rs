//! Core data types for Quern.
//!
//! This module defines the value model that rows carry through relational
//! pipelines, together with the total ordering used for sorting and
//! range lookups.

mod value;

pub use value::{cmp_values, Value};
