//! Quern Engine
//!
//! This crate provides the relational query engine for Quern: lazy,
//! composable, pull-based pipelines over in-memory rows, with grouped
//! and windowed aggregation.
//!
//! # Overview
//!
//! The engine consists of several layers:
//!
//! - **Rows**: schemas and immutable, structurally hashed rows
//! - **Expressions**: closures computing values and predicates from rows
//! - **Relations**: pipeline stages evaluated lazily, one row at a time
//! - **Aggregates**: the aggregate protocol and the built-in functions
//! - **Windows**: per-row aggregation over partitioned, ordered frames
//!
//! # Modules
//!
//! - [`row`] - Schemas and rows
//! - [`expr`] - Row expressions and sort keys
//! - [`relation`] - The [`Relation`] trait and pipeline drivers
//! - [`relations`] - Concrete relation implementations
//! - [`aggregate`] - Aggregate protocol and built-ins
//! - [`window`] - Window definitions and framing
//! - [`error`] - Error types for construction and evaluation
//!
//! # Quick Start
//!
//! Group and aggregate a pipeline:
//!
//! ```
//! use quern_core::Value;
//! use quern_engine::aggregate::sum;
//! use quern_engine::expr::col;
//! use quern_engine::relation::collect;
//! use quern_engine::relations::{RelationExt, Values};
//!
//! let sales = Values::with_columns(
//!     vec!["region", "amount"],
//!     vec![
//!         vec![Value::from("north"), Value::Int(120)],
//!         vec![Value::from("south"), Value::Int(80)],
//!         vec![Value::from("north"), Value::Int(200)],
//!     ],
//! )
//! .unwrap();
//!
//! let totals = sales
//!     .group_by(vec![("region", col("region"))])
//!     .aggregate(vec![("total", sum(col("amount")))])
//!     .unwrap();
//!
//! let rows = collect(totals).unwrap();
//! assert_eq!(rows[0].value("total").unwrap(), &Value::Int(320));
//! ```
//!
//! Windowed aggregation appends per-row aggregate columns:
//!
//! ```
//! use quern_core::Value;
//! use quern_engine::aggregate::sum;
//! use quern_engine::expr::{col, SortKey};
//! use quern_engine::relation::collect;
//! use quern_engine::relations::{RelationExt, Values};
//! use quern_engine::window::WindowDef;
//!
//! let ticks = Values::with_columns(
//!     vec!["t", "price"],
//!     vec![
//!         vec![Value::Int(1), Value::Int(10)],
//!         vec![Value::Int(2), Value::Int(12)],
//!         vec![Value::Int(3), Value::Int(11)],
//!     ],
//! )
//! .unwrap();
//!
//! let def = WindowDef::new().order_by(vec![SortKey::asc(col("t"))]);
//! let windowed = ticks.window(def, vec![("running", sum(col("price")))]).unwrap();
//!
//! let rows = collect(windowed).unwrap();
//! let running: Vec<&Value> =
//!     rows.iter().map(|row| row.value("running").unwrap()).collect();
//! assert_eq!(running, vec![&Value::Int(10), &Value::Int(22), &Value::Int(33)]);
//! ```

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod aggregate;
pub mod error;
pub mod expr;
pub mod relation;
pub mod relations;
pub mod row;
pub mod window;

// Re-export commonly used items at the crate root
pub use error::{EngineError, EngineResult};
pub use relation::{collect, BoxedRelation, Relation, RelationState, Rows};
pub use relations::RelationExt;
pub use row::{Row, Schema};

// The value model comes from quern-core; re-exported so embedders can
// depend on this crate alone.
pub use quern_core::{cmp_values, CoreError, Value};
