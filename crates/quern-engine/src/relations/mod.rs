//! Concrete relation implementations.
//!
//! This module contains the implementations of all pipeline relations.
//!
//! # Relation Categories
//!
//! - **Leaf relations**: [`values`] - Inline rows and the empty relation
//! - **Filter relations**: [`filter`] - Predicate evaluation
//! - **Project relations**: [`project`] - Column selection and mutation
//! - **Join relations**: [`join`] - Cross, inner, and outer joins
//! - **Aggregate relations**: [`aggregate`] - Grouped and scalar aggregation
//! - **Sort relations**: [`sort`] - Sorting
//! - **Limit relations**: [`limit`] - Limit/offset
//! - **Set relations**: [`set_ops`] - Union, intersection, difference
//! - **Window relations**: [`window`] - Windowed aggregation
//!
//! [`RelationExt`] chains these into pipelines without naming the
//! structs directly.

pub mod aggregate;
pub mod filter;
pub mod join;
pub mod limit;
pub mod project;
pub mod set_ops;
pub mod sort;
pub mod values;
pub mod window;

// Re-exports for convenience
pub use aggregate::{GroupBy, Grouped};
pub use filter::Filter;
pub use join::{JoinKind, NestedLoopJoin};
pub use limit::Limit;
pub use project::{Mutate, Select};
pub use set_ops::{SetOp, Union};
pub use sort::Sort;
pub use values::{Empty, Values};
pub use window::Window;

use std::sync::Arc;

use quern_core::Value;

use crate::aggregate::AggregateExpr;
use crate::error::EngineResult;
use crate::expr::{JoinPredicate, KeyFn, Predicate, SortKey};
use crate::relation::{Relation, Rows};
use crate::window::WindowDef;

/// Encodes a key tuple into bytes for hash-based grouping and
/// partitioning.
///
/// The encoding agrees with structural equality on values: two tuples
/// produce the same bytes exactly when their values are pairwise
/// structurally equal. Type tags keep `Int(1)` apart from `Float(1.0)`,
/// every `NaN` encodes to one bit pattern, `-0.0` encodes as `0.0`, and
/// strings are length-prefixed so adjacent keys cannot run together.
pub(crate) fn encode_key(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Null => out.push(0),
            Value::Bool(b) => {
                out.push(1);
                out.push(u8::from(*b));
            }
            Value::Int(i) => {
                out.push(2);
                out.extend_from_slice(&i.to_be_bytes());
            }
            Value::Float(f) => {
                out.push(3);
                let bits = if f.is_nan() {
                    f64::NAN.to_bits()
                } else if *f == 0.0 {
                    0.0_f64.to_bits()
                } else {
                    f.to_bits()
                };
                out.extend_from_slice(&bits.to_be_bytes());
            }
            Value::String(s) => {
                out.push(4);
                out.extend_from_slice(&(s.len() as u64).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
    out
}

/// Fluent pipeline construction over any relation.
///
/// Every method boxes `self` and wraps it in the next relation, so
/// pipelines read top to bottom in evaluation order:
///
/// ```
/// use quern_core::Value;
/// use quern_engine::expr::{col, SortKey};
/// use quern_engine::relation::collect;
/// use quern_engine::relations::{RelationExt, Values};
///
/// # fn main() -> Result<(), quern_engine::error::EngineError> {
/// let people = Values::with_columns(
///     vec!["name", "age"],
///     vec![
///         vec![Value::from("Ada"), Value::Int(36)],
///         vec![Value::from("Grace"), Value::Int(45)],
///         vec![Value::from("Alan"), Value::Int(41)],
///     ],
/// )?;
///
/// let adults = people
///     .filter(Box::new(|row| Ok(row.value("age")?.as_int().unwrap_or(0) >= 40)))
///     .order_by(vec![SortKey::asc(col("name"))])
///     .limit(10);
///
/// let rows = collect(adults)?;
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].value("name")?, &Value::from("Alan"));
/// # Ok(())
/// # }
/// ```
///
/// Construction is lazy throughout: nothing evaluates until the
/// pipeline is opened and pulled, via [`collect`](crate::relation::collect)
/// or [`RelationExt::rows`].
pub trait RelationExt: Relation + Sized + 'static {
    /// Keeps only rows for which the predicate returns `true`.
    fn filter(self, predicate: Predicate) -> Filter {
        Filter::new(predicate, Box::new(self))
    }

    /// Projects each row to the named expressions, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] for repeated output
    /// names.
    ///
    /// [`EngineError::DuplicateColumn`]: crate::error::EngineError::DuplicateColumn
    fn select<S>(self, columns: Vec<(S, KeyFn)>) -> EngineResult<Select>
    where
        S: Into<Arc<str>>,
    {
        Select::new(Box::new(self), columns)
    }

    /// Replaces or appends columns computed from each row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if one mutation name is
    /// given twice or collides with an ambiguous join column.
    ///
    /// [`EngineError::DuplicateColumn`]: crate::error::EngineError::DuplicateColumn
    fn mutate<S>(self, columns: Vec<(S, KeyFn)>) -> EngineResult<Mutate>
    where
        S: Into<Arc<str>>,
    {
        Mutate::new(Box::new(self), columns)
    }

    /// Sorts rows by the given keys. Stable: rows with equal keys keep
    /// their input order.
    fn order_by(self, keys: Vec<SortKey>) -> Sort {
        Sort::new(Box::new(self), keys)
    }

    /// Passes through at most `limit` rows.
    fn limit(self, limit: usize) -> Limit {
        Limit::limit(Box::new(self), limit)
    }

    /// Skips the first `offset` rows.
    fn offset(self, offset: usize) -> Limit {
        Limit::offset(Box::new(self), offset)
    }

    /// Pairs every row with every row of `right`.
    fn cross_join<R: Relation + 'static>(self, right: R) -> NestedLoopJoin {
        NestedLoopJoin::cross(Box::new(self), Box::new(right))
    }

    /// Emits the row pairs for which `on` holds.
    fn inner_join<R: Relation + 'static>(self, right: R, on: JoinPredicate) -> NestedLoopJoin {
        NestedLoopJoin::inner(Box::new(self), Box::new(right), on)
    }

    /// Inner join plus unmatched left rows padded with nulls.
    fn left_join<R: Relation + 'static>(self, right: R, on: JoinPredicate) -> NestedLoopJoin {
        NestedLoopJoin::left_outer(Box::new(self), Box::new(right), on)
    }

    /// Inner join plus unmatched right rows padded with nulls.
    fn right_join<R: Relation + 'static>(self, right: R, on: JoinPredicate) -> NestedLoopJoin {
        NestedLoopJoin::right_outer(Box::new(self), Box::new(right), on)
    }

    /// All rows from both inputs with duplicates removed.
    fn union<R: Relation + 'static>(self, right: R) -> Union {
        Union::new(Box::new(self), Box::new(right), false)
    }

    /// All rows from both inputs, duplicates kept.
    fn union_all<R: Relation + 'static>(self, right: R) -> Union {
        Union::new(Box::new(self), Box::new(right), true)
    }

    /// Distinct rows present in both inputs.
    fn intersect<R: Relation + 'static>(self, right: R) -> SetOp {
        SetOp::intersect(Box::new(self), Box::new(right))
    }

    /// Rows present in both inputs, keeping the smaller multiplicity.
    fn intersect_all<R: Relation + 'static>(self, right: R) -> SetOp {
        SetOp::intersect_all(Box::new(self), Box::new(right))
    }

    /// Distinct rows of this input absent from `right`.
    fn difference<R: Relation + 'static>(self, right: R) -> SetOp {
        SetOp::difference(Box::new(self), Box::new(right))
    }

    /// Rows of this input with `right`'s multiplicities subtracted.
    fn difference_all<R: Relation + 'static>(self, right: R) -> SetOp {
        SetOp::difference_all(Box::new(self), Box::new(right))
    }

    /// Starts a grouped aggregation keyed by the named expressions;
    /// finish it with [`Grouped::aggregate`].
    fn group_by<S>(self, keys: Vec<(S, KeyFn)>) -> Grouped
    where
        S: Into<Arc<str>>,
    {
        Grouped::new(Box::new(self), keys)
    }

    /// Aggregates the whole input to a single row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAggregate`] for window-only
    /// aggregates and [`EngineError::DuplicateColumn`] for repeated
    /// output names.
    ///
    /// [`EngineError::InvalidAggregate`]: crate::error::EngineError::InvalidAggregate
    /// [`EngineError::DuplicateColumn`]: crate::error::EngineError::DuplicateColumn
    fn aggregate<S>(self, aggs: Vec<(S, AggregateExpr)>) -> EngineResult<GroupBy>
    where
        S: Into<Arc<str>>,
    {
        GroupBy::new(Box::new(self), Vec::<(Arc<str>, KeyFn)>::new(), aggs)
    }

    /// Appends windowed aggregate columns to every row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] for output-name
    /// collisions, [`EngineError::InvalidFrame`] for a malformed frame,
    /// or [`EngineError::InvalidWindow`] for range framing without a
    /// single ascending order key.
    ///
    /// [`EngineError::DuplicateColumn`]: crate::error::EngineError::DuplicateColumn
    /// [`EngineError::InvalidFrame`]: crate::error::EngineError::InvalidFrame
    /// [`EngineError::InvalidWindow`]: crate::error::EngineError::InvalidWindow
    fn window<S>(self, def: WindowDef, exprs: Vec<(S, AggregateExpr)>) -> EngineResult<Window>
    where
        S: Into<Arc<str>>,
    {
        Window::new(Box::new(self), def, exprs)
    }

    /// Adapts the relation into an iterator of row results.
    fn rows(self) -> Rows<Self> {
        Rows::new(self)
    }
}

impl<R: Relation + Sized + 'static> RelationExt for R {}
