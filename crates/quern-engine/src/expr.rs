//! Row expressions: closures that compute values from rows.
//!
//! Relations take expressions as boxed closures rather than an AST. A
//! [`KeyFn`] computes one value from a row, a [`Predicate`] computes a
//! boolean, and a [`JoinPredicate`] sees the candidate rows from both
//! join inputs. All of them return [`EngineResult`] so lookups against
//! missing or ambiguous columns surface as errors at the row where they
//! happen, not as silent nulls.

use std::cmp::Ordering;

use quern_core::{cmp_values, Value};

use crate::error::EngineResult;
use crate::row::Row;

/// Computes one value from a row. Used for projections, grouping keys,
/// sort keys, and aggregate inputs.
pub type KeyFn = Box<dyn Fn(&Row) -> EngineResult<Value> + Send>;

/// Decides whether a row passes a filter.
pub type Predicate = Box<dyn Fn(&Row) -> EngineResult<bool> + Send>;

/// Decides whether a pair of rows from two join inputs matches.
pub type JoinPredicate = Box<dyn Fn(&Row, &Row) -> EngineResult<bool> + Send>;

/// Reads a named column from the row.
///
/// Fails at evaluation time if the column is missing, or ambiguous
/// because a join duplicated the name.
pub fn col(name: impl Into<String>) -> KeyFn {
    let name = name.into();
    Box::new(move |row| row.value(&name).cloned())
}

/// Produces a constant value regardless of the row.
pub fn lit(value: impl Into<Value>) -> KeyFn {
    let value = value.into();
    Box::new(move |_| Ok(value.clone()))
}

/// Reads a named column from the left side of a joined row.
pub fn left(name: impl Into<String>) -> KeyFn {
    let name = name.into();
    Box::new(move |row| row.left(&name).cloned())
}

/// Reads a named column from the right side of a joined row.
pub fn right(name: impl Into<String>) -> KeyFn {
    let name = name.into();
    Box::new(move |row| row.right(&name).cloned())
}

/// One sort criterion: a key expression plus direction and null placement.
pub struct SortKey {
    /// Computes the key value for a row.
    pub key: KeyFn,
    /// Sort descending instead of ascending.
    pub descending: bool,
    /// Where nulls sort relative to ascending order. `None` means nulls
    /// last; `descending` flips the placement along with everything else.
    pub nulls_first: Option<bool>,
}

impl SortKey {
    /// Ascending sort on a key.
    #[must_use]
    pub fn asc(key: KeyFn) -> Self {
        Self { key, descending: false, nulls_first: None }
    }

    /// Descending sort on a key.
    #[must_use]
    pub fn desc(key: KeyFn) -> Self {
        Self { key, descending: true, nulls_first: None }
    }

    /// Overrides null placement for this key.
    #[must_use]
    pub fn with_nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = Some(nulls_first);
        self
    }
}

impl std::fmt::Debug for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortKey")
            .field("descending", &self.descending)
            .field("nulls_first", &self.nulls_first)
            .finish_non_exhaustive()
    }
}

/// Evaluates every sort key against a row, yielding the key tuple.
pub(crate) fn eval_keys(keys: &[SortKey], row: &Row) -> EngineResult<Vec<Value>> {
    keys.iter().map(|key| (key.key)(row)).collect()
}

/// Compares two precomputed key tuples under the keys' directions.
///
/// Keys are evaluated up front so expression errors surface before the
/// sort begins; comparators cannot propagate errors.
pub(crate) fn cmp_key_values(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for (key, (va, vb)) in keys.iter().zip(a.iter().zip(b)) {
        let ord = cmp_one(key, va, vb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn cmp_one(key: &SortKey, a: &Value, b: &Value) -> Ordering {
    let nulls_first = key.nulls_first.unwrap_or(false);
    let ord = match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => cmp_values(a, b),
    };
    if key.descending {
        ord.reverse()
    } else {
        ord
    }
}
