//! Set operations: union, intersection, and difference.
//!
//! All three require both inputs to share a shape (same column names in
//! the same order), checked when the relation opens. Rows compare and
//! hash structurally, so the hash tables behind deduplication and
//! counting use [`Row`] keys directly and its cached hash does the
//! heavy lifting.
//!
//! The ALL variants are multiset operations: intersection keeps each
//! row `min(l, r)` times and difference keeps it `max(l - r, 0)` times,
//! where `l` and `r` are the row's occurrence counts on each side.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

fn check_shapes(
    context: &str,
    left: &Schema,
    right: &Schema,
) -> EngineResult<()> {
    if left.same_shape(right) {
        Ok(())
    } else {
        Err(EngineError::ShapeMismatch {
            context: context.to_string(),
            left: left.describe(),
            right: right.describe(),
        })
    }
}

/// Union relation - left rows followed by right rows.
///
/// Without ALL, duplicates are dropped across both inputs: the first
/// occurrence of each distinct row wins.
pub struct Union {
    /// Base relation state.
    base: RelationBase,
    /// Left input.
    left: BoxedRelation,
    /// Right input.
    right: BoxedRelation,
    /// Whether to keep duplicates (UNION ALL).
    all: bool,
    /// Whether the left input is exhausted.
    reading_right: bool,
    /// Rows already emitted, for deduplication. Unused when `all`.
    seen: HashSet<Row>,
}

impl Union {
    /// Creates a union of two same-shaped relations.
    #[must_use]
    pub fn new(left: BoxedRelation, right: BoxedRelation, all: bool) -> Self {
        let base = RelationBase::new(left.schema());
        Self { base, left, right, all, reading_right: false, seen: HashSet::new() }
    }
}

impl Relation for Union {
    fn open(&mut self) -> EngineResult<()> {
        self.left.open()?;
        self.right.open()?;
        check_shapes("union", &self.left.schema(), &self.right.schema())?;
        self.reading_right = false;
        self.seen.clear();
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        loop {
            let pulled = if self.reading_right {
                self.right.next()?
            } else {
                self.left.next()?
            };
            match pulled {
                Some(row) => {
                    if self.all || self.seen.insert(row.clone()) {
                        self.base.inc_rows_produced();
                        return Ok(Some(row));
                    }
                }
                None => {
                    if self.reading_right {
                        self.base.set_finished();
                        return Ok(None);
                    }
                    self.reading_right = true;
                }
            }
        }
    }

    fn close(&mut self) -> EngineResult<()> {
        self.left.close()?;
        self.right.close()?;
        self.seen.clear();
        self.base.set_closed();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> RelationState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Union"
    }
}

/// Which binary set operation a [`SetOp`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetOpKind {
    Intersect,
    Difference,
}

/// Intersection and difference relation.
///
/// The right input is counted into a hash table on the first `next`
/// call; the left input then streams through it, so output order is
/// left input order.
pub struct SetOp {
    /// Base relation state.
    base: RelationBase,
    /// The operation to perform.
    kind: SetOpKind,
    /// Whether to use multiset (ALL) semantics.
    all: bool,
    /// Left (streamed) input.
    left: BoxedRelation,
    /// Right (counted) input.
    right: BoxedRelation,
    /// Occurrence counts of right rows.
    right_counts: HashMap<Row, usize>,
    /// Left rows already emitted. Unused when `all`.
    seen: HashSet<Row>,
    /// Whether the right side has been counted.
    counted: bool,
}

impl SetOp {
    fn new(kind: SetOpKind, all: bool, left: BoxedRelation, right: BoxedRelation) -> Self {
        let base = RelationBase::new(left.schema());
        Self {
            base,
            kind,
            all,
            left,
            right,
            right_counts: HashMap::new(),
            seen: HashSet::new(),
            counted: false,
        }
    }

    /// Creates a distinct intersection: rows present on both sides,
    /// once each.
    #[must_use]
    pub fn intersect(left: BoxedRelation, right: BoxedRelation) -> Self {
        Self::new(SetOpKind::Intersect, false, left, right)
    }

    /// Creates a multiset intersection: each row `min(l, r)` times.
    #[must_use]
    pub fn intersect_all(left: BoxedRelation, right: BoxedRelation) -> Self {
        Self::new(SetOpKind::Intersect, true, left, right)
    }

    /// Creates a distinct difference: left rows absent from the right,
    /// once each.
    #[must_use]
    pub fn difference(left: BoxedRelation, right: BoxedRelation) -> Self {
        Self::new(SetOpKind::Difference, false, left, right)
    }

    /// Creates a multiset difference: each row `max(l - r, 0)` times.
    #[must_use]
    pub fn difference_all(left: BoxedRelation, right: BoxedRelation) -> Self {
        Self::new(SetOpKind::Difference, true, left, right)
    }

    fn count_right(&mut self) -> EngineResult<()> {
        while let Some(row) = self.right.next()? {
            *self.right_counts.entry(row).or_insert(0) += 1;
        }
        self.counted = true;
        Ok(())
    }

    /// Decides whether a left row is emitted, consuming right counts
    /// for the ALL variants.
    fn keep(&mut self, row: &Row) -> bool {
        match (self.kind, self.all) {
            (SetOpKind::Intersect, true) => match self.right_counts.get_mut(row) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    true
                }
                _ => false,
            },
            (SetOpKind::Intersect, false) => {
                self.right_counts.contains_key(row) && self.seen.insert(row.clone())
            }
            (SetOpKind::Difference, true) => match self.right_counts.get_mut(row) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            },
            (SetOpKind::Difference, false) => {
                !self.right_counts.contains_key(row) && self.seen.insert(row.clone())
            }
        }
    }
}

impl Relation for SetOp {
    fn open(&mut self) -> EngineResult<()> {
        self.left.open()?;
        self.right.open()?;
        let context = match self.kind {
            SetOpKind::Intersect => "intersect",
            SetOpKind::Difference => "difference",
        };
        check_shapes(context, &self.left.schema(), &self.right.schema())?;
        self.right_counts.clear();
        self.seen.clear();
        self.counted = false;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if !self.counted {
            self.count_right()?;
        }
        loop {
            match self.left.next()? {
                Some(row) => {
                    if self.keep(&row) {
                        self.base.inc_rows_produced();
                        return Ok(Some(row));
                    }
                }
                None => {
                    self.base.set_finished();
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) -> EngineResult<()> {
        self.left.close()?;
        self.right.close()?;
        self.right_counts.clear();
        self.seen.clear();
        self.base.set_closed();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> RelationState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        match self.kind {
            SetOpKind::Intersect => "Intersect",
            SetOpKind::Difference => "Difference",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quern_core::Value;

    use super::*;
    use crate::relation::collect;
    use crate::relations::Values;

    fn ints(values: &[i64]) -> BoxedRelation {
        let rows = values.iter().map(|&n| vec![Value::Int(n)]).collect();
        Box::new(Values::with_columns(vec!["x"], rows).unwrap())
    }

    fn to_ints(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .map(|r| r.value("x").unwrap().as_int().unwrap())
            .collect()
    }

    #[test]
    fn union_all_keeps_duplicates_in_order() {
        let rows = collect(Union::new(ints(&[1, 2, 1]), ints(&[2, 3]), true)).unwrap();
        assert_eq!(to_ints(&rows), vec![1, 2, 1, 2, 3]);
    }

    #[test]
    fn union_deduplicates_first_wins() {
        let rows = collect(Union::new(ints(&[1, 2, 1]), ints(&[2, 3]), false)).unwrap();
        assert_eq!(to_ints(&rows), vec![1, 2, 3]);
    }

    #[test]
    fn intersect_distinct() {
        let rows = collect(SetOp::intersect(ints(&[1, 2, 2, 3]), ints(&[2, 3, 4]))).unwrap();
        assert_eq!(to_ints(&rows), vec![2, 3]);
    }

    #[test]
    fn intersect_all_keeps_min_counts() {
        let rows =
            collect(SetOp::intersect_all(ints(&[1, 1, 1, 2]), ints(&[1, 1, 3]))).unwrap();
        assert_eq!(to_ints(&rows), vec![1, 1]);
    }

    #[test]
    fn difference_distinct() {
        let rows = collect(SetOp::difference(ints(&[1, 2, 3, 1]), ints(&[2, 4]))).unwrap();
        assert_eq!(to_ints(&rows), vec![1, 3]);
    }

    #[test]
    fn difference_all_subtracts_counts() {
        let rows =
            collect(SetOp::difference_all(ints(&[1, 1, 1, 2]), ints(&[1, 2]))).unwrap();
        assert_eq!(to_ints(&rows), vec![1, 1]);
    }

    #[test]
    fn shape_mismatch_reported_at_open() {
        let left = ints(&[1]);
        let right: BoxedRelation =
            Box::new(Values::with_columns(vec!["y"], vec![vec![Value::Int(1)]]).unwrap());
        let mut rel = Union::new(left, right, true);
        let err = rel.open().unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch { .. }));
    }

    #[test]
    fn int_and_float_rows_are_distinct() {
        let left: BoxedRelation = Box::new(
            Values::with_columns(vec!["x"], vec![vec![Value::Int(1)]]).unwrap(),
        );
        let right: BoxedRelation = Box::new(
            Values::with_columns(vec!["x"], vec![vec![Value::Float(1.0)]]).unwrap(),
        );
        // Structural equality does not coerce across numeric types
        let rows = collect(SetOp::intersect(left, right)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn nan_rows_intersect_with_themselves() {
        let rows = collect(SetOp::intersect(
            Box::new(
                Values::with_columns(vec!["x"], vec![vec![Value::Float(f64::NAN)]]).unwrap(),
            ),
            Box::new(
                Values::with_columns(vec!["x"], vec![vec![Value::Float(f64::NAN)]]).unwrap(),
            ),
        ))
        .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
