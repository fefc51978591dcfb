//! Sort relation.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::expr::{cmp_key_values, eval_keys, SortKey};
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// Sort relation - materializes its input and emits rows in key order.
///
/// The sort is stable, so rows whose keys compare equal keep their
/// input order. Key expressions are evaluated once per row before the
/// sort runs, which is also where any expression error surfaces.
pub struct Sort {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// Sort keys in priority order.
    keys: Vec<SortKey>,
    /// Sorted rows, populated on the first `next` call.
    sorted: Option<std::vec::IntoIter<Row>>,
}

impl Sort {
    /// Creates a sort over an input relation.
    pub fn new(input: BoxedRelation, keys: Vec<SortKey>) -> Self {
        let base = RelationBase::new(input.schema());
        Self { base, input, keys, sorted: None }
    }

    /// Drains the input, sorts it, and stores the iterator.
    fn materialize(&mut self) -> EngineResult<()> {
        let mut keyed = Vec::new();
        while let Some(row) = self.input.next()? {
            let key = eval_keys(&self.keys, &row)?;
            keyed.push((key, row));
        }
        keyed.sort_by(|(a, _), (b, _)| cmp_key_values(&self.keys, a, b));
        let rows: Vec<Row> = keyed.into_iter().map(|(_, row)| row).collect();
        self.sorted = Some(rows.into_iter());
        Ok(())
    }
}

impl Relation for Sort {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.sorted = None;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.sorted.is_none() {
            self.materialize()?;
        }
        match self.sorted.as_mut().and_then(Iterator::next) {
            Some(row) => {
                self.base.inc_rows_produced();
                Ok(Some(row))
            }
            None => {
                self.base.set_finished();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> EngineResult<()> {
        self.input.close()?;
        self.sorted = None;
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
        "Sort"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quern_core::Value;

    use super::*;
    use crate::expr::col;
    use crate::relation::collect;
    use crate::relations::Values;

    fn numbers(values: Vec<Value>) -> BoxedRelation {
        let rows = values.into_iter().map(|v| vec![v]).collect();
        Box::new(Values::with_columns(vec!["n"], rows).unwrap())
    }

    #[test]
    fn sorts_ascending_by_default() {
        let rel = Sort::new(
            numbers(vec![Value::Int(3), Value::Int(1), Value::Int(2)]),
            vec![SortKey::asc(col("n"))],
        );
        let rows = collect(rel).unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.value("n").unwrap().clone()).collect();
        assert_eq!(got, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn descending_flips_null_placement() {
        // Reversing the direction also reverses where nulls land, so a
        // descending sort puts them first unless overridden.
        let rel = Sort::new(
            numbers(vec![Value::Null, Value::Int(1), Value::Int(3)]),
            vec![SortKey::desc(col("n"))],
        );
        let rows = collect(rel).unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.value("n").unwrap().clone()).collect();
        assert_eq!(got, vec![Value::Null, Value::Int(3), Value::Int(1)]);

        let rel = Sort::new(
            numbers(vec![Value::Null, Value::Int(1), Value::Int(3)]),
            vec![SortKey::desc(col("n")).with_nulls_first(true)],
        );
        let rows = collect(rel).unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.value("n").unwrap().clone()).collect();
        assert_eq!(got, vec![Value::Int(3), Value::Int(1), Value::Null]);
    }

    #[test]
    fn nulls_first_override() {
        let rel = Sort::new(
            numbers(vec![Value::Int(2), Value::Null, Value::Int(1)]),
            vec![SortKey::asc(col("n")).with_nulls_first(true)],
        );
        let rows = collect(rel).unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.value("n").unwrap().clone()).collect();
        assert_eq!(got, vec![Value::Null, Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn stable_for_equal_keys() {
        let rows = vec![
            vec![Value::Int(1), Value::from("first")],
            vec![Value::Int(0), Value::from("zero")],
            vec![Value::Int(1), Value::from("second")],
        ];
        let input: BoxedRelation =
            Box::new(Values::with_columns(vec!["k", "tag"], rows).unwrap());
        let rel = Sort::new(input, vec![SortKey::asc(col("k"))]);
        let rows = collect(rel).unwrap();
        let tags: Vec<_> =
            rows.iter().map(|r| r.value("tag").unwrap().clone()).collect();
        assert_eq!(
            tags,
            vec![Value::from("zero"), Value::from("first"), Value::from("second")]
        );
    }

    #[test]
    fn key_errors_surface_before_any_row() {
        let mut rel = Sort::new(
            numbers(vec![Value::Int(1)]),
            vec![SortKey::asc(col("missing"))],
        );
        rel.open().unwrap();
        assert!(rel.next().is_err());
        rel.close().unwrap();
    }
}
