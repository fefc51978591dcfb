//! Values and Empty relations.
//!
//! These relations produce rows from inline data; every pipeline
//! bottoms out in one of them.

use std::sync::Arc;

use quern_core::Value;

use crate::error::{EngineError, EngineResult};
use crate::relation::{Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// Values relation - produces rows from inline data.
#[derive(Debug)]
pub struct Values {
    /// Base relation state.
    base: RelationBase,
    /// The rows to produce.
    rows: Vec<Vec<Value>>,
    /// Current row index.
    current: usize,
}

impl Values {
    /// Creates a new values relation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ArityMismatch`] if any row's length
    /// differs from the schema's column count.
    pub fn new(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> EngineResult<Self> {
        for row in &rows {
            if row.len() != schema.len() {
                return Err(EngineError::ArityMismatch {
                    expected: schema.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { base: RelationBase::new(schema), rows, current: 0 })
    }

    /// Creates a values relation from column names and row data.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] for repeated names or
    /// [`EngineError::ArityMismatch`] for rows of the wrong length.
    pub fn with_columns<S>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
    {
        let schema = Arc::new(Schema::new(columns)?);
        Self::new(schema, rows)
    }
}

impl Relation for Values {
    fn open(&mut self) -> EngineResult<()> {
        self.current = 0;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.current >= self.rows.len() {
            self.base.set_finished();
            return Ok(None);
        }

        let values = self.rows[self.current].clone();
        self.current += 1;
        self.base.inc_rows_produced();

        let row = Row::new(self.base.schema(), values);
        Ok(Some(row))
    }

    fn close(&mut self) -> EngineResult<()> {
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
        "Values"
    }
}

/// Empty relation - produces no rows.
#[derive(Debug)]
pub struct Empty {
    /// Base relation state.
    base: RelationBase,
}

impl Empty {
    /// Creates a new empty relation.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { base: RelationBase::new(schema) }
    }

    /// Creates an empty relation with column names.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] for repeated names.
    pub fn with_columns<S>(columns: Vec<S>) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
    {
        let schema = Arc::new(Schema::new(columns)?);
        Ok(Self::new(schema))
    }
}

impl Relation for Empty {
    fn open(&mut self) -> EngineResult<()> {
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        self.base.set_finished();
        Ok(None)
    }

    fn close(&mut self) -> EngineResult<()> {
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
        "Empty"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn values_basic() {
        let mut rel = Values::with_columns(
            vec!["x", "y"],
            vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3), Value::Int(4)]],
        )
        .unwrap();

        rel.open().unwrap();

        let row1 = rel.next().unwrap().unwrap();
        assert_eq!(row1.values(), &[Value::Int(1), Value::Int(2)]);

        let row2 = rel.next().unwrap().unwrap();
        assert_eq!(row2.values(), &[Value::Int(3), Value::Int(4)]);

        assert!(rel.next().unwrap().is_none());
        rel.close().unwrap();
    }

    #[test]
    fn values_checks_row_arity() {
        let err = Values::with_columns(vec!["x", "y"], vec![vec![Value::Int(1)]]).unwrap_err();
        assert!(matches!(err, EngineError::ArityMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn values_requires_open() {
        let mut rel = Values::with_columns(vec!["x"], vec![vec![Value::Int(1)]]).unwrap();
        assert!(matches!(rel.next(), Err(EngineError::NotOpen { .. })));

        rel.open().unwrap();
        rel.close().unwrap();
        assert!(matches!(rel.next(), Err(EngineError::NotOpen { .. })));
    }

    #[test]
    fn empty_basic() {
        let mut rel = Empty::with_columns(vec!["id"]).unwrap();

        rel.open().unwrap();

        assert!(rel.next().unwrap().is_none());
        assert_eq!(rel.state(), RelationState::Finished);

        rel.close().unwrap();
    }
}
