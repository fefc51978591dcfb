//! Filter relation.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::expr::Predicate;
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// Filter relation - passes through rows matching a predicate.
///
/// Rows are pulled from the input one at a time and dropped unless the
/// predicate returns `true`; predicate errors stop the pipeline at the
/// offending row.
pub struct Filter {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// The predicate to apply.
    predicate: Predicate,
}

impl Filter {
    /// Creates a new filter over an input relation.
    #[must_use]
    pub fn new(predicate: Predicate, input: BoxedRelation) -> Self {
        let base = RelationBase::new(input.schema());
        Self { base, input, predicate }
    }
}

impl Relation for Filter {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        loop {
            match self.input.next()? {
                Some(row) => {
                    if (self.predicate)(&row)? {
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
        self.input.close()?;
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
        "Filter"
    }
}
