//! Limit relation.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// Limit relation - skips `offset` rows, then emits at most `limit`.
///
/// Either part may be absent: a bare offset skips and passes the rest
/// through, a bare limit truncates from the first row.
pub struct Limit {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// Maximum number of rows to emit, unbounded if `None`.
    limit: Option<usize>,
    /// Number of leading rows to skip.
    offset: usize,
    /// Rows skipped so far.
    skipped: usize,
    /// Rows emitted so far.
    returned: usize,
}

impl Limit {
    /// Creates a relation with both an offset and a limit.
    pub fn new(input: BoxedRelation, offset: usize, limit: Option<usize>) -> Self {
        let base = RelationBase::new(input.schema());
        Self { base, input, limit, offset, skipped: 0, returned: 0 }
    }

    /// Creates a limit-only relation.
    pub fn limit(input: BoxedRelation, limit: usize) -> Self {
        Self::new(input, 0, Some(limit))
    }

    /// Creates an offset-only relation.
    pub fn offset(input: BoxedRelation, offset: usize) -> Self {
        Self::new(input, offset, None)
    }
}

impl Relation for Limit {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.skipped = 0;
        self.returned = 0;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;

        if self.limit.is_some_and(|limit| self.returned >= limit) {
            self.base.set_finished();
            return Ok(None);
        }

        while self.skipped < self.offset {
            match self.input.next()? {
                Some(_) => self.skipped += 1,
                None => {
                    self.base.set_finished();
                    return Ok(None);
                }
            }
        }

        match self.input.next()? {
            Some(row) => {
                self.returned += 1;
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
        "Limit"
    }
}
