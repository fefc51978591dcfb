//! Relation trait and base types.
//!
//! This module defines the [`Relation`] trait that all pipeline
//! relations implement, plus the [`collect`] driver and the [`Rows`]
//! iterator adapter for pulling results.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::row::{Row, Schema};

/// The state of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationState {
    /// Relation has not been opened yet.
    Created,
    /// Relation is open and ready to produce rows.
    Open,
    /// Relation has finished producing rows.
    Finished,
    /// Relation has been closed.
    Closed,
}

impl RelationState {
    /// Returns true if the relation is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the relation has finished.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if the relation is closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns the state name for error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Open => "open",
            Self::Finished => "finished",
            Self::Closed => "closed",
        }
    }
}

/// The relation trait for pull-based pipeline evaluation.
///
/// Relations form a tree: data flows from leaves (in-memory values) up
/// through intermediate relations (filter, project, join) to the root,
/// one row at a time. Evaluation is lazy; nothing runs until rows are
/// pulled, and relations that do not need their whole input make a
/// single pass over it.
///
/// # Lifecycle
///
/// 1. **Created**: Initial state after construction
/// 2. **Open**: After `open()` is called; ready to produce rows
/// 3. **Finished**: After `next()` returns `None`; no more rows
/// 4. **Closed**: After `close()` is called; resources released
///
/// Pulling from a relation that was never opened, or already closed,
/// is reported as [`EngineError::NotOpen`].
///
/// # Thread Safety
///
/// The `Send` bound allows relations to be passed between threads, but
/// relations are not required to be `Sync` - they maintain mutable
/// internal state and are evaluated single-threaded.
pub trait Relation: Send {
    /// Opens the relation and prepares it to produce rows.
    ///
    /// This method recursively opens any child relations.
    fn open(&mut self) -> EngineResult<()>;

    /// Returns the next row, or `None` if there are no more rows.
    ///
    /// This method should be called repeatedly until it returns `None`.
    fn next(&mut self) -> EngineResult<Option<Row>>;

    /// Closes the relation and releases resources.
    ///
    /// This method recursively closes any child relations.
    fn close(&mut self) -> EngineResult<()>;

    /// Returns the output schema of this relation.
    fn schema(&self) -> Arc<Schema>;

    /// Returns the current state of this relation.
    fn state(&self) -> RelationState;

    /// Returns the name of this relation type.
    fn name(&self) -> &'static str;
}

/// A boxed relation for dynamic dispatch.
pub type BoxedRelation = Box<dyn Relation>;

impl<R: Relation + ?Sized> Relation for Box<R> {
    fn open(&mut self) -> EngineResult<()> {
        (**self).open()
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        (**self).next()
    }

    fn close(&mut self) -> EngineResult<()> {
        (**self).close()
    }

    fn schema(&self) -> Arc<Schema> {
        (**self).schema()
    }

    fn state(&self) -> RelationState {
        (**self).state()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Base implementation for relations.
///
/// This struct provides common functionality that relations can use.
#[derive(Debug)]
pub struct RelationBase {
    /// The output schema.
    schema: Arc<Schema>,
    /// The current state.
    state: RelationState,
    /// Number of rows produced.
    rows_produced: u64,
}

impl RelationBase {
    /// Creates a new relation base with the given schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema, state: RelationState::Created, rows_produced: 0 }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> RelationState {
        self.state
    }

    /// Fails unless the relation has been opened and not yet closed.
    pub fn ensure_open(&self, name: &'static str) -> EngineResult<()> {
        match self.state {
            RelationState::Open | RelationState::Finished => Ok(()),
            state => Err(EngineError::NotOpen { name, state: state.describe() }),
        }
    }

    /// Sets the state to open.
    pub fn set_open(&mut self) {
        self.state = RelationState::Open;
    }

    /// Sets the state to finished.
    pub fn set_finished(&mut self) {
        self.state = RelationState::Finished;
    }

    /// Sets the state to closed.
    pub fn set_closed(&mut self) {
        self.state = RelationState::Closed;
    }

    /// Increments the rows produced counter.
    pub fn inc_rows_produced(&mut self) {
        self.rows_produced += 1;
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub const fn rows_produced(&self) -> u64 {
        self.rows_produced
    }
}

/// Opens a relation, pulls every row, closes it, and returns the rows.
///
/// This is the simplest way to run a pipeline to completion.
///
/// # Errors
///
/// Propagates the first error raised anywhere in the pipeline.
pub fn collect<R: Relation>(mut relation: R) -> EngineResult<Vec<Row>> {
    relation.open()?;
    let mut rows = Vec::new();
    while let Some(row) = relation.next()? {
        rows.push(row);
    }
    tracing::debug!(relation = relation.name(), rows = rows.len(), "pipeline drained");
    relation.close()?;
    Ok(rows)
}

/// Iterator adapter over a relation.
///
/// Opens the relation on the first pull, yields `EngineResult<Row>`
/// items, and closes the relation when it is exhausted or dropped. The
/// iterator is fused: after an error or the final row it keeps
/// returning `None`.
pub struct Rows<R: Relation> {
    relation: R,
    started: bool,
    done: bool,
}

impl<R: Relation> Rows<R> {
    /// Wraps a relation for iteration.
    #[must_use]
    pub fn new(relation: R) -> Self {
        Self { relation, started: false, done: false }
    }
}

impl<R: Relation> Iterator for Rows<R> {
    type Item = EngineResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if let Err(err) = self.relation.open() {
                self.done = true;
                return Some(Err(err));
            }
        }
        match self.relation.next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                match self.relation.close() {
                    Ok(()) => None,
                    Err(err) => Some(Err(err)),
                }
            }
            Err(err) => {
                self.done = true;
                // Already reporting an error; closing is best effort.
                let _ = self.relation.close();
                Some(Err(err))
            }
        }
    }
}

impl<R: Relation> Drop for Rows<R> {
    fn drop(&mut self) {
        if self.started && !self.done {
            let _ = self.relation.close();
        }
    }
}
