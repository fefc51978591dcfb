//! Error types for relation construction and evaluation.

use quern_core::CoreError;
use thiserror::Error;

/// Errors that can occur while building or evaluating a relational pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A column name was not found in a row's schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A column name matched columns on both sides of a join.
    #[error("ambiguous column: {name} exists on both sides of the join")]
    AmbiguousColumn {
        /// The name that matched more than one column.
        name: String,
    },

    /// A relation was constructed with the same output column twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// Two relations that must share a shape did not.
    #[error("shape mismatch: {context}: left has columns [{left}], right has columns [{right}]")]
    ShapeMismatch {
        /// The operation that required matching shapes.
        context: String,
        /// Column names of the left input.
        left: String,
        /// Column names of the right input.
        right: String,
    },

    /// A row was built with a number of values different from its schema.
    #[error("arity mismatch: schema has {expected} columns, row has {actual} values")]
    ArityMismatch {
        /// Number of columns in the schema.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A window frame was declared with bounds that can never be satisfied.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A window definition was invalid for the functions it carries.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// An aggregate expression was used where it is not supported.
    #[error("invalid aggregate: {0}")]
    InvalidAggregate(String),

    /// Rows were pulled from a relation that was never opened, or after
    /// it was closed.
    #[error("relation {name} is not open (state: {state})")]
    NotOpen {
        /// Name of the relation that was misused.
        name: &'static str,
        /// The lifecycle state it was in.
        state: &'static str,
    },

    /// An error bubbled up from the core value model.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
