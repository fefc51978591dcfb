//! Join relations for combining two inputs.

use std::sync::Arc;

use crate::error::EngineResult;
use crate::expr::JoinPredicate;
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// How unmatched rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Every left/right pair, no predicate.
    Cross,
    /// Pairs for which the predicate holds.
    Inner,
    /// Inner pairs plus unmatched left rows padded with nulls.
    Left,
    /// Inner pairs plus unmatched right rows padded with nulls.
    Right,
}

/// Nested loop join relation.
///
/// Streams the left input and scans a materialized copy of the right
/// for each left row, evaluating the predicate per pair: O(n*m), no
/// requirements on the inputs. The output schema is the left columns
/// followed by the right columns; names present on both sides must be
/// read through [`Row::left`] and [`Row::right`].
///
/// For right joins the inner phase marks which right rows ever matched,
/// and a tail phase emits the rest padded with a null left side.
pub struct NestedLoopJoin {
    /// Base relation state.
    base: RelationBase,
    /// Join kind.
    kind: JoinKind,
    /// Join predicate; `None` only for cross joins.
    on: Option<JoinPredicate>,
    /// Left (streamed) input.
    left: BoxedRelation,
    /// Right (materialized) input.
    right: BoxedRelation,
    /// Materialized right rows.
    right_rows: Vec<Row>,
    /// Per right row, whether any left row matched it.
    right_matched: Vec<bool>,
    /// Current left row.
    current_left: Option<Row>,
    /// Scan position in the right rows.
    right_pos: usize,
    /// Whether the current left row has matched.
    left_matched: bool,
    /// Whether the right side is materialized.
    right_materialized: bool,
    /// Position in the unmatched-right tail phase.
    tail_pos: usize,
}

impl NestedLoopJoin {
    fn new(
        kind: JoinKind,
        on: Option<JoinPredicate>,
        left: BoxedRelation,
        right: BoxedRelation,
    ) -> Self {
        let schema = Arc::new(Schema::join(&left.schema(), &right.schema()));
        Self {
            base: RelationBase::new(schema),
            kind,
            on,
            left,
            right,
            right_rows: Vec::new(),
            right_matched: Vec::new(),
            current_left: None,
            right_pos: 0,
            left_matched: false,
            right_materialized: false,
            tail_pos: 0,
        }
    }

    /// Creates a cross join: every pair of rows.
    #[must_use]
    pub fn cross(left: BoxedRelation, right: BoxedRelation) -> Self {
        Self::new(JoinKind::Cross, None, left, right)
    }

    /// Creates an inner join on a predicate.
    #[must_use]
    pub fn inner(left: BoxedRelation, right: BoxedRelation, on: JoinPredicate) -> Self {
        Self::new(JoinKind::Inner, Some(on), left, right)
    }

    /// Creates a left outer join: unmatched left rows are kept, padded
    /// with nulls on the right.
    #[must_use]
    pub fn left_outer(left: BoxedRelation, right: BoxedRelation, on: JoinPredicate) -> Self {
        Self::new(JoinKind::Left, Some(on), left, right)
    }

    /// Creates a right outer join: unmatched right rows are kept, padded
    /// with nulls on the left.
    #[must_use]
    pub fn right_outer(left: BoxedRelation, right: BoxedRelation, on: JoinPredicate) -> Self {
        Self::new(JoinKind::Right, Some(on), left, right)
    }

    /// Returns the join kind.
    #[must_use]
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Evaluates the join predicate; cross joins match everything.
    fn matches(&self, left: &Row, right: &Row) -> EngineResult<bool> {
        match &self.on {
            Some(on) => on(left, right),
            None => Ok(true),
        }
    }

    /// Concatenates a left and right row under the join schema.
    fn merged(&self, left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend_from_slice(left.values());
        values.extend_from_slice(right.values());
        Row::new(self.base.schema(), values)
    }

    /// An all-null row shaped like the right input.
    fn right_null_row(&self) -> Row {
        Row::empty(self.right.schema())
    }

    /// An all-null row shaped like the left input.
    fn left_null_row(&self) -> Row {
        Row::empty(self.left.schema())
    }
}

impl Relation for NestedLoopJoin {
    fn open(&mut self) -> EngineResult<()> {
        self.left.open()?;
        self.right.open()?;
        self.right_rows.clear();
        self.right_matched.clear();
        self.current_left = None;
        self.right_pos = 0;
        self.left_matched = false;
        self.right_materialized = false;
        self.tail_pos = 0;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;

        // Materialize the right side on the first call.
        if !self.right_materialized {
            while let Some(row) = self.right.next()? {
                self.right_rows.push(row);
            }
            self.right_matched = vec![false; self.right_rows.len()];
            self.right_materialized = true;
        }

        loop {
            // Pull the next left row if needed.
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.right_pos = 0;
                        self.left_matched = false;
                    }
                    None => {
                        // Left exhausted; right joins still owe their
                        // unmatched right rows.
                        if self.kind == JoinKind::Right {
                            while self.tail_pos < self.right_rows.len() {
                                let pos = self.tail_pos;
                                self.tail_pos += 1;
                                if !self.right_matched[pos] {
                                    let row = self
                                        .merged(&self.left_null_row(), &self.right_rows[pos]);
                                    self.base.inc_rows_produced();
                                    return Ok(Some(row));
                                }
                            }
                        }
                        self.base.set_finished();
                        return Ok(None);
                    }
                }
            }

            if let Some(left_row) = &self.current_left {
                while self.right_pos < self.right_rows.len() {
                    let pos = self.right_pos;
                    self.right_pos += 1;

                    if self.matches(left_row, &self.right_rows[pos])? {
                        self.left_matched = true;
                        self.right_matched[pos] = true;
                        self.base.inc_rows_produced();
                        return Ok(Some(self.merged(left_row, &self.right_rows[pos])));
                    }
                }

                // Right exhausted for this left row.
                if self.kind == JoinKind::Left && !self.left_matched {
                    self.left_matched = true;
                    self.base.inc_rows_produced();
                    return Ok(Some(self.merged(left_row, &self.right_null_row())));
                }
            }

            self.current_left = None;
        }
    }

    fn close(&mut self) -> EngineResult<()> {
        self.left.close()?;
        self.right.close()?;
        self.right_rows.clear();
        self.right_matched.clear();
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
        "NestedLoopJoin"
    }
}
