//! Window relation: per-row aggregates over partitioned, ordered frames.

use std::collections::HashMap;
use std::sync::Arc;

use quern_core::Value;

use crate::aggregate::{ranking, AggregateExpr, AggregateKind};
use crate::error::{EngineError, EngineResult};
use crate::expr::{cmp_key_values, eval_keys};
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::relations::encode_key;
use crate::row::{Row, Schema};
use crate::window::{Frame, WindowDef};

/// Window relation.
///
/// Appends one column per aggregate expression to every input row. Each
/// row's value aggregates the rows of its [`Frame`] within its
/// partition, ordered by the window's sort keys. This is a blocking
/// relation: the input is materialized, but rows come back out in their
/// original input order no matter how partitioning shuffles them.
///
/// Associative aggregates are answered from a segment tree built once
/// per partition, so a frame of any width costs O(log n); general
/// aggregates fold their frame from scratch. Ranking functions read the
/// partition's ordering directly and ignore the frame.
pub struct Window {
    /// Base relation state.
    base: RelationBase,
    /// Partitioning, ordering, and framing shared by all expressions.
    def: WindowDef,
    /// Aggregates, keyed by appended column name.
    exprs: Vec<(Arc<str>, AggregateExpr)>,
    /// Input relation.
    input: BoxedRelation,
    /// Rows with window columns appended, in input order.
    result_iter: std::vec::IntoIter<Row>,
    /// Whether rows have been materialized.
    materialized: bool,
}

impl Window {
    /// Creates a window over an input relation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if an appended name
    /// collides with an input column or another window column,
    /// [`EngineError::InvalidFrame`] if the definition's frame is
    /// malformed, or [`EngineError::InvalidWindow`] if a range frame is
    /// used without exactly one ascending order key.
    pub fn new<S>(
        input: BoxedRelation,
        def: WindowDef,
        exprs: Vec<(S, AggregateExpr)>,
    ) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
    {
        let exprs: Vec<(Arc<str>, AggregateExpr)> =
            exprs.into_iter().map(|(name, expr)| (name.into(), expr)).collect();

        if let Some(frame) = &def.frame {
            frame.validate()?;
        }
        if def.frame.as_ref().is_some_and(Frame::is_range) {
            let ascending = def.order_by.len() == 1 && !def.order_by[0].descending;
            if !ascending {
                return Err(EngineError::InvalidWindow(
                    "range framing requires exactly one ascending order key".to_string(),
                ));
            }
        }

        let mut schema = (*input.schema()).clone();
        for (name, _) in &exprs {
            schema = schema.with_column(Arc::clone(name))?;
        }

        Ok(Self {
            base: RelationBase::new(Arc::new(schema)),
            def,
            exprs,
            input,
            result_iter: Vec::new().into_iter(),
            materialized: false,
        })
    }

    /// Drains the input, computes every window column, and reassembles
    /// rows in input order.
    fn materialize(&mut self) -> EngineResult<()> {
        let mut rows: Vec<Row> = Vec::new();
        while let Some(row) = self.input.next()? {
            rows.push(row);
        }

        if rows.is_empty() {
            self.result_iter = Vec::new().into_iter();
            self.materialized = true;
            return Ok(());
        }

        // Split row indices into partitions, first-seen order.
        let mut partitions: Vec<Vec<usize>> = Vec::new();
        if self.def.partition_by.is_empty() {
            partitions.push((0..rows.len()).collect());
        } else {
            let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
            for (i, row) in rows.iter().enumerate() {
                let key_values: Vec<Value> = self
                    .def
                    .partition_by
                    .iter()
                    .map(|key| key(row))
                    .collect::<EngineResult<_>>()?;
                let encoded = encode_key(&key_values);
                let slot = match index.get(&encoded) {
                    Some(&slot) => slot,
                    None => {
                        let slot = partitions.len();
                        index.insert(encoded, slot);
                        partitions.push(Vec::new());
                        slot
                    }
                };
                partitions[slot].push(i);
            }
        }

        tracing::debug!(
            rows = rows.len(),
            partitions = partitions.len(),
            "window input partitioned"
        );

        // Order keys are evaluated once per row; errors surface here,
        // before any sorting.
        let order_keys: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| eval_keys(&self.def.order_by, row))
            .collect::<EngineResult<_>>()?;

        let effective = self.def.effective_frame();
        let mut window_cols: Vec<Vec<Value>> =
            vec![vec![Value::Null; rows.len()]; self.exprs.len()];

        for part in &mut partitions {
            // Stable, so peers keep their input order.
            part.sort_by(|&a, &b| {
                cmp_key_values(&self.def.order_by, &order_keys[a], &order_keys[b])
            });
            let tuples: Vec<Vec<Value>> =
                part.iter().map(|&i| order_keys[i].clone()).collect();

            for ((_, expr), col) in self.exprs.iter().zip(&mut window_cols) {
                match &expr.kind {
                    AggregateKind::Ranking(kind) => {
                        let ranks = ranking::compute_ranks(*kind, &self.def.order_by, &tuples);
                        for (pos, &orig) in part.iter().enumerate() {
                            col[orig] = ranks[pos].clone();
                        }
                    }
                    AggregateKind::Associative(seed) => {
                        let inputs: Vec<Value> = part
                            .iter()
                            .map(|&i| expr.eval_input(&rows[i]))
                            .collect::<EngineResult<_>>()?;
                        let frame = expr.frame.as_ref().unwrap_or(&effective);
                        let order_values = range_order_values(frame, &tuples);
                        let tree = seed.index(&inputs);
                        for (pos, &orig) in part.iter().enumerate() {
                            let range = frame.bounds(pos, part.len(), &order_values)?;
                            col[orig] = tree.query(range);
                        }
                    }
                    AggregateKind::Fold(factory) => {
                        let inputs: Vec<Value> = part
                            .iter()
                            .map(|&i| expr.eval_input(&rows[i]))
                            .collect::<EngineResult<_>>()?;
                        let frame = expr.frame.as_ref().unwrap_or(&effective);
                        let order_values = range_order_values(frame, &tuples);
                        for (pos, &orig) in part.iter().enumerate() {
                            let range = frame.bounds(pos, part.len(), &order_values)?;
                            let mut state = factory();
                            for value in &inputs[range] {
                                state.step(value);
                            }
                            col[orig] = state.finalize();
                        }
                    }
                }
            }
        }

        let schema = self.base.schema();
        let result: Vec<Row> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let mut values = row.into_values();
                for col in &mut window_cols {
                    values.push(std::mem::replace(&mut col[i], Value::Null));
                }
                Row::new(Arc::clone(&schema), values)
            })
            .collect();

        self.result_iter = result.into_iter();
        self.materialized = true;
        Ok(())
    }
}

/// The sorted order-key values a range frame bisects over; empty for
/// row-counted frames, which never read them.
fn range_order_values(frame: &Frame, tuples: &[Vec<Value>]) -> Vec<Value> {
    if frame.is_range() {
        tuples.iter().map(|t| t[0].clone()).collect()
    } else {
        Vec::new()
    }
}

impl Relation for Window {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.result_iter = Vec::new().into_iter();
        self.materialized = false;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if !self.materialized {
            self.materialize()?;
        }
        match self.result_iter.next() {
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
        self.result_iter = Vec::new().into_iter();
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
        "Window"
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("state", &self.base.state())
            .field("columns", &self.base.schema().columns())
            .finish_non_exhaustive()
    }
}
