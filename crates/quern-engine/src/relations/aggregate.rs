//! Grouped aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use quern_core::Value;

use crate::aggregate::{Aggregate, AggregateExpr};
use crate::error::EngineResult;
use crate::expr::KeyFn;
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::relations::encode_key;
use crate::row::{Row, Schema};

/// GroupBy relation - buckets rows by key expressions and folds one
/// aggregate state per bucket.
///
/// Output rows carry the key values followed by the finalized
/// aggregates, one row per distinct key in first-seen order. With no
/// keys the aggregation is scalar: exactly one output row, even on
/// empty input, where each aggregate reports its empty result.
///
/// Keys group by structural equality, the same notion [`Row`] hashing
/// uses: `1` and `1.0` land in different groups, and all nulls land in
/// the same one.
pub struct GroupBy {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// Key expressions; empty means scalar aggregation.
    keys: Vec<KeyFn>,
    /// Aggregates, keyed by output column name.
    aggs: Vec<(Arc<str>, AggregateExpr)>,
    /// Output rows, populated on the first `next` call.
    output: Option<std::vec::IntoIter<Row>>,
}

impl GroupBy {
    /// Creates a grouped aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if key and aggregate
    /// names collide, and [`EngineError::InvalidAggregate`] for
    /// aggregates that only work in windows (ranking, `lead`/`lag`).
    ///
    /// [`EngineError::DuplicateColumn`]: crate::EngineError::DuplicateColumn
    /// [`EngineError::InvalidAggregate`]: crate::EngineError::InvalidAggregate
    pub fn new<K, A>(
        input: BoxedRelation,
        keys: Vec<(K, KeyFn)>,
        aggs: Vec<(A, AggregateExpr)>,
    ) -> EngineResult<Self>
    where
        K: Into<Arc<str>>,
        A: Into<Arc<str>>,
    {
        let (key_names, keys): (Vec<Arc<str>>, Vec<KeyFn>) =
            keys.into_iter().map(|(name, key)| (name.into(), key)).unzip();
        let aggs: Vec<(Arc<str>, AggregateExpr)> =
            aggs.into_iter().map(|(name, expr)| (name.into(), expr)).collect();

        // Window-only aggregates are rejected here, not at evaluation.
        for (name, expr) in &aggs {
            expr.group_state(name)?;
        }

        let names = key_names
            .iter()
            .chain(aggs.iter().map(|(name, _)| name))
            .map(Arc::clone);
        let schema = Arc::new(Schema::new(names)?);

        Ok(Self { base: RelationBase::new(schema), input, keys, aggs, output: None })
    }

    fn fresh_states(&self) -> EngineResult<Vec<Box<dyn Aggregate>>> {
        self.aggs.iter().map(|(name, expr)| expr.group_state(name)).collect()
    }

    /// Drains the input into per-group states and finalizes them.
    fn materialize(&mut self) -> EngineResult<()> {
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Box<dyn Aggregate>>)> = Vec::new();

        if self.keys.is_empty() {
            // Scalar aggregation emits one row even for empty input.
            index.insert(Vec::new(), 0);
            groups.push((Vec::new(), self.fresh_states()?));
        }

        while let Some(row) = self.input.next()? {
            let key_values: Vec<Value> = self
                .keys
                .iter()
                .map(|key| key(&row))
                .collect::<EngineResult<_>>()?;
            let encoded = encode_key(&key_values);
            let slot = match index.get(&encoded) {
                Some(&slot) => slot,
                None => {
                    let slot = groups.len();
                    index.insert(encoded, slot);
                    groups.push((key_values, self.fresh_states()?));
                    slot
                }
            };
            let (_, states) = &mut groups[slot];
            for ((_, expr), state) in self.aggs.iter().zip(states) {
                state.step(&expr.eval_input(&row)?);
            }
        }

        tracing::debug!(groups = groups.len(), "grouped aggregation materialized");

        let schema = self.base.schema();
        let rows: Vec<Row> = groups
            .into_iter()
            .map(|(mut values, states)| {
                values.extend(states.iter().map(|state| state.finalize()));
                Row::new(Arc::clone(&schema), values)
            })
            .collect();
        self.output = Some(rows.into_iter());
        Ok(())
    }
}

impl Relation for GroupBy {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.output = None;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        if self.output.is_none() {
            self.materialize()?;
        }
        match self.output.as_mut().and_then(Iterator::next) {
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
        self.output = None;
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
        "GroupBy"
    }
}

impl std::fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupBy")
            .field("state", &self.base.state())
            .field("columns", &self.base.schema().columns())
            .finish_non_exhaustive()
    }
}

/// A relation with grouping keys chosen but aggregates still pending.
///
/// Produced by [`RelationExt::group_by`](crate::RelationExt::group_by);
/// call [`aggregate`](Self::aggregate) to finish the [`GroupBy`].
pub struct Grouped {
    input: BoxedRelation,
    keys: Vec<(Arc<str>, KeyFn)>,
}

impl Grouped {
    pub(crate) fn new<S>(input: BoxedRelation, keys: Vec<(S, KeyFn)>) -> Self
    where
        S: Into<Arc<str>>,
    {
        let keys = keys.into_iter().map(|(name, key)| (name.into(), key)).collect();
        Self { input, keys }
    }

    /// Attaches aggregates and builds the grouped relation.
    ///
    /// # Errors
    ///
    /// Same conditions as [`GroupBy::new`].
    pub fn aggregate<S>(self, aggs: Vec<(S, AggregateExpr)>) -> EngineResult<GroupBy>
    where
        S: Into<Arc<str>>,
    {
        GroupBy::new(self.input, self.keys, aggs)
    }
}
