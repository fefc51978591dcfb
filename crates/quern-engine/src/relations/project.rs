//! Select and Mutate relations.
//!
//! `Select` replaces the row shape with exactly the named expressions;
//! `Mutate` keeps every input column and lays new values over it,
//! replacing columns in place when a name already exists and appending
//! otherwise.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::expr::KeyFn;
use crate::relation::{BoxedRelation, Relation, RelationBase, RelationState};
use crate::row::{Row, Schema};

/// Select relation - projects each input row to a new set of columns.
pub struct Select {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// One expression per output column.
    exprs: Vec<KeyFn>,
}

impl Select {
    /// Creates a projection to the named expressions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if an output name
    /// repeats.
    pub fn new<S>(input: BoxedRelation, columns: Vec<(S, KeyFn)>) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
    {
        let (names, exprs): (Vec<Arc<str>>, Vec<KeyFn>) =
            columns.into_iter().map(|(name, expr)| (name.into(), expr)).unzip();
        let schema = Arc::new(Schema::new(names)?);
        Ok(Self { base: RelationBase::new(schema), input, exprs })
    }
}

impl Relation for Select {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        match self.input.next()? {
            Some(row) => {
                let values: Vec<_> = self
                    .exprs
                    .iter()
                    .map(|expr| expr(&row))
                    .collect::<EngineResult<_>>()?;
                self.base.inc_rows_produced();
                Ok(Some(Row::new(self.base.schema(), values)))
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
        "Select"
    }
}

impl std::fmt::Debug for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Select")
            .field("state", &self.base.state())
            .field("columns", &self.base.schema().columns())
            .finish_non_exhaustive()
    }
}

/// Where a mutated column lands in the output row.
enum Slot {
    /// Overwrites an existing column, keeping its position.
    Replace(usize),
    /// Appends a new column at the end.
    Append,
}

/// Mutate relation - adds or replaces columns, keeping the rest.
///
/// All expressions see the original input row, so a mutation that
/// replaces a column does not affect its neighbors' inputs.
pub struct Mutate {
    /// Base relation state.
    base: RelationBase,
    /// The input relation.
    input: BoxedRelation,
    /// Expressions in declaration order.
    exprs: Vec<KeyFn>,
    /// Output position per expression.
    slots: Vec<Slot>,
}

impl Mutate {
    /// Creates a mutation over an input relation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if a name appears twice
    /// among the mutations, or [`EngineError::AmbiguousColumn`] if a
    /// name is duplicated across join sides in the input.
    pub fn new<S>(input: BoxedRelation, columns: Vec<(S, KeyFn)>) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
    {
        let input_schema = input.schema();
        let mut schema = (*input_schema).clone();
        let mut exprs = Vec::with_capacity(columns.len());
        let mut slots = Vec::with_capacity(columns.len());
        let mut declared: HashSet<Arc<str>> = HashSet::new();

        for (name, expr) in columns {
            let name: Arc<str> = name.into();
            if !declared.insert(Arc::clone(&name)) {
                return Err(EngineError::DuplicateColumn(name.to_string()));
            }
            if input_schema.is_ambiguous(&name) {
                return Err(EngineError::AmbiguousColumn { name: name.to_string() });
            }
            match input_schema.index_of(&name) {
                Some(index) => slots.push(Slot::Replace(index)),
                None => {
                    schema = schema.with_column(Arc::clone(&name))?;
                    slots.push(Slot::Append);
                }
            }
            exprs.push(expr);
        }

        Ok(Self { base: RelationBase::new(Arc::new(schema)), input, exprs, slots })
    }
}

impl Relation for Mutate {
    fn open(&mut self) -> EngineResult<()> {
        self.input.open()?;
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> EngineResult<Option<Row>> {
        self.base.ensure_open(self.name())?;
        match self.input.next()? {
            Some(row) => {
                let mut values = row.values().to_vec();
                for (expr, slot) in self.exprs.iter().zip(&self.slots) {
                    let value = expr(&row)?;
                    match slot {
                        Slot::Replace(index) => values[*index] = value,
                        Slot::Append => values.push(value),
                    }
                }
                self.base.inc_rows_produced();
                Ok(Some(Row::new(self.base.schema(), values)))
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
        "Mutate"
    }
}

impl std::fmt::Debug for Mutate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutate")
            .field("state", &self.base.state())
            .field("columns", &self.base.schema().columns())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quern_core::Value;

    use super::*;
    use crate::expr::col;
    use crate::relations::Values;

    fn people() -> BoxedRelation {
        Box::new(
            Values::with_columns(
                vec!["name", "age"],
                vec![
                    vec![Value::from("Ada"), Value::Int(36)],
                    vec![Value::from("Grace"), Value::Int(45)],
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn select_projects_and_renames() {
        let mut rel = Select::new(
            people(),
            vec![
                ("person", col("name")),
                ("age_next_year", Box::new(|row| {
                    Ok(Value::Int(row.value("age")?.as_int().unwrap_or(0) + 1))
                })),
            ],
        )
        .unwrap();

        rel.open().unwrap();
        let row = rel.next().unwrap().unwrap();
        assert_eq!(row.schema().columns().len(), 2);
        assert_eq!(row.value("person").unwrap(), &Value::from("Ada"));
        assert_eq!(row.value("age_next_year").unwrap(), &Value::Int(37));
        rel.close().unwrap();
    }

    #[test]
    fn select_rejects_duplicate_names() {
        let err = Select::new(people(), vec![("a", col("name")), ("a", col("age"))])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateColumn(_)));
    }

    #[test]
    fn mutate_replaces_in_place_and_appends() {
        let mut rel = Mutate::new(
            people(),
            vec![
                ("age", Box::new(|row: &Row| {
                    Ok(Value::Int(row.value("age")?.as_int().unwrap_or(0) * 2))
                }) as crate::expr::KeyFn),
                ("greeting", Box::new(|row| {
                    Ok(Value::from(format!(
                        "hi {}",
                        row.value("name")?.as_str().unwrap_or("?")
                    )))
                })),
            ],
        )
        .unwrap();

        rel.open().unwrap();
        let row = rel.next().unwrap().unwrap();
        // Replaced column keeps its original position
        assert_eq!(row.schema().column_at(1), Some("age"));
        assert_eq!(row.value("age").unwrap(), &Value::Int(72));
        assert_eq!(row.value("greeting").unwrap(), &Value::from("hi Ada"));
        assert_eq!(row.len(), 3);
        rel.close().unwrap();
    }

    #[test]
    fn mutate_rejects_duplicate_mutations() {
        let err = Mutate::new(
            people(),
            vec![("x", col("age")), ("x", col("age"))],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateColumn(_)));
    }
}
