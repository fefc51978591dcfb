//! Rows and schemas flowing through relational pipelines.
//!
//! A [`Schema`] maps column names to positions and is shared between all
//! rows of a relation via [`Arc`], so producing a row never copies the
//! column list. A [`Row`] pairs a schema with one value per column and is
//! immutable once built: its structural hash is computed at construction
//! and cached, which makes rows cheap to use as hash-table keys in set
//! operations and grouping.
//!
//! Schemas produced by joins keep both input column lists side by side.
//! Names that appear on both sides become ambiguous for plain lookup and
//! must be read through [`Row::left`] or [`Row::right`].

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;

use quern_core::Value;

use crate::error::{EngineError, EngineResult};

/// Column names and their positions for one relation.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Column names in order.
    columns: Vec<Arc<str>>,
    /// Unambiguous name lookups. Names that occur more than once are
    /// excluded and recorded in `ambiguous` instead.
    name_to_index: HashMap<Arc<str>, usize>,
    /// Names that occur in more than one column (join outputs only).
    ambiguous: HashSet<Arc<str>>,
    /// For join schemas, the number of columns contributed by the left
    /// input. `None` for ordinary schemas.
    split: Option<usize>,
}

impl Schema {
    /// Creates a schema from column names.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if a name repeats.
    pub fn new<I, S>(columns: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let columns: Vec<Arc<str>> = columns.into_iter().map(Into::into).collect();
        let mut name_to_index = HashMap::with_capacity(columns.len());
        for (index, name) in columns.iter().enumerate() {
            if name_to_index.insert(Arc::clone(name), index).is_some() {
                return Err(EngineError::DuplicateColumn(name.to_string()));
            }
        }
        Ok(Self { columns, name_to_index, ambiguous: HashSet::new(), split: None })
    }

    /// Creates an empty schema with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the schema of a join output: all left columns followed by
    /// all right columns.
    ///
    /// Names occurring on both sides (or more than once on one side) are
    /// marked ambiguous; rows with this schema answer such names only
    /// through side-qualified lookup.
    #[must_use]
    pub fn join(left: &Self, right: &Self) -> Self {
        let mut columns = Vec::with_capacity(left.len() + right.len());
        columns.extend(left.columns.iter().cloned());
        columns.extend(right.columns.iter().cloned());

        let mut name_to_index = HashMap::with_capacity(columns.len());
        let mut ambiguous = HashSet::new();
        for (index, name) in columns.iter().enumerate() {
            if ambiguous.contains(name) {
                continue;
            }
            if name_to_index.insert(Arc::clone(name), index).is_some() {
                name_to_index.remove(name);
                ambiguous.insert(Arc::clone(name));
            }
        }

        Self { columns, name_to_index, ambiguous, split: Some(left.len()) }
    }

    /// Returns a copy of this schema with one column appended.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if the name already exists.
    pub fn with_column(&self, name: impl Into<Arc<str>>) -> EngineResult<Self> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) || self.ambiguous.contains(&name) {
            return Err(EngineError::DuplicateColumn(name.to_string()));
        }
        let mut schema = self.clone();
        schema.name_to_index.insert(Arc::clone(&name), schema.columns.len());
        schema.columns.push(name);
        Ok(schema)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column names in order.
    #[must_use]
    pub fn columns(&self) -> &[Arc<str>] {
        &self.columns
    }

    /// Returns the name of the column at `index`, if in bounds.
    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|name| &**name)
    }

    /// Returns the position of an unambiguous column, if present.
    ///
    /// Ambiguous names (duplicated by a join) return `None`; use
    /// [`Schema::lookup`] to distinguish missing from ambiguous.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Returns `true` if the name is duplicated across join sides.
    #[must_use]
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }

    /// Resolves a column name to its position.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AmbiguousColumn`] if the name is duplicated
    /// by a join, or [`EngineError::ColumnNotFound`] if it is absent.
    pub fn lookup(&self, name: &str) -> EngineResult<usize> {
        if self.ambiguous.contains(name) {
            return Err(EngineError::AmbiguousColumn { name: name.to_string() });
        }
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::ColumnNotFound(name.to_string()))
    }

    /// Resolves a name against the left side of a join schema.
    ///
    /// For schemas that did not come from a join, the whole schema counts
    /// as the left side.
    pub fn left_lookup(&self, name: &str) -> EngineResult<usize> {
        self.side_lookup(name, 0..self.split.unwrap_or(self.columns.len()))
    }

    /// Resolves a name against the right side of a join schema.
    ///
    /// For schemas that did not come from a join, the right side is empty
    /// and every lookup fails.
    pub fn right_lookup(&self, name: &str) -> EngineResult<usize> {
        self.side_lookup(name, self.split.unwrap_or(self.columns.len())..self.columns.len())
    }

    fn side_lookup(&self, name: &str, range: Range<usize>) -> EngineResult<usize> {
        let mut found = None;
        for index in range {
            if &*self.columns[index] == name {
                if found.is_some() {
                    return Err(EngineError::AmbiguousColumn { name: name.to_string() });
                }
                found = Some(index);
            }
        }
        found.ok_or_else(|| EngineError::ColumnNotFound(name.to_string()))
    }

    /// Returns `true` if both schemas have the same column names in the
    /// same order.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.columns == other.columns
    }

    /// Renders the column list for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.columns.join(", ")
    }
}

/// An immutable row: one value per schema column.
///
/// Rows are structurally hashable and comparable. Equality treats `NaN`
/// as equal to itself and `-0.0` as equal to `0.0`, and the hash agrees
/// with equality, so rows behave sensibly as keys in `HashMap` and
/// `HashSet`. The hash is computed once at construction.
#[derive(Debug, Clone)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Value>,
    /// Structural hash over column names and values, fixed at construction.
    hash: u64,
}

impl Row {
    /// Creates a row from a schema and one value per column.
    ///
    /// The caller must supply exactly `schema.len()` values; internal
    /// callers guarantee this, so the check is a debug assertion.
    #[must_use]
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(
            schema.len(),
            values.len(),
            "row arity must match schema arity"
        );
        let hash = Self::compute_hash(&schema, &values);
        Self { schema, values, hash }
    }

    /// Creates a row and schema together from name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateColumn`] if a name repeats.
    pub fn from_pairs<S, I>(pairs: I) -> EngineResult<Self>
    where
        S: Into<Arc<str>>,
        I: IntoIterator<Item = (S, Value)>,
    {
        let (names, values): (Vec<Arc<str>>, Vec<Value>) =
            pairs.into_iter().map(|(name, value)| (name.into(), value)).unzip();
        let schema = Arc::new(Schema::new(names)?);
        Ok(Self::new(schema, values))
    }

    /// Creates an all-null row for the given schema.
    ///
    /// Outer joins use this to pad the unmatched side.
    #[must_use]
    pub fn empty(schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self::new(schema, values)
    }

    /// Returns the row's schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the number of values in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at a position, if in bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of an unambiguous column, if present.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|index| &self.values[index])
    }

    /// Returns the value of a column, reporting why when it cannot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AmbiguousColumn`] for names duplicated by a
    /// join and [`EngineError::ColumnNotFound`] for absent names.
    pub fn value(&self, name: &str) -> EngineResult<&Value> {
        let index = self.schema.lookup(name)?;
        Ok(&self.values[index])
    }

    /// Returns a column from the left side of a joined row.
    pub fn left(&self, name: &str) -> EngineResult<&Value> {
        let index = self.schema.left_lookup(name)?;
        Ok(&self.values[index])
    }

    /// Returns a column from the right side of a joined row.
    pub fn right(&self, name: &str) -> EngineResult<&Value> {
        let index = self.schema.right_lookup(name)?;
        Ok(&self.values[index])
    }

    /// Returns all values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns the cached structural hash.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        self.hash
    }

    /// Copies the row into a name-to-value map.
    ///
    /// Ambiguous join columns keep the last occurrence, matching map
    /// insertion order; prefer side-qualified access for those.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.schema
            .columns()
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn compute_hash(schema: &Schema, values: &[Value]) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_usize(values.len());
        for (name, value) in schema.columns().iter().zip(values) {
            hasher.write(name.as_bytes());
            value.structural_hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash || !self.schema.same_shape(&other.schema) {
            return false;
        }
        self.values
            .iter()
            .zip(&other.values)
            .all(|(a, b)| a.structural_eq(b))
    }
}

impl Eq for Row {}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn schema(names: &[&str]) -> Arc<Schema> {
        Arc::new(Schema::new(names.iter().copied()).unwrap())
    }

    #[test]
    fn schema_lookup() {
        let schema = schema(&["id", "name"]);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema.column_at(1), Some("name"));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn schema_rejects_duplicates() {
        let err = Schema::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn schema_with_column() {
        let base = schema(&["a"]);
        let extended = base.with_column("b").unwrap();
        assert_eq!(extended.index_of("b"), Some(1));
        assert!(base.with_column("a").is_err());
    }

    #[test]
    fn join_schema_marks_shared_names_ambiguous() {
        let left = schema(&["id", "name"]);
        let right = schema(&["id", "dept"]);
        let joined = Schema::join(&left, &right);

        assert_eq!(joined.len(), 4);
        assert!(joined.is_ambiguous("id"));
        assert_eq!(joined.index_of("id"), None);
        assert_eq!(joined.index_of("name"), Some(1));
        assert_eq!(joined.index_of("dept"), Some(3));

        assert!(matches!(joined.lookup("id"), Err(EngineError::AmbiguousColumn { .. })));
        assert!(matches!(joined.lookup("missing"), Err(EngineError::ColumnNotFound(_))));
        assert_eq!(joined.left_lookup("id").unwrap(), 0);
        assert_eq!(joined.right_lookup("id").unwrap(), 2);
    }

    #[test]
    fn row_access() {
        let row = Row::from_pairs([("id", Value::Int(7)), ("name", Value::from("Ada"))]).unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(7)));
        assert_eq!(row.get_by_name("name"), Some(&Value::from("Ada")));
        assert_eq!(row.value("id").unwrap(), &Value::Int(7));
        assert!(matches!(row.value("nope"), Err(EngineError::ColumnNotFound(_))));
    }

    #[test]
    fn empty_row_is_all_null() {
        let row = Row::empty(schema(&["a", "b"]));
        assert_eq!(row.values(), &[Value::Null, Value::Null]);
    }

    #[test]
    fn joined_row_qualified_access() {
        let left_schema = schema(&["id", "name"]);
        let right_schema = schema(&["id", "dept"]);
        let joined = Arc::new(Schema::join(&left_schema, &right_schema));
        let row = Row::new(
            joined,
            vec![Value::Int(1), Value::from("Ada"), Value::Int(1), Value::from("eng")],
        );

        assert!(matches!(row.value("id"), Err(EngineError::AmbiguousColumn { .. })));
        assert_eq!(row.left("id").unwrap(), &Value::Int(1));
        assert_eq!(row.right("id").unwrap(), &Value::Int(1));
        assert_eq!(row.right("dept").unwrap(), &Value::from("eng"));
        // Unambiguous names still resolve without qualification
        assert_eq!(row.value("name").unwrap(), &Value::from("Ada"));
    }

    #[test]
    fn equal_rows_share_hash() {
        let a = Row::from_pairs([("x", Value::Int(1)), ("y", Value::Float(2.0))]).unwrap();
        let b = Row::from_pairs([("x", Value::Int(1)), ("y", Value::Float(2.0))]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn nan_rows_compare_equal() {
        let a = Row::from_pairs([("x", Value::Float(f64::NAN))]).unwrap();
        let b = Row::from_pairs([("x", Value::Float(f64::NAN))]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn rows_key_hash_sets() {
        let mut seen = HashSet::new();
        let a = Row::from_pairs([("x", Value::Int(1))]).unwrap();
        let b = Row::from_pairs([("x", Value::Int(1))]).unwrap();
        let c = Row::from_pairs([("x", Value::Int(2))]).unwrap();

        assert!(seen.insert(a));
        assert!(!seen.insert(b));
        assert!(seen.insert(c));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn different_columns_not_equal() {
        let a = Row::from_pairs([("x", Value::Int(1))]).unwrap();
        let b = Row::from_pairs([("y", Value::Int(1))]).unwrap();
        assert_ne!(a, b);
    }
}
