//! Column projection for `select` and `with_columns`.

use super::SkippedRow;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use tally_core::{ComputationSkipped, Record, RowResult, Value};

/// Shareable per-row extractor.
pub type Extractor = Arc<dyn Fn(&Record) -> RowResult<Value> + Send + Sync>;

/// How a single output column is produced.
#[derive(Clone)]
pub enum Column {
    /// Copies a field from the source row (including the metadata pseudo-fields).
    Field(String),
    /// The same value on every row.
    Constant(Value),
    /// Computed from the source row; may skip.
    Computed(Extractor),
}

impl Column {
    /// Creates a computed column from a closure.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Record) -> RowResult<Value> + Send + Sync + 'static,
    {
        Column::Computed(Arc::new(f))
    }

    /// Evaluates this column against one row.
    pub fn evaluate(&self, row: &Record) -> RowResult<Value> {
        match self {
            Column::Field(name) => match row.lookup(name) {
                Value::Null if !row.contains(name) => Err(ComputationSkipped::missing(name.as_str())),
                value => Ok(value),
            },
            Column::Constant(value) => Ok(value.clone()),
            Column::Computed(f) => f(row),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Column::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Column::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Ordered list of named output columns.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    columns: Vec<(String, Column)>,
}

impl Projection {
    /// Creates an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column; a later column with the same name replaces the earlier one.
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = column,
            None => self.columns.push((name, column)),
        }
        self
    }

    /// Copies `source` from the input row into `name`.
    pub fn field(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.column(name, Column::Field(source.into()))
    }

    /// Sets `name` to a constant.
    pub fn constant(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.column(name, Column::Constant(value.into()))
    }

    /// Computes `name` from the input row.
    pub fn computed<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> RowResult<Value> + Send + Sync + 'static,
    {
        self.column(name, Column::computed(f))
    }

    /// Returns the output column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no columns are defined.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }
}

/// Whether projected columns replace the row or extend it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Output rows hold exactly the projected columns (`select`).
    Replace,
    /// Output rows are the source row merged with the projected columns (`with_columns`).
    Extend,
}

/// Projects every row, nulling fields whose extractor skipped.
///
/// Output rows keep the source row's sequence id and ingestion time.
pub fn project_rows<R>(
    rows: &[R],
    projection: &Projection,
    mode: ProjectionMode,
) -> (Vec<Record>, Vec<SkippedRow>)
where
    R: Borrow<Record>,
{
    let mut output = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    for row in rows {
        let row: &Record = row.borrow();
        let mut projected = match mode {
            ProjectionMode::Replace => Record::new().with_lineage(row),
            ProjectionMode::Extend => row.clone(),
        };
        for (name, column) in projection.columns() {
            let value = match column.evaluate(row) {
                Ok(value) => value,
                Err(reason) => {
                    tracing::trace!(sequence_id = row.sequence_id(), column = %name, %reason, "projection skipped field");
                    skipped.push(SkippedRow::new(row.sequence_id(), reason.in_field(name.as_str())));
                    Value::Null
                }
            };
            projected.set(name.clone(), value);
        }
        output.push(projected);
    }
    (output, skipped)
}

/// Builds a column by applying `f` to the values of `fields`.
///
/// Missing fields are passed as `Value::Null`.
pub fn apply<F>(fields: &[&str], f: F) -> Column
where
    F: Fn(&[Value]) -> RowResult<Value> + Send + Sync + 'static,
{
    let fields: Vec<String> = fields.iter().map(|s| s.to_string()).collect();
    Column::computed(move |row| {
        let args: Vec<Value> = fields.iter().map(|name| row.lookup(name)).collect();
        f(&args)
    })
}

/// Builds a column that yields `if_true` when `condition` is truthy on the
/// row and `if_false` otherwise.
pub fn if_else(condition: &str, if_true: impl Into<Value>, if_false: impl Into<Value>) -> Column {
    let condition = condition.to_string();
    let if_true = if_true.into();
    let if_false = if_false.into();
    Column::computed(move |row| {
        if row.lookup(&condition).is_truthy() {
            Ok(if_true.clone())
        } else {
            Ok(if_false.clone())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(seq: u64, kind: &str, amount: f64) -> Record {
        Record::new()
            .with("type", kind)
            .with("amount", amount)
            .with("category", "Food")
            .with_metadata(seq, 1_000)
    }

    fn signed_amount(row: &Record) -> RowResult<Value> {
        let amount = row.require_number("amount")?;
        match row.require_str("type")? {
            "income" => Ok(Value::Float64(amount)),
            "expense" => Ok(Value::Float64(-amount)),
            other => Err(ComputationSkipped::new(format!("unknown type {}", other))),
        }
    }

    #[test]
    fn test_select_replaces_fields() {
        let rows = vec![txn(1, "income", 10.0)];
        let projection = Projection::new()
            .field("cat", "category")
            .constant("source", "bank")
            .computed("signed", signed_amount);
        let (out, skipped) = project_rows(&rows, &projection, ProjectionMode::Replace);

        assert!(skipped.is_empty());
        assert_eq!(out[0].field_names(), vec!["cat", "source", "signed"]);
        assert_eq!(out[0].str("cat"), Some("Food"));
        assert_eq!(out[0].number("signed"), Some(10.0));
        assert_eq!(out[0].sequence_id(), 1);
    }

    #[test]
    fn test_with_columns_extends() {
        let rows = vec![txn(1, "expense", 4.0)];
        let projection = Projection::new().computed("signed", signed_amount);
        let (out, _) = project_rows(&rows, &projection, ProjectionMode::Extend);

        assert_eq!(out[0].len(), 4);
        assert_eq!(out[0].number("signed"), Some(-4.0));
        assert_eq!(out[0].number("amount"), Some(4.0));
    }

    #[test]
    fn test_failed_extractor_nulls_field() {
        let rows = vec![txn(1, "refund", 4.0), txn(2, "income", 3.0)];
        let projection = Projection::new().computed("signed", signed_amount);
        let (out, skipped) = project_rows(&rows, &projection, ProjectionMode::Extend);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("signed"), Some(&Value::Null));
        assert_eq!(out[1].number("signed"), Some(3.0));
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].sequence_id, 1);
        assert_eq!(skipped[0].skipped.field.as_deref(), Some("signed"));
    }

    #[test]
    fn test_missing_field_column_is_skipped() {
        let rows = vec![txn(1, "income", 1.0)];
        let projection = Projection::new().field("note", "description");
        let (out, skipped) = project_rows(&rows, &projection, ProjectionMode::Replace);
        assert_eq!(out[0].get("note"), Some(&Value::Null));
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_metadata_field_column() {
        let rows = vec![txn(9, "income", 1.0)];
        let projection = Projection::new().field("id", "sequence_id");
        let (out, skipped) = project_rows(&rows, &projection, ProjectionMode::Replace);
        assert!(skipped.is_empty());
        assert_eq!(out[0].get("id"), Some(&Value::Int64(9)));
    }

    #[test]
    fn test_apply_and_if_else() {
        let row = txn(1, "income", 10.0).with("recurring", true);
        let doubled = apply(&["amount"], |args| {
            args[0]
                .as_number()
                .map(|n| Value::Float64(n * 2.0))
                .ok_or_else(|| ComputationSkipped::new("not a number"))
        });
        assert_eq!(doubled.evaluate(&row), Ok(Value::Float64(20.0)));

        let label = if_else("recurring", "fixed", "one-off");
        assert_eq!(label.evaluate(&row), Ok(Value::String("fixed".into())));
        assert_eq!(
            label.evaluate(&txn(2, "income", 1.0)),
            Ok(Value::String("one-off".into()))
        );
    }

    #[test]
    fn test_projection_replaces_duplicate_name() {
        let projection = Projection::new().constant("a", 1i64).constant("a", 2i64);
        assert_eq!(projection.len(), 1);
        assert_eq!(projection.names(), vec!["a"]);
    }
}
