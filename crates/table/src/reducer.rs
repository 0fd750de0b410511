//! Reducer library.
//!
//! A reducer maps a sequence of rows to one value. Every reducer inside an
//! [`Aggregates`] list sees the same rows and is evaluated independently.
//!
//! Missing data is tolerated rather than reported: sums of nothing are 0,
//! min/max of nothing are 0, averages of nothing are 0.

use crate::operators::RowPredicate;
use crate::streaming;
use std::fmt;
use std::sync::Arc;
use tally_core::{Record, RowResult, Value};

/// Anything that can reduce a row sequence to a value.
///
/// Grouped, windowed and whole-table reductions only depend on this trait.
pub trait Aggregator: Send + Sync {
    /// Reduces `rows` (in table order) to a single value.
    fn aggregate(&self, rows: &[&Record]) -> Value;
}

impl<F> Aggregator for F
where
    F: Fn(&[&Record]) -> Value + Send + Sync,
{
    fn aggregate(&self, rows: &[&Record]) -> Value {
        self(rows)
    }
}

/// The built-in reducers.
#[derive(Clone)]
pub enum Reducer {
    /// Sum of the numeric values of a field (Float64).
    Sum(String),
    /// Number of rows (Int64).
    Count,
    /// Mean of the numeric values of a field (Float64).
    Avg(String),
    /// Smallest non-null value of a field.
    Min(String),
    /// Largest non-null value of a field.
    Max(String),
    /// Non-null values of a field in row order (List).
    Collect(String),
    /// Mean of the last `window` values (missing values read as 0).
    MovingAverage { field: String, window: usize },
    /// Change per row over the last ten values.
    RateOfChange(String),
    /// Whether the last value spikes above `threshold` times the recent mean.
    DetectSpike { field: String, threshold: f64 },
    /// Applies `inner` only to rows accepted by `predicate`.
    Filtered {
        predicate: RowPredicate,
        inner: Box<Reducer>,
    },
    /// Caller-defined reduction.
    Custom(Arc<dyn Aggregator>),
}

impl Reducer {
    pub fn sum(field: impl Into<String>) -> Self {
        Reducer::Sum(field.into())
    }

    pub fn count() -> Self {
        Reducer::Count
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Reducer::Avg(field.into())
    }

    pub fn min(field: impl Into<String>) -> Self {
        Reducer::Min(field.into())
    }

    pub fn max(field: impl Into<String>) -> Self {
        Reducer::Max(field.into())
    }

    pub fn collect(field: impl Into<String>) -> Self {
        Reducer::Collect(field.into())
    }

    pub fn moving_average(field: impl Into<String>, window: usize) -> Self {
        Reducer::MovingAverage {
            field: field.into(),
            window,
        }
    }

    pub fn rate_of_change(field: impl Into<String>) -> Self {
        Reducer::RateOfChange(field.into())
    }

    pub fn detect_spike(field: impl Into<String>, threshold: f64) -> Self {
        Reducer::DetectSpike {
            field: field.into(),
            threshold,
        }
    }

    /// Wraps a caller-defined aggregation.
    pub fn custom<A>(aggregator: A) -> Self
    where
        A: Aggregator + 'static,
    {
        Reducer::Custom(Arc::new(aggregator))
    }

    /// Restricts this reducer to rows accepted by `predicate`.
    ///
    /// Rows for which the predicate skips are left out.
    pub fn filtered<P>(self, predicate: P) -> Self
    where
        P: Fn(&Record) -> RowResult<bool> + Send + Sync + 'static,
    {
        Reducer::Filtered {
            predicate: Arc::new(predicate),
            inner: Box::new(self),
        }
    }

    /// Restricts this reducer to rows whose `field` equals `value`.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        self.filtered(move |row| Ok(row.lookup(&field) == value))
    }
}

/// Numeric values of `field`, skipping rows where it is absent or not a number.
fn numbers(rows: &[&Record], field: &str) -> Vec<f64> {
    rows.iter().filter_map(|row| row.number(field)).collect()
}

/// Numeric values of `field` in row order, missing values as 0.
fn numbers_or_zero(rows: &[&Record], field: &str) -> Vec<f64> {
    rows.iter().map(|row| row.number(field).unwrap_or(0.0)).collect()
}

/// Non-null values of `field` in row order.
fn present<'a>(rows: &[&'a Record], field: &str) -> Vec<&'a Value> {
    rows.iter()
        .copied()
        .filter_map(|row: &'a Record| row.get(field))
        .filter(|value| !value.is_null())
        .collect()
}

impl Aggregator for Reducer {
    fn aggregate(&self, rows: &[&Record]) -> Value {
        match self {
            Reducer::Sum(field) => Value::Float64(numbers(rows, field).iter().sum()),
            Reducer::Count => Value::Int64(rows.len() as i64),
            Reducer::Avg(field) => {
                let values = numbers(rows, field);
                if values.is_empty() {
                    Value::Float64(0.0)
                } else {
                    Value::Float64(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            Reducer::Min(field) => present(rows, field)
                .into_iter()
                .min()
                .cloned()
                .unwrap_or(Value::Int64(0)),
            Reducer::Max(field) => present(rows, field)
                .into_iter()
                .max()
                .cloned()
                .unwrap_or(Value::Int64(0)),
            Reducer::Collect(field) => Value::List(present(rows, field).into_iter().cloned().collect()),
            Reducer::MovingAverage { field, window } => {
                Value::Float64(streaming::moving_average(&numbers_or_zero(rows, field), *window))
            }
            Reducer::RateOfChange(field) => {
                Value::Float64(streaming::rate_of_change(&numbers_or_zero(rows, field)))
            }
            Reducer::DetectSpike { field, threshold } => {
                Value::Boolean(streaming::detect_spike(&numbers_or_zero(rows, field), *threshold))
            }
            Reducer::Filtered { predicate, inner } => {
                let subset: Vec<&Record> = rows
                    .iter()
                    .copied()
                    .filter(|row| matches!(predicate(*row), Ok(true)))
                    .collect();
                inner.aggregate(&subset)
            }
            Reducer::Custom(aggregator) => aggregator.aggregate(rows),
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum(field) => write!(f, "sum({})", field),
            Reducer::Count => write!(f, "count()"),
            Reducer::Avg(field) => write!(f, "avg({})", field),
            Reducer::Min(field) => write!(f, "min({})", field),
            Reducer::Max(field) => write!(f, "max({})", field),
            Reducer::Collect(field) => write!(f, "collect({})", field),
            Reducer::MovingAverage { field, window } => write!(f, "moving_average({}, {})", field, window),
            Reducer::RateOfChange(field) => write!(f, "rate_of_change({})", field),
            Reducer::DetectSpike { field, threshold } => write!(f, "detect_spike({}, {})", field, threshold),
            Reducer::Filtered { inner, .. } => write!(f, "{:?} where ..", inner),
            Reducer::Custom(_) => write!(f, "custom(..)"),
        }
    }
}

/// Named reducers evaluated together by one `reduce` call.
#[derive(Clone, Debug, Default)]
pub struct Aggregates {
    named: Vec<(String, Reducer)>,
}

impl Aggregates {
    /// Creates an empty aggregate list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named reducer; a later reducer with the same name replaces it.
    pub fn with(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        let name = name.into();
        match self.named.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = reducer,
            None => self.named.push((name, reducer)),
        }
        self
    }

    /// Returns the output names in order.
    pub fn names(&self) -> Vec<&str> {
        self.named.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the number of reducers.
    #[inline]
    pub fn len(&self) -> usize {
        self.named.len()
    }

    /// Returns true if there are no reducers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Evaluates every reducer against the same rows.
    pub fn evaluate(&self, rows: &[&Record]) -> Vec<(String, Value)> {
        self.named
            .iter()
            .map(|(name, reducer)| (name.clone(), reducer.aggregate(rows)))
            .collect()
    }
}
