//! Views: what a subscriber wants recomputed after each ingest.
//!
//! A view is evaluated against the whole root table every time, so its
//! result always reflects every record appended so far.

use std::time::Duration;
use tally_core::{Error, Record, Result};
use tally_table::{Aggregates, Table};

/// A computation over a table.
pub trait View: Send + Sync {
    /// The result handed to subscribers.
    type Output;

    /// Recomputes the view from the current table contents.
    fn evaluate(&self, table: &Table) -> Self::Output;
}

impl<F> View for F
where
    F: Fn(&Table) -> Vec<Record> + Send + Sync,
{
    type Output = Vec<Record>;

    fn evaluate(&self, table: &Table) -> Vec<Record> {
        self(table)
    }
}

/// The whole table reduced to one row.
#[derive(Clone, Debug)]
pub struct ReduceView {
    aggregates: Aggregates,
}

impl ReduceView {
    pub fn new(aggregates: Aggregates) -> Self {
        Self { aggregates }
    }
}

impl View for ReduceView {
    type Output = Vec<Record>;

    fn evaluate(&self, table: &Table) -> Vec<Record> {
        vec![table.reduce(&self.aggregates)]
    }
}

/// One row per group, in order of first appearance.
#[derive(Clone, Debug)]
pub struct GroupReduceView {
    keys: Vec<String>,
    aggregates: Aggregates,
}

impl GroupReduceView {
    pub fn new(keys: &[&str], aggregates: Aggregates) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            aggregates,
        }
    }
}

impl View for GroupReduceView {
    type Output = Vec<Record>;

    fn evaluate(&self, table: &Table) -> Vec<Record> {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        table.groupby(&keys).reduce(&self.aggregates).snapshot()
    }
}

fn check_duration(duration: Duration) -> Result<()> {
    if duration.as_millis() == 0 {
        return Err(Error::invalid_operation("window duration must be at least one millisecond"));
    }
    Ok(())
}

/// One row per non-empty tumbling window, ordered by window start.
#[derive(Clone, Debug)]
pub struct TumblingView {
    time_field: String,
    size: Duration,
    aggregates: Aggregates,
}

impl TumblingView {
    /// Fails with `Error::InvalidOperation` for a zero-length window.
    pub fn new(time_field: &str, size: Duration, aggregates: Aggregates) -> Result<Self> {
        check_duration(size)?;
        Ok(Self {
            time_field: time_field.to_string(),
            size,
            aggregates,
        })
    }
}

impl View for TumblingView {
    type Output = Vec<Record>;

    fn evaluate(&self, table: &Table) -> Vec<Record> {
        table
            .window_by(&self.time_field, self.size)
            .map(|windows| windows.reduce(&self.aggregates))
            .unwrap_or_default()
    }
}

/// A single row aggregating the last `duration` before now.
#[derive(Clone, Debug)]
pub struct TrailingView {
    time_field: String,
    duration: Duration,
    aggregates: Aggregates,
}

impl TrailingView {
    /// Fails with `Error::InvalidOperation` for a zero-length window.
    pub fn new(time_field: &str, duration: Duration, aggregates: Aggregates) -> Result<Self> {
        check_duration(duration)?;
        Ok(Self {
            time_field: time_field.to_string(),
            duration,
            aggregates,
        })
    }
}

impl View for TrailingView {
    type Output = Vec<Record>;

    fn evaluate(&self, table: &Table) -> Vec<Record> {
        table
            .trailing(&self.time_field, self.duration)
            .map(|window| vec![window.reduce(&self.aggregates)])
            .unwrap_or_default()
    }
}
