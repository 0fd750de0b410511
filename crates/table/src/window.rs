//! Time windows over a table.
//!
//! Every row has exactly one time: the value of the window's time field
//! (DateTime, ISO-8601 string, or epoch seconds), or its ingestion time when
//! that field is absent or unparseable.

use crate::reducer::Aggregates;
use crate::table::Table;
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::{fields, Record, Value};

/// Index of a tumbling window: `floor(time / size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey(pub i64);

impl WindowKey {
    /// The window containing `millis` for windows of `size` milliseconds.
    #[inline]
    pub fn of(millis: i64, size: i64) -> Self {
        WindowKey(millis.div_euclid(size))
    }

    /// Inclusive start of the window.
    #[inline]
    pub fn start(self, size: i64) -> i64 {
        self.0.saturating_mul(size)
    }

    /// Exclusive end of the window.
    #[inline]
    pub fn end(self, size: i64) -> i64 {
        self.start(size).saturating_add(size)
    }
}

/// The rows that fell into one tumbling window.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowBucket {
    pub key: WindowKey,
    /// Inclusive start, epoch milliseconds.
    pub start: i64,
    /// Exclusive end, epoch milliseconds.
    pub end: i64,
    /// Rows in table order.
    pub rows: Vec<Record>,
}

/// Tumbling windows of a fixed size.
#[derive(Clone, Debug)]
pub struct WindowedView {
    source: Table,
    time_field: String,
    size: i64,
}

impl WindowedView {
    pub(crate) fn new(source: Table, time_field: String, size: i64) -> Self {
        Self {
            source,
            time_field,
            size,
        }
    }

    /// Window size in milliseconds.
    pub fn size_millis(&self) -> i64 {
        self.size
    }

    pub fn time_field(&self) -> &str {
        &self.time_field
    }

    fn buckets(&self) -> BTreeMap<WindowKey, Vec<Arc<Record>>> {
        let mut buckets: BTreeMap<WindowKey, Vec<Arc<Record>>> = BTreeMap::new();
        for row in self.source.rows() {
            let key = WindowKey::of(row.time_millis(&self.time_field), self.size);
            buckets.entry(key).or_default().push(row);
        }
        buckets
    }

    /// Splits the current rows into non-empty windows ordered by start.
    pub fn partition(&self) -> Vec<WindowBucket> {
        self.buckets()
            .into_iter()
            .map(|(key, rows)| WindowBucket {
                key,
                start: key.start(self.size),
                end: key.end(self.size),
                rows: rows.iter().map(|r| Record::clone(r)).collect(),
            })
            .collect()
    }

    /// Reduces each non-empty window independently.
    ///
    /// Each output row holds `window_start` and `window_end` followed by the
    /// aggregates, ordered by window start.
    pub fn reduce(&self, aggregates: &Aggregates) -> Vec<Record> {
        let output: Vec<Record> = self
            .buckets()
            .into_iter()
            .map(|(key, rows)| {
                let refs: Vec<&Record> = rows.iter().map(|r| r.as_ref()).collect();
                let mut record = Record::derived(vec![
                    (fields::WINDOW_START.to_string(), Value::DateTime(key.start(self.size))),
                    (fields::WINDOW_END.to_string(), Value::DateTime(key.end(self.size))),
                ]);
                for (name, value) in aggregates.evaluate(&refs) {
                    record.set(name, value);
                }
                record
            })
            .collect();
        tracing::debug!(size_ms = self.size, windows = output.len(), "reduced tumbling windows");
        output
    }
}

/// The rows of the last `duration`, relative to the table clock.
#[derive(Clone, Debug)]
pub struct TrailingWindow {
    source: Table,
    time_field: String,
    duration: i64,
}

impl TrailingWindow {
    pub(crate) fn new(source: Table, time_field: String, duration: i64) -> Self {
        Self {
            source,
            time_field,
            duration,
        }
    }

    /// Window length in milliseconds.
    pub fn duration_millis(&self) -> i64 {
        self.duration
    }

    /// Earliest time still inside the window, as of now.
    pub fn cutoff(&self) -> i64 {
        self.source.clock().now_millis().saturating_sub(self.duration)
    }

    fn current_rows(&self) -> Vec<Arc<Record>> {
        let cutoff = self.cutoff();
        self.source
            .rows()
            .into_iter()
            .filter(|row| row.time_millis(&self.time_field) >= cutoff)
            .collect()
    }

    /// Rows whose time is at or after the cutoff, in table order.
    pub fn rows(&self) -> Vec<Record> {
        self.current_rows().iter().map(|r| Record::clone(r)).collect()
    }

    /// A single aggregate over the rows currently inside the window.
    pub fn reduce(&self, aggregates: &Aggregates) -> Record {
        let rows = self.current_rows();
        let refs: Vec<&Record> = rows.iter().map(|r| r.as_ref()).collect();
        Record::derived(aggregates.evaluate(&refs))
    }
}
