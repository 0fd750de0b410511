//! Append-only tables.
//!
//! A `Table` is a handle to an insertion-ordered list of records behind a
//! single mutex. Cloning a `Table` yields another handle to the same rows.
//! Derived tables (`select`, `filter`, `with_columns`, `join`, grouped
//! reductions) are independent snapshots computed once at call time.

use crate::group::GroupedView;
use crate::operators::{filter_rows, nested_loop_join, project_rows, Projection, ProjectionMode, SkippedRow};
use crate::reducer::Aggregates;
use crate::window::{TrailingWindow, WindowedView};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tally_core::{fields, Error, Record, Result, RowResult, SequenceId, SharedClock, SystemClock, Value};

/// Observes every successful append to a table.
///
/// The listener runs on the appending thread after the table lock is
/// released, so it may read or append to the table itself.
pub trait AppendListener: Send + Sync {
    fn on_append(&self, record: &Record);
}

struct TableState {
    records: Vec<Arc<Record>>,
    next_sequence: SequenceId,
}

/// An ordered, append-only collection of records.
#[derive(Clone)]
pub struct Table {
    state: Arc<Mutex<TableState>>,
    clock: SharedClock,
    skipped: Arc<Vec<SkippedRow>>,
    listener: Arc<RwLock<Option<Weak<dyn AppendListener>>>>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("len", &self.len())
            .field("skipped", &self.skipped.len())
            .finish()
    }
}

impl Table {
    /// Creates an empty table on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates an empty table that reads time from `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(TableState {
                records: Vec::new(),
                next_sequence: 1,
            })),
            clock,
            skipped: Arc::new(Vec::new()),
            listener: Arc::new(RwLock::new(None)),
        }
    }

    /// Builds a derived table from already-computed rows.
    pub(crate) fn derived(records: Vec<Record>, clock: SharedClock, skipped: Vec<SkippedRow>) -> Self {
        let next_sequence = records
            .iter()
            .filter(|r| !r.is_derived())
            .map(|r| r.sequence_id())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: Arc::new(Mutex::new(TableState {
                records: records.into_iter().map(Arc::new).collect(),
                next_sequence,
            })),
            clock,
            skipped: Arc::new(skipped),
            listener: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the clock this table stamps and windows with.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Installs the listener told about every append through any handle to
    /// this table, replacing the previous one. Derived tables start without
    /// a listener.
    pub fn set_listener(&self, listener: Weak<dyn AppendListener>) {
        *self.listener.write() = Some(listener);
    }

    /// Appends a record, assigning its sequence id and ingestion time, then
    /// tells the table's listener (if any) about it.
    ///
    /// If the record carries an `amount`, it must be a number greater than
    /// zero; anything else is rejected with `Error::Validation` and the table
    /// is left unchanged.
    pub fn append(&self, record: Record) -> Result<SequenceId> {
        self.append_stamped(record).map(|r| r.sequence_id())
    }

    /// Like [`append`](Table::append), but returns the record as stored.
    pub fn append_stamped(&self, record: Record) -> Result<Record> {
        validate_amount(&record)?;
        let mut state = self.state.lock();
        let sequence_id = state.next_sequence;
        state.next_sequence += 1;
        let stamped = Arc::new(record.with_metadata(sequence_id, self.clock.now_millis()));
        state.records.push(stamped.clone());
        drop(state);
        tracing::debug!(sequence_id, "appended record");

        let stored = Record::clone(&stamped);
        let listener = self.listener.read().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            listener.on_append(&stored);
        }
        Ok(stored)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns true if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of every record in insertion order.
    pub fn snapshot(&self) -> Vec<Record> {
        self.rows().iter().map(|r| Record::clone(r)).collect()
    }

    /// Returns the most recently appended record.
    pub fn last(&self) -> Option<Record> {
        self.state.lock().records.last().map(|r| Record::clone(r))
    }

    /// Consistent view of the current rows. The lock is released before
    /// the caller sees them, so user code never runs under it.
    pub(crate) fn rows(&self) -> Vec<Arc<Record>> {
        self.state.lock().records.clone()
    }

    /// Row-level omissions recorded while this table was derived.
    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Returns true if both handles refer to the same rows.
    pub fn same_table(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// New table holding exactly the projected columns.
    pub fn select(&self, projection: &Projection) -> Table {
        self.project(projection, ProjectionMode::Replace)
    }

    /// New table holding each row extended with the projected columns.
    pub fn with_columns(&self, projection: &Projection) -> Table {
        self.project(projection, ProjectionMode::Extend)
    }

    fn project(&self, projection: &Projection, mode: ProjectionMode) -> Table {
        let rows = self.rows();
        let (records, skipped) = project_rows(&rows, projection, mode);
        tracing::debug!(?mode, rows = records.len(), skipped = skipped.len(), "derived projection");
        Table::derived(records, self.clock.clone(), skipped)
    }

    /// New table holding the rows for which `predicate` returns `Ok(true)`.
    ///
    /// A row whose predicate skips is left out and recorded in `skipped()`.
    pub fn filter<P>(&self, predicate: P) -> Table
    where
        P: Fn(&Record) -> RowResult<bool>,
    {
        let rows = self.rows();
        let (records, skipped) = filter_rows(&rows, predicate);
        tracing::debug!(rows = records.len(), skipped = skipped.len(), "derived filter");
        Table::derived(records, self.clock.clone(), skipped)
    }

    /// Shorthand for filtering on `field == value`.
    pub fn filter_eq(&self, field: &str, value: impl Into<Value>) -> Table {
        let value = value.into();
        self.filter(|row| Ok(row.lookup(field) == value))
    }

    /// Inner join with `other` on `self[left_key] == other[right_key]`.
    ///
    /// Each side is snapshotted on its own, so joining a table with itself
    /// is fine.
    pub fn join(&self, other: &Table, left_key: &str, right_key: &str) -> Table {
        let left = self.rows();
        let right = if self.same_table(other) {
            left.clone()
        } else {
            other.rows()
        };
        let records = nested_loop_join(&left, &right, left_key, right_key);
        tracing::debug!(left = left.len(), right = right.len(), rows = records.len(), "derived join");
        Table::derived(records, self.clock.clone(), Vec::new())
    }

    /// Groups rows by the given key fields.
    pub fn groupby(&self, keys: &[&str]) -> GroupedView {
        GroupedView::new(self.clone(), keys.iter().map(|k| k.to_string()).collect())
    }

    /// Tumbling windows of `duration` over the time read from `time_field`.
    pub fn window_by(&self, time_field: &str, duration: Duration) -> Result<WindowedView> {
        let size = window_millis(duration)?;
        Ok(WindowedView::new(self.clone(), time_field.to_string(), size))
    }

    /// The rows of the last `duration`, relative to the table clock.
    pub fn trailing(&self, time_field: &str, duration: Duration) -> Result<TrailingWindow> {
        let size = window_millis(duration)?;
        Ok(TrailingWindow::new(self.clone(), time_field.to_string(), size))
    }

    /// Reduces the whole table to a single derived record.
    pub fn reduce(&self, aggregates: &Aggregates) -> Record {
        let rows = self.rows();
        let refs: Vec<&Record> = rows.iter().map(|r| r.as_ref()).collect();
        Record::derived(aggregates.evaluate(&refs))
    }
}

fn validate_amount(record: &Record) -> Result<()> {
    match record.get(fields::AMOUNT) {
        None => Ok(()),
        Some(value) => match value.as_number() {
            Some(amount) if amount > 0.0 => Ok(()),
            Some(amount) => Err(Error::validation(
                fields::AMOUNT,
                format!("must be greater than zero, got {}", amount),
            )),
            None => Err(Error::validation(
                fields::AMOUNT,
                format!("must be a number, got {}", value),
            )),
        },
    }
}

fn window_millis(duration: Duration) -> Result<i64> {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    if millis == 0 {
        return Err(Error::invalid_operation("window duration must be at least one millisecond"));
    }
    Ok(millis)
}
