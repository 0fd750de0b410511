//! The ingestion endpoint.

use crate::notification::ChangeNotification;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use crate::view::View;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_core::{Record, Result, SequenceId, SharedClock, SystemClock};
use tally_table::{AppendListener, Table};

/// Floor for the elapsed time used by `event_rate_per_minute`.
const MIN_ELAPSED_MINUTES: f64 = 0.01;

/// Runs on every stored record before subscribers are notified.
pub type IngestHook = Arc<dyn Fn(&Record) + Send + Sync>;

/// Listens on the root table and fans each append out to the hooks and
/// subscriptions.
struct Fanout {
    table: Table,
    subscriptions: Mutex<SubscriptionManager>,
    hooks: RwLock<Vec<IngestHook>>,
    events: AtomicU64,
}

impl AppendListener for Fanout {
    fn on_append(&self, record: &Record) {
        self.events.fetch_add(1, Ordering::SeqCst);
        let hooks = self.hooks.read().clone();
        for hook in &hooks {
            hook(record);
        }

        let subscribers = self.subscriptions.lock().snapshot();
        tracing::debug!(
            sequence_id = record.sequence_id(),
            subscribers = subscribers.len(),
            "notifying subscribers"
        );
        for subscription in &subscribers {
            subscription.notify(&self.table, record);
        }
    }
}

/// Appends records to a root table and notifies subscribers.
///
/// The subject listens on its root table, so an append made through
/// [`table`](ConnectorSubject::table) or any clone of it is counted and
/// delivered exactly like one made through
/// [`ingest`](ConnectorSubject::ingest).
///
/// Every method takes `&self`; share a subject between threads with `Arc`.
/// Callbacks are invoked on the appending thread after the table and
/// registry locks have been released, so a callback may ingest or subscribe
/// itself.
///
/// # Example
///
/// ```rust
/// use tally_core::Record;
/// use tally_reactive::{ConnectorSubject, ReduceView};
/// use tally_table::{Aggregates, Reducer};
///
/// let subject = ConnectorSubject::new();
/// subject.subscribe(
///     ReduceView::new(Aggregates::new().with("total", Reducer::sum("amount"))),
///     |note| println!("total is now {:?}", note.first().and_then(|r| r.number("total"))),
/// );
/// subject.ingest(Record::new().with("amount", 12.5)).unwrap();
/// subject.table().append(Record::new().with("amount", 2.5)).unwrap();
/// assert_eq!(subject.event_count(), 2);
/// ```
pub struct ConnectorSubject {
    fanout: Arc<Fanout>,
    started_at: i64,
}

impl fmt::Debug for ConnectorSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorSubject")
            .field("table", &self.fanout.table)
            .field("subscriptions", &self.subscription_count())
            .field("events", &self.event_count())
            .finish()
    }
}

impl Default for ConnectorSubject {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorSubject {
    /// Creates a subject over an empty table on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates a subject whose table reads time from `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        let started_at = clock.now_millis();
        let fanout = Arc::new(Fanout {
            table: Table::with_clock(clock),
            subscriptions: Mutex::new(SubscriptionManager::new()),
            hooks: RwLock::new(Vec::new()),
            events: AtomicU64::new(0),
        });
        let listener: Arc<dyn AppendListener> = fanout.clone();
        fanout.table.set_listener(Arc::downgrade(&listener));
        Self { fanout, started_at }
    }

    /// Appends `record` to the root table and notifies every subscriber.
    ///
    /// Each subscriber's view is recomputed after the append, so the result
    /// reflects this record and everything before it.
    pub fn ingest(&self, record: Record) -> Result<SequenceId> {
        self.fanout.table.append(record)
    }

    /// Registers `hook` to run on every stored record, after the append and
    /// before any subscriber is notified.
    pub fn add_ingest_hook<H>(&self, hook: H)
    where
        H: Fn(&Record) + Send + Sync + 'static,
    {
        self.fanout.hooks.write().push(Arc::new(hook));
    }

    /// Registers `on_change` to receive `view` after every ingest.
    pub fn subscribe<V, F>(&self, view: V, on_change: F) -> SubscriptionId
    where
        V: View + 'static,
        F: Fn(&ChangeNotification<V::Output>) + Send + Sync + 'static,
    {
        let id = self.fanout.subscriptions.lock().subscribe(view, on_change);
        tracing::debug!(subscription_id = id, "subscribed");
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.fanout.subscriptions.lock().unsubscribe(id)
    }

    /// The root table. Appends through it notify like `ingest`.
    pub fn table(&self) -> &Table {
        &self.fanout.table
    }

    /// Number of successful appends to the root table.
    pub fn event_count(&self) -> u64 {
        self.fanout.events.load(Ordering::SeqCst)
    }

    /// Ingests per minute since the subject was created.
    pub fn event_rate_per_minute(&self) -> f64 {
        let elapsed = (self.fanout.table.clock().now_millis() - self.started_at) as f64 / 60_000.0;
        self.event_count() as f64 / elapsed.max(MIN_ELAPSED_MINUTES)
    }

    pub fn subscription_count(&self) -> usize {
        self.fanout.subscriptions.lock().len()
    }
}
