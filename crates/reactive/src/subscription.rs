//! Subscription management for ingest notifications.
//!
//! A subscription pairs a view with a callback. Both are erased into one
//! delivery closure at subscribe time, so views with different output types
//! can share a manager.

use crate::notification::ChangeNotification;
use crate::view::View;
use hashbrown::HashMap;
use parking_lot::ReentrantMutex;
use std::fmt;
use std::sync::Arc;
use tally_core::Record;
use tally_table::Table;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Recomputes a view and hands the notification to the callback.
pub type Delivery = Arc<dyn Fn(&Table, &Record) + Send + Sync>;

/// A registered view and callback.
///
/// Deliveries of one subscription are serialized: the view is evaluated and
/// the callback invoked under a per-subscription gate, so the last delivery
/// always reflects every append that preceded it. The gate is reentrant, so
/// a callback may still ingest into the same table.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    deliver: Delivery,
    gate: Arc<ReentrantMutex<()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    /// Creates a subscription that evaluates `view` and passes the result
    /// to `on_change`.
    pub fn new<V, F>(id: SubscriptionId, view: V, on_change: F) -> Self
    where
        V: View + 'static,
        F: Fn(&ChangeNotification<V::Output>) + Send + Sync + 'static,
    {
        let deliver = move |table: &Table, record: &Record| {
            let result = view.evaluate(table);
            on_change(&ChangeNotification::addition(record.clone(), result));
        };
        Self {
            id,
            deliver: Arc::new(deliver),
            gate: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Recomputes the view over `table` and notifies the callback that
    /// `record` was added.
    pub fn notify(&self, table: &Table, record: &Record) {
        let _turn = self.gate.lock();
        (self.deliver)(table, record);
    }
}

/// Manages the subscriptions of one connector.
#[derive(Debug)]
pub struct SubscriptionManager {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a view and callback, returning the id to unsubscribe with.
    pub fn subscribe<V, F>(&mut self, view: V, on_change: F) -> SubscriptionId
    where
        V: View + 'static,
        F: Fn(&ChangeNotification<V::Output>) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, view, on_change));
        id
    }

    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// The current subscriptions in subscription order.
    ///
    /// Callers notify from this copy after releasing whatever lock guards
    /// the manager.
    pub fn snapshot(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> = self.subscriptions.values().cloned().collect();
        subscriptions.sort_by_key(|s| s.id);
        subscriptions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
