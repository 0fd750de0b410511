//! Tally Reactive - ingestion and change subscriptions.
//!
//! This crate puts a push-style read path on top of `tally-table`. Records
//! enter through a `ConnectorSubject`, which appends them to its root table
//! and then recomputes every subscriber's view and hands it over.
//!
//! # Core Concepts
//!
//! - `ConnectorSubject`: the ingestion endpoint, safe to share between threads
//! - `View`: what to recompute after each ingest (`ReduceView`,
//!   `GroupReduceView`, `TumblingView`, `TrailingView`, or any closure)
//! - `ChangeNotification`: the appended record plus the recomputed view
//! - `SubscriptionManager`: id-keyed registry of view/callback pairs
//!
//! There is no debouncing: every ingest fires every subscriber once.

pub mod connector;
pub mod notification;
pub mod subscription;
pub mod view;

pub use connector::{ConnectorSubject, IngestHook};
pub use notification::ChangeNotification;
pub use subscription::{Delivery, Subscription, SubscriptionId, SubscriptionManager};
pub use view::{GroupReduceView, ReduceView, TrailingView, TumblingView, View};

// Re-export commonly used types from dependencies
pub use tally_table::{Aggregates, Reducer, Table};
