//! Tally Engine - personal-finance queries over an ingested transaction stream.
//!
//! This crate is the surface collaborators talk to: an explicit
//! `EngineContext` owns the transaction table, validates and ingests
//! transactions, and answers named queries either on demand or by pushing
//! fresh results to subscribers after every ingest.
//!
//! # Queries
//!
//! - `metrics`: balance, totals, average transaction, risk level, health score
//! - `categories`: per-category income, expenses and net
//! - `windowed[:N]`: activity in the last N minutes
//! - `tumbling[:N]`: totals per N-minute window
//! - `transactions`: every stored transaction
//! - `info`: strategy, event count and rate, subscriptions
//!
//! Metrics and categories come from the configured `AggregationStrategy`;
//! windows are always recomputed from the table.

pub mod config;
pub mod context;
pub mod metrics;
pub mod query;
pub mod strategy;
pub mod transaction;

pub use config::{EngineConfig, RiskThresholds, StrategyKind};
pub use context::EngineContext;
pub use metrics::{
    CategorySummary, EngineInfo, FinancialMetrics, RiskLevel, Totals, TrailingSummary, TumblingSummary,
};
pub use query::{QueryResult, QuerySpec};
pub use strategy::{AggregationStrategy, RecomputeStrategy, RunningTotalsStrategy};
pub use transaction::{Transaction, TransactionKind, TransactionTime};

// Re-export commonly used types from dependencies
pub use tally_core::{Error, Result};
pub use tally_reactive::{ChangeNotification, SubscriptionId};
