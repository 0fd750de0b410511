//! The engine context: one root table, its ingestion endpoint and the
//! configured aggregation strategy.

use crate::config::EngineConfig;
use crate::metrics::{round_to, CategorySummary, EngineInfo, FinancialMetrics, Totals, TrailingSummary, TumblingSummary};
use crate::query::{QueryResult, QuerySpec};
use crate::strategy::{strategy_for, AggregationStrategy};
use crate::transaction::Transaction;
use chrono::FixedOffset;
use serde_json::Value as Json;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tally_core::time::format_millis;
use tally_core::{fields, Record, Result, SequenceId, SharedClock, SystemClock, Value};
use tally_reactive::{ChangeNotification, ConnectorSubject, SubscriptionId, View};
use tally_table::Table;

#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    naive_offset: FixedOffset,
    connector: ConnectorSubject,
    strategy: Arc<dyn AggregationStrategy>,
}

/// Owns the transaction table and answers queries over it.
///
/// Construct one per process and hand clones to whichever components need
/// it; clones share the same table and subscriptions.
///
/// # Example
///
/// ```rust
/// use tally_engine::{EngineConfig, EngineContext, QuerySpec, Transaction};
///
/// let engine = EngineContext::new(EngineConfig::default()).unwrap();
/// engine.ingest(Transaction::income(5000.0, "Salary")).unwrap();
/// engine.ingest(Transaction::expense(1500.0, "Rent")).unwrap();
///
/// let result = engine.query(&QuerySpec::Metrics).unwrap();
/// assert_eq!(result.metrics().map(|m| m.balance), Some(3500.0));
/// ```
#[derive(Clone, Debug)]
pub struct EngineContext {
    inner: Arc<EngineInner>,
}

impl EngineContext {
    /// Creates an engine on the system clock.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Creates an engine that reads time from `clock`.
    pub fn with_clock(config: EngineConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let naive_offset = config.naive_time_offset()?;
        let strategy: Arc<dyn AggregationStrategy> = Arc::from(strategy_for(config.strategy));
        let connector = ConnectorSubject::with_clock(clock);
        let hook = Arc::clone(&strategy);
        connector.add_ingest_hook(move |stored| hook.on_ingest(stored));
        tracing::info!(
            strategy = strategy.name(),
            trailing_minutes = config.trailing_window_minutes,
            tumbling_minutes = config.tumbling_window_minutes,
            "engine started"
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                naive_offset,
                connector,
                strategy,
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The ingestion endpoint, for subscribing to raw table views. Records
    /// ingested here skip transaction validation but are otherwise treated
    /// like [`ingest`](EngineContext::ingest).
    pub fn connector(&self) -> &ConnectorSubject {
        &self.inner.connector
    }

    /// The transaction table. Appends through it reach the strategy and
    /// every subscriber.
    pub fn table(&self) -> &Table {
        self.inner.connector.table()
    }

    /// Validates and stores a transaction, then notifies subscribers.
    pub fn ingest(&self, transaction: Transaction) -> Result<SequenceId> {
        if let Err(err) = transaction.validate() {
            tracing::warn!(error = %err, "rejected transaction");
            return Err(err);
        }
        self.inner.ingest_record(transaction.to_record_in(self.inner.naive_offset))
    }

    /// Decodes a JSON transaction and ingests it.
    pub fn ingest_json(&self, json: &Json) -> Result<SequenceId> {
        match Transaction::from_json(json) {
            Ok(transaction) => self.ingest(transaction),
            Err(err) => {
                tracing::warn!(error = %err, "rejected transaction");
                Err(err)
            }
        }
    }

    /// Computes the current answer to `spec`.
    pub fn query(&self, spec: &QuerySpec) -> Result<QueryResult> {
        self.inner.query(spec)
    }

    /// Parses and runs a query such as `"windowed:10"`.
    pub fn query_str(&self, text: &str) -> Result<QueryResult> {
        self.query(&QuerySpec::parse(text)?)
    }

    /// Calls `on_change` with the fresh answer to `spec` after every ingest.
    pub fn subscribe<F>(&self, spec: QuerySpec, on_change: F) -> Result<SubscriptionId>
    where
        F: Fn(&ChangeNotification<QueryResult>) + Send + Sync + 'static,
    {
        spec.validate()?;
        let view = QueryView {
            engine: Arc::downgrade(&self.inner),
            spec,
        };
        let id = self.inner.connector.subscribe(view, move |note: &ChangeNotification<Option<QueryResult>>| {
            if let Some(result) = &note.result {
                on_change(&ChangeNotification {
                    record: note.record.clone(),
                    result: result.clone(),
                    is_addition: note.is_addition,
                    time: note.time,
                });
            }
        });
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.connector.unsubscribe(id)
    }
}

impl EngineInner {
    fn ingest_record(&self, record: Record) -> Result<SequenceId> {
        self.connector.ingest(record).map_err(|err| {
            tracing::warn!(error = %err, "rejected record");
            err
        })
    }

    fn query(&self, spec: &QuerySpec) -> Result<QueryResult> {
        spec.validate()?;
        let table = self.connector.table();
        let result = match *spec {
            QuerySpec::Metrics => {
                let totals = self.strategy.totals(table);
                QueryResult::Metrics(FinancialMetrics::from_totals(&totals, &self.config.risk))
            }
            QuerySpec::Categories => QueryResult::Categories(
                self.strategy
                    .categories(table)
                    .iter()
                    .map(|(name, totals)| CategorySummary::from_totals(name.as_str(), totals))
                    .collect(),
            ),
            QuerySpec::Trailing { minutes } => {
                let minutes = minutes.unwrap_or(self.config.trailing_window_minutes);
                let window = table.trailing(&self.config.time_field, minutes_to_duration(minutes))?;
                let totals = Totals::from_record(&window.reduce(&Totals::aggregates()));
                QueryResult::Trailing(TrailingSummary::from_totals(minutes, &totals))
            }
            QuerySpec::Tumbling { minutes } => {
                let minutes = minutes.unwrap_or(self.config.tumbling_window_minutes);
                let windows = table.window_by(&self.config.time_field, minutes_to_duration(minutes))?;
                QueryResult::Tumbling(
                    windows
                        .reduce(&Totals::aggregates())
                        .iter()
                        .map(tumbling_summary)
                        .collect(),
                )
            }
            QuerySpec::Transactions => QueryResult::Transactions(table.snapshot()),
            QuerySpec::Info => QueryResult::Info(EngineInfo {
                strategy: self.strategy.name().to_string(),
                event_count: self.connector.event_count(),
                events_per_minute: round_to(self.connector.event_rate_per_minute(), 2),
                subscription_count: self.connector.subscription_count(),
                transaction_count: table.len(),
                trailing_window_minutes: self.config.trailing_window_minutes,
                tumbling_window_minutes: self.config.tumbling_window_minutes,
            }),
        };
        tracing::debug!(query = %spec, "answered query");
        Ok(result)
    }
}

fn minutes_to_duration(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

fn tumbling_summary(row: &Record) -> TumblingSummary {
    let bound = |name: &str| match row.get(name) {
        Some(Value::DateTime(ms)) => format_millis(*ms),
        _ => String::new(),
    };
    let totals = Totals::from_record(row);
    TumblingSummary {
        window_start: bound(fields::WINDOW_START),
        window_end: bound(fields::WINDOW_END),
        income: round_to(totals.income, 2),
        expenses: round_to(totals.expenses, 2),
        net: round_to(totals.net(), 2),
        transaction_count: totals.count,
    }
}

/// A query re-run after every ingest.
///
/// Holds the engine weakly so a subscription does not keep it alive.
struct QueryView {
    engine: Weak<EngineInner>,
    spec: QuerySpec,
}

impl View for QueryView {
    type Output = Option<QueryResult>;

    fn evaluate(&self, _table: &Table) -> Option<QueryResult> {
        let engine = self.engine.upgrade()?;
        match engine.query(&self.spec) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(query = %self.spec, error = %err, "subscription query failed");
                None
            }
        }
    }
}
