//! End-to-end scenarios through `EngineContext`.

use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tally_core::time::{format_millis, minutes};
use tally_core::{ManualClock, Record, Value};
use tally_engine::{
    EngineConfig, EngineContext, Error, QueryResult, QuerySpec, RiskLevel, StrategyKind, Transaction,
};
use tally_table::{Aggregates, Projection, Reducer};

const START: i64 = 1_700_000_000_000;

fn engine(strategy: StrategyKind) -> (EngineContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let config = EngineConfig::default().with_strategy(strategy);
    (EngineContext::with_clock(config, clock.clone()).unwrap(), clock)
}

fn both() -> [StrategyKind; 2] {
    [StrategyKind::Recompute, StrategyKind::RunningTotals]
}

#[test]
fn metrics_scenario() {
    for strategy in both() {
        let (engine, _) = engine(strategy);
        engine.ingest(Transaction::income(5000.0, "Salary")).unwrap();
        engine.ingest(Transaction::expense(1500.0, "Rent")).unwrap();

        let result = engine.query_str("metrics").unwrap();
        let metrics = result.metrics().unwrap();
        assert_eq!(metrics.balance, 3500.0);
        assert_eq!(metrics.total_income, 5000.0);
        assert_eq!(metrics.total_expenses, 1500.0);
        assert_eq!(metrics.transaction_count, 2);
        assert_eq!(metrics.risk_level, RiskLevel::Low);
        assert_eq!(metrics.financial_health_score, 70.0);

        let json = result.to_json();
        assert_eq!(json["balance"], 3500.0);
        assert_eq!(json["risk_level"], "LOW");
    }
}

#[test]
fn food_group_scenario() {
    let (engine, _) = engine(StrategyKind::Recompute);
    for (amount, kind) in [(10.0, "expense"), (20.0, "expense"), (30.0, "expense"), (5.0, "income")] {
        engine
            .ingest_json(&json!({"type": kind, "amount": amount, "category": "Food"}))
            .unwrap();
    }

    let grouped = engine.table().groupby(&["category"]).reduce(
        &Aggregates::new()
            .with("total_expenses", Reducer::sum("amount").where_eq("type", "expense"))
            .with("total_income", Reducer::sum("amount").where_eq("type", "income")),
    );
    let with_net = grouped.with_columns(&Projection::new().computed("net", |row| {
        Ok(Value::Float64(
            row.require_number("total_income")? - row.require_number("total_expenses")?,
        ))
    }));
    let food = &with_net.snapshot()[0];
    assert_eq!(food.str("category"), Some("Food"));
    assert_eq!(food.number("total_expenses"), Some(60.0));
    assert_eq!(food.number("total_income"), Some(5.0));
    assert_eq!(food.number("net"), Some(-55.0));

    let categories = engine.query(&QuerySpec::Categories).unwrap();
    let food = &categories.categories().unwrap()[0];
    assert_eq!((food.total_expenses, food.total_income, food.net), (60.0, 5.0, -55.0));
    assert_eq!(food.transaction_count, 4);
}

#[test]
fn trailing_window_follows_the_clock() {
    let (engine, clock) = engine(StrategyKind::Recompute);
    engine
        .ingest(Transaction::expense(120.0, "Food").with_timestamp(format_millis(START)))
        .unwrap();

    let recent = engine.query(&QuerySpec::Trailing { minutes: Some(5) }).unwrap();
    let summary = recent.trailing().unwrap();
    assert_eq!(summary.recent_transactions, 1);
    assert_eq!(summary.recent_expenses, 120.0);
    assert_eq!(summary.spending_rate_per_minute, 24.0);
    assert_eq!(summary.period_summary, "Net spending: -₹120.00");

    clock.advance(minutes(5) + 1);
    let later = engine.query_str("windowed:5").unwrap();
    assert_eq!(later.trailing().unwrap().recent_transactions, 0);
    assert_eq!(later.trailing().unwrap().period_summary, "No activity in last 5 minutes");
}

#[test]
fn trailing_window_without_timestamp_uses_ingestion_time() {
    let (engine, clock) = engine(StrategyKind::Recompute);
    engine.ingest(Transaction::income(50.0, "Gift")).unwrap();
    assert_eq!(engine.query_str("windowed").unwrap().trailing().unwrap().recent_transactions, 1);

    clock.advance(minutes(6));
    assert_eq!(engine.query_str("windowed").unwrap().trailing().unwrap().recent_transactions, 0);
}

#[test]
fn tumbling_windows() {
    let (engine, _) = engine(StrategyKind::Recompute);
    for (secs, amount) in [(0.0, 10.0), (120.0, 20.0), (301.0, 5.0)] {
        engine
            .ingest(Transaction::expense(amount, "Food").with_epoch_seconds(secs))
            .unwrap();
    }
    let result = engine.query_str("tumbling:5").unwrap();
    let windows = result.tumbling().unwrap();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].window_start, "1970-01-01T00:00:00.000Z");
    assert_eq!(windows[0].window_end, "1970-01-01T00:05:00.000Z");
    assert_eq!(windows[0].expenses, 30.0);
    assert_eq!(windows[0].transaction_count, 2);
    assert_eq!(windows[1].expenses, 5.0);
}

#[test]
fn rejected_transactions_leave_no_trace() {
    let (engine, _) = engine(StrategyKind::RunningTotals);
    assert!(matches!(
        engine.ingest(Transaction::expense(-5.0, "Food")),
        Err(Error::Validation { .. })
    ));
    assert!(matches!(
        engine.ingest_json(&json!({"type": "expense", "amount": "lots", "category": "Food"})),
        Err(Error::Parse { .. })
    ));
    assert!(engine.table().is_empty());

    let metrics = engine.query(&QuerySpec::Metrics).unwrap();
    assert_eq!(metrics.metrics().unwrap().transaction_count, 0);
    assert_eq!(engine.query(&QuerySpec::Info).unwrap().info().unwrap().event_count, 0);
}

#[test]
fn subscribers_see_fresh_metrics() {
    for strategy in both() {
        let (engine, _) = engine(strategy);
        let balances = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&balances);
        let id = engine
            .subscribe(QuerySpec::Metrics, move |note| {
                if let QueryResult::Metrics(metrics) = &note.result {
                    sink.lock().push((note.record.sequence_id(), metrics.balance));
                }
            })
            .unwrap();

        engine.ingest(Transaction::income(5000.0, "Salary")).unwrap();
        engine.ingest(Transaction::expense(1500.0, "Rent")).unwrap();
        assert!(engine.unsubscribe(id));
        engine.ingest(Transaction::expense(1.0, "Food")).unwrap();

        assert_eq!(*balances.lock(), vec![(1, 5000.0), (2, 3500.0)]);
    }
}

#[test]
fn root_table_appends_reach_strategy_and_subscribers() {
    let mut balances = Vec::new();
    for strategy in both() {
        let (engine, _) = engine(strategy);
        let notified = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&notified);
        engine
            .subscribe(QuerySpec::Metrics, move |_| *sink.lock() += 1)
            .unwrap();

        engine.ingest(Transaction::income(100.0, "Salary")).unwrap();
        let root = engine.table().clone();
        root.append(
            Record::new()
                .with("type", "expense")
                .with("amount", 40.0)
                .with("category", "Food"),
        )
        .unwrap();

        let result = engine.query(&QuerySpec::Metrics).unwrap();
        let metrics = result.metrics().unwrap();
        assert_eq!(metrics.transaction_count, 2);
        assert_eq!(*notified.lock(), 2);
        assert_eq!(engine.connector().event_count(), 2);
        balances.push(metrics.balance);
    }
    assert_eq!(balances, vec![60.0, 60.0]);
}

#[test]
fn naive_timestamps_use_configured_offset() {
    let clock = Arc::new(ManualClock::new(START));
    let config = EngineConfig::default().with_naive_time_offset(330);
    let engine = EngineContext::with_clock(config, clock).unwrap();
    engine
        .ingest(Transaction::expense(10.0, "Food").with_timestamp("1970-01-01T05:30:00"))
        .unwrap();

    // 05:30 at +05:30 is the epoch
    let result = engine.query_str("tumbling:5").unwrap();
    let windows = result.tumbling().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].window_start, "1970-01-01T00:00:00.000Z");
}

#[test]
fn subscribe_rejects_empty_window() {
    let (engine, _) = engine(StrategyKind::Recompute);
    let result = engine.subscribe(QuerySpec::Tumbling { minutes: Some(0) }, |_| {});
    assert!(matches!(result, Err(Error::InvalidQuery { .. })));
}

#[test]
fn info_reports_activity() {
    let (engine, clock) = engine(StrategyKind::RunningTotals);
    engine.subscribe(QuerySpec::Categories, |_| {}).unwrap();
    for _ in 0..4 {
        engine.ingest(Transaction::expense(2.0, "Food")).unwrap();
    }
    clock.advance(minutes(2));

    let result = engine.query_str("info").unwrap();
    let info = result.info().unwrap();
    assert_eq!(info.strategy, "running_totals");
    assert_eq!(info.event_count, 4);
    assert_eq!(info.events_per_minute, 2.0);
    assert_eq!(info.subscription_count, 1);
    assert_eq!(info.transaction_count, 4);
}

#[test]
fn transactions_query_lists_records() {
    let (engine, _) = engine(StrategyKind::Recompute);
    engine
        .ingest(Transaction::income(10.0, "Gift").with_description("birthday"))
        .unwrap();
    let json = engine.query_str("transactions").unwrap().to_json();
    assert_eq!(json[0]["description"], "birthday");
    assert_eq!(json[0]["type"], "income");
    assert_eq!(json[0]["sequence_id"], 1);
}

#[test]
fn concurrent_ingest_through_engine() {
    let (engine, _) = engine(StrategyKind::RunningTotals);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    engine.ingest(Transaction::expense(2.0, "Food")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = engine.query(&QuerySpec::Metrics).unwrap();
    assert_eq!(metrics.metrics().unwrap().transaction_count, 200);
    assert_eq!(metrics.metrics().unwrap().total_expenses, 400.0);
    assert_eq!(engine.table().len(), 200);
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        any::<bool>(),
        1u32..1_000_000,
        prop::sample::select(vec!["Food", "Rent", "Salary", "Travel"]),
    )
        .prop_map(|(income, cents, category)| {
            let amount = cents as f64 / 100.0;
            if income {
                Transaction::income(amount, category)
            } else {
                Transaction::expense(amount, category)
            }
        })
}

proptest! {
    /// Both strategies give the same metrics and categories.
    #[test]
    fn strategies_agree(transactions in prop::collection::vec(arb_transaction(), 0..80)) {
        let (recompute, _) = engine(StrategyKind::Recompute);
        let (running, _) = engine(StrategyKind::RunningTotals);
        for transaction in &transactions {
            recompute.ingest(transaction.clone()).unwrap();
            running.ingest(transaction.clone()).unwrap();
        }
        prop_assert_eq!(
            recompute.query(&QuerySpec::Metrics).unwrap(),
            running.query(&QuerySpec::Metrics).unwrap()
        );
        prop_assert_eq!(
            recompute.query(&QuerySpec::Categories).unwrap(),
            running.query(&QuerySpec::Categories).unwrap()
        );
    }

    /// Income totals equal the arithmetic sum of the income amounts.
    #[test]
    fn income_total_is_exact(transactions in prop::collection::vec(arb_transaction(), 0..80)) {
        let (engine, _) = engine(StrategyKind::Recompute);
        for transaction in &transactions {
            engine.ingest(transaction.clone()).unwrap();
        }
        let expected: f64 = transactions
            .iter()
            .filter(|t| t.kind == tally_engine::TransactionKind::Income)
            .map(|t| t.amount)
            .sum();
        let metrics = engine.query(&QuerySpec::Metrics).unwrap();
        let total = metrics.metrics().unwrap().total_income;
        prop_assert!((total - expected).abs() < 0.01);
    }
}
