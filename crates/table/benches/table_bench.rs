//! Benchmarks for tally-table.
//!
//! Every derived view rescans the table, so these track the cost per row.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use tally_table::{Aggregates, Projection, Record, Reducer, Table, Value};

const CATEGORIES: [&str; 4] = ["Food", "Rent", "Travel", "Utilities"];

fn make_table(size: usize) -> Table {
    let table = Table::new();
    for i in 0..size {
        let kind = if i % 5 == 0 { "income" } else { "expense" };
        table
            .append(
                Record::new()
                    .with("type", kind)
                    .with("amount", (i % 97) as f64 + 1.0)
                    .with("category", CATEGORIES[i % CATEGORIES.len()])
                    .with("timestamp", Value::DateTime(i as i64 * 1_000)),
            )
            .unwrap();
    }
    table
}

fn totals() -> Aggregates {
    Aggregates::new()
        .with("total_income", Reducer::sum("amount").where_eq("type", "income"))
        .with("total_expenses", Reducer::sum("amount").where_eq("type", "expense"))
        .with("count", Reducer::count())
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    group.bench_function("single", |b| {
        let table = Table::new();
        b.iter(|| table.append(black_box(Record::new().with("amount", 1.0))))
    });
    group.finish();
}

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce");
    let aggregates = totals();

    for size in [100, 1000, 10000] {
        let table = make_table(size);
        group.bench_with_input(BenchmarkId::new("whole_table", size), &table, |b, table| {
            b.iter(|| table.reduce(black_box(&aggregates)))
        });
        group.bench_with_input(BenchmarkId::new("groupby_category", size), &table, |b, table| {
            b.iter(|| table.groupby(&["category"]).reduce(black_box(&aggregates)))
        });
    }

    group.finish();
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    let projection = Projection::new().computed("signed", |row| {
        let amount = row.require_number("amount")?;
        Ok(Value::Float64(if row.str("type") == Some("income") { amount } else { -amount }))
    });

    for size in [100, 1000, 10000] {
        let table = make_table(size);
        group.bench_with_input(BenchmarkId::new("filter", size), &table, |b, table| {
            b.iter(|| table.filter(|row| Ok(row.require_number("amount")? > 50.0)))
        });
        group.bench_with_input(BenchmarkId::new("with_columns", size), &table, |b, table| {
            b.iter(|| table.with_columns(black_box(&projection)))
        });
        group.bench_with_input(BenchmarkId::new("tumbling_5m", size), &table, |b, table| {
            b.iter(|| {
                table
                    .window_by("timestamp", Duration::from_secs(300))
                    .map(|view| view.reduce(&totals()))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_reduce, bench_derive);
criterion_main!(benches);
