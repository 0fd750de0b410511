//! Aggregation strategies behind the metrics and category queries.
//!
//! Both strategies answer the same questions and must agree on every input.
//! `RecomputeStrategy` rescans the table per query; `RunningTotalsStrategy`
//! folds each record into running sums as it is ingested.

use crate::config::StrategyKind;
use crate::metrics::{category_name, Totals};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::fmt;
use tally_core::{fields, Record};
use tally_table::Table;

/// Source of whole-history and per-category totals.
pub trait AggregationStrategy: Send + Sync + fmt::Debug {
    /// Short name reported by the info query.
    fn name(&self) -> &'static str;

    /// Called once for every stored record, before subscribers are notified.
    fn on_ingest(&self, record: &Record);

    /// Totals over every record in `table`.
    fn totals(&self, table: &Table) -> Totals;

    /// Totals per category, in order of first appearance.
    fn categories(&self, table: &Table) -> Vec<(String, Totals)>;
}

/// Builds the strategy selected in the configuration.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn AggregationStrategy> {
    match kind {
        StrategyKind::Recompute => Box::new(RecomputeStrategy),
        StrategyKind::RunningTotals => Box::new(RunningTotalsStrategy::new()),
    }
}

/// Recomputes everything from the table on each query.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecomputeStrategy;

impl AggregationStrategy for RecomputeStrategy {
    fn name(&self) -> &'static str {
        "recompute"
    }

    fn on_ingest(&self, _record: &Record) {}

    fn totals(&self, table: &Table) -> Totals {
        Totals::from_record(&table.reduce(&Totals::aggregates()))
    }

    fn categories(&self, table: &Table) -> Vec<(String, Totals)> {
        table
            .groupby(&[fields::CATEGORY])
            .reduce(&Totals::aggregates())
            .snapshot()
            .iter()
            .map(|row| (category_name(&row.lookup(fields::CATEGORY)), Totals::from_record(row)))
            .collect()
    }
}

#[derive(Debug, Default)]
struct RunningState {
    overall: Totals,
    categories: Vec<(String, Totals)>,
    index: HashMap<String, usize>,
}

/// Running sums and counts, overall and per category.
///
/// The table argument of the query methods is ignored; the answer comes
/// from the records seen by `on_ingest`.
#[derive(Debug, Default)]
pub struct RunningTotalsStrategy {
    state: Mutex<RunningState>,
}

impl RunningTotalsStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AggregationStrategy for RunningTotalsStrategy {
    fn name(&self) -> &'static str {
        "running_totals"
    }

    fn on_ingest(&self, record: &Record) {
        let category = category_name(&record.lookup(fields::CATEGORY));
        let mut state = self.state.lock();
        state.overall.apply(record);
        let slot = match state.index.get(&category).copied() {
            Some(slot) => slot,
            None => {
                let slot = state.categories.len();
                state.index.insert(category.clone(), slot);
                state.categories.push((category, Totals::default()));
                slot
            }
        };
        state.categories[slot].1.apply(record);
    }

    fn totals(&self, _table: &Table) -> Totals {
        self.state.lock().overall
    }

    fn categories(&self, _table: &Table) -> Vec<(String, Totals)> {
        self.state.lock().categories.clone()
    }
}
