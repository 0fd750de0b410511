//! Group-by reduction.

use crate::reducer::Aggregates;
use crate::table::Table;
use hashbrown::HashMap;
use std::sync::Arc;
use tally_core::{Record, Value};

/// A table grouped by one or more key fields.
///
/// Nothing is computed until [`reduce`](GroupedView::reduce) is called; each
/// call rescans the source table.
#[derive(Clone, Debug)]
pub struct GroupedView {
    source: Table,
    keys: Vec<String>,
}

impl GroupedView {
    pub(crate) fn new(source: Table, keys: Vec<String>) -> Self {
        Self { source, keys }
    }

    /// Returns the key field names.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the table being grouped.
    pub fn source(&self) -> &Table {
        &self.source
    }

    fn key_of(&self, row: &Record) -> Vec<Value> {
        self.keys.iter().map(|k| row.lookup(k)).collect()
    }

    /// Partitions the current rows by key, in order of first appearance.
    fn partition(&self) -> Vec<(Vec<Value>, Vec<Arc<Record>>)> {
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<Arc<Record>>)> = Vec::new();
        for row in self.source.rows() {
            let key = self.key_of(&row);
            match index.get(&key) {
                Some(&slot) => groups[slot].1.push(row),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        groups
    }

    /// Returns the distinct keys in order of first appearance.
    pub fn distinct_keys(&self) -> Vec<Vec<Value>> {
        self.partition().into_iter().map(|(key, _)| key).collect()
    }

    /// One derived row per distinct key: the key fields followed by each
    /// aggregate. A row missing a key field is grouped under `Null`.
    pub fn reduce(&self, aggregates: &Aggregates) -> Table {
        let groups = self.partition();
        let mut output = Vec::with_capacity(groups.len());
        for (key, rows) in groups {
            let refs: Vec<&Record> = rows.iter().map(|r| r.as_ref()).collect();
            let mut record = Record::derived(self.keys.iter().cloned().zip(key).collect());
            for (name, value) in aggregates.evaluate(&refs) {
                record.set(name, value);
            }
            output.push(record);
        }
        tracing::debug!(keys = ?self.keys, groups = output.len(), "reduced groups");
        Table::derived(output, self.source.clock().clone(), Vec::new())
    }
}
