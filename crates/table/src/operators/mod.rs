//! Row-level operators used to derive tables.
//!
//! - Filter: keeps rows matching a predicate (fail-open)
//! - Project: computes columns for `select` / `with_columns`
//! - Join: nested-loop inner join on key equality

mod filter;
mod join;
mod project;

pub use filter::{filter_rows, RowPredicate};
pub use join::nested_loop_join;
pub use project::{apply, if_else, project_rows, Column, Extractor, Projection, ProjectionMode};

use tally_core::{ComputationSkipped, SequenceId};

/// A row-level omission recorded while deriving a table.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRow {
    /// Sequence id of the source row.
    pub sequence_id: SequenceId,
    /// Why the computation gave up.
    pub skipped: ComputationSkipped,
}

impl SkippedRow {
    pub fn new(sequence_id: SequenceId, skipped: ComputationSkipped) -> Self {
        Self {
            sequence_id,
            skipped,
        }
    }
}
