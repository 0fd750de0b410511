//! Fail-open filter operator.

use super::SkippedRow;
use std::borrow::Borrow;
use std::sync::Arc;
use tally_core::{Record, RowResult};

/// Shareable row predicate, used by filtered reducers and stored views.
pub type RowPredicate = Arc<dyn Fn(&Record) -> RowResult<bool> + Send + Sync>;

/// Applies a predicate to a slice of rows.
///
/// Rows for which the predicate returns `Ok(true)` are cloned into the
/// output. A predicate that skips a row excludes only that row; the
/// omission is returned alongside the kept rows.
///
/// # Example
///
/// ```ignore
/// let (kept, skipped) = filter_rows(&rows, |row| Ok(row.require_number("amount")? > 100.0));
/// ```
pub fn filter_rows<R, P>(rows: &[R], predicate: P) -> (Vec<Record>, Vec<SkippedRow>)
where
    R: Borrow<Record>,
    P: Fn(&Record) -> RowResult<bool>,
{
    let mut kept = Vec::new();
    let mut skipped = Vec::new();
    for row in rows {
        let row: &Record = row.borrow();
        match predicate(row) {
            Ok(true) => kept.push(row.clone()),
            Ok(false) => {}
            Err(reason) => {
                tracing::trace!(sequence_id = row.sequence_id(), %reason, "filter skipped row");
                skipped.push(SkippedRow::new(row.sequence_id(), reason));
            }
        }
    }
    (kept, skipped)
}
