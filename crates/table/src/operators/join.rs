//! Nested-loop inner join.

use std::borrow::Borrow;
use tally_core::{Record, DERIVED_SEQUENCE_ID};

/// Joins two row slices on equality of `left[left_key]` and `right[right_key]`.
///
/// Every left row is compared with every right row (O(n·m)); matches are
/// emitted in left-major order. Output rows hold the left fields followed by
/// the right fields, the right side winning on a name clash. Null or missing
/// keys never match.
pub fn nested_loop_join<L, R>(left: &[L], right: &[R], left_key: &str, right_key: &str) -> Vec<Record>
where
    L: Borrow<Record>,
    R: Borrow<Record>,
{
    let mut output = Vec::new();
    for l in left {
        let l: &Record = l.borrow();
        let key = l.lookup(left_key);
        if key.is_null() {
            continue;
        }
        for r in right {
            let r: &Record = r.borrow();
            if r.lookup(right_key) == key {
                output.push(l.merge(r).with_metadata(DERIVED_SEQUENCE_ID, 0));
            }
        }
    }
    output
}
