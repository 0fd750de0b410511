//! Tally Table - append-only tables with derived views.
//!
//! This crate implements the table half of a small dataflow API on top of
//! plain vectors under a lock. Derived views are recomputed from the full
//! history each time they are requested; nothing is maintained incrementally.
//!
//! # Core Concepts
//!
//! - `Table`: an ordered, append-only collection of `Record`s
//! - `AppendListener`: told about every append to a root table
//! - `Projection` / `Column`: column specs for `select` and `with_columns`
//! - `GroupedView`: per-key reduction (`groupby(...).reduce(...)`)
//! - `WindowedView`: tumbling time windows keyed by a timestamp field
//! - `TrailingWindow`: "last N minutes" relative to the table clock
//! - `Reducer` / `Aggregates`: composable aggregation functions
//!
//! Per-row failures inside extractors and predicates are fail-open: the row
//! is excluded (`filter`) or the field is nulled (`select`, `with_columns`),
//! and the omission is recorded in `Table::skipped`.
//!
//! # Example
//!
//! ```rust
//! use tally_core::Record;
//! use tally_table::{Aggregates, Reducer, Table};
//!
//! let table = Table::new();
//! table.append(Record::new().with("type", "expense").with("amount", 10.0).with("category", "Food")).unwrap();
//! table.append(Record::new().with("type", "income").with("amount", 5.0).with("category", "Food")).unwrap();
//!
//! let by_category = table.groupby(&["category"]).reduce(
//!     &Aggregates::new()
//!         .with("total_expenses", Reducer::sum("amount").where_eq("type", "expense"))
//!         .with("count", Reducer::count()),
//! );
//!
//! let food = &by_category.snapshot()[0];
//! assert_eq!(food.number("total_expenses"), Some(10.0));
//! assert_eq!(food.get("count").and_then(|v| v.as_i64()), Some(2));
//! ```

pub mod group;
pub mod operators;
pub mod reducer;
pub mod streaming;
pub mod table;
pub mod window;

pub use group::GroupedView;
pub use operators::{apply, if_else, Column, Extractor, Projection, RowPredicate, SkippedRow};
pub use reducer::{Aggregates, Aggregator, Reducer};
pub use table::{AppendListener, Table};
pub use window::{TrailingWindow, WindowBucket, WindowKey, WindowedView};

// Re-export commonly used types from dependencies
pub use tally_core::{ComputationSkipped, Record, RowResult, SequenceId, Value};
