//! Tally Core - Core types for the Tally in-memory streaming tables.
//!
//! This crate provides the foundational types shared by every Tally crate:
//!
//! - `DataType`: Scalar types a field can hold (Boolean, Int64, Float64, String, DateTime, List)
//! - `Value`: Runtime values stored in a record field
//! - `Record`: A row of named fields plus its ingestion metadata
//! - `Clock`: The time source used for ingestion stamps and trailing windows
//! - `Error`: Error types for table operations
//! - `ComputationSkipped`: The soft, row-level outcome of a failed extractor
//!
//! # Example
//!
//! ```rust
//! use tally_core::{Record, Value};
//!
//! let record = Record::new()
//!     .with("type", "income")
//!     .with("amount", 5000.0)
//!     .with("category", "Salary");
//!
//! assert_eq!(record.get("category"), Some(&Value::String("Salary".into())));
//! assert_eq!(record.number("amount"), Some(5000.0));
//! assert!(!record.is_stamped());
//! ```

mod convert;
mod error;
mod record;
pub mod time;
mod types;
mod value;

pub use convert::{json_to_record, json_to_value, record_to_json, value_to_json};
pub use error::{ComputationSkipped, Error, Result, RowResult};
pub use record::{fields, Record, SequenceId, DERIVED_SEQUENCE_ID};
pub use time::{Clock, ManualClock, SharedClock, SystemClock};
pub use types::DataType;
pub use value::Value;
