//! Record structure for Tally tables.
//!
//! A `Record` is an ordered list of named fields plus the metadata a table
//! assigns when the record is appended: a sequence id and an ingestion time.
//! Once a record sits inside a table it is never mutated.

use crate::error::{ComputationSkipped, RowResult};
use crate::time;
use crate::types::DataType;
use crate::value::Value;

/// Position of a record in the append order of its root table.
pub type SequenceId = u64;

/// Sequence id carried by rows that do not correspond to one appended record
/// (aggregates, join output).
pub const DERIVED_SEQUENCE_ID: SequenceId = u64::MAX;

/// Well-known field names.
pub mod fields {
    /// `income` or `expense`.
    pub const TYPE: &str = "type";
    /// Positive transaction amount.
    pub const AMOUNT: &str = "amount";
    /// Spending or earning category.
    pub const CATEGORY: &str = "category";
    /// Event time, ISO-8601 string or epoch seconds.
    pub const TIMESTAMP: &str = "timestamp";
    /// Optional free text.
    pub const DESCRIPTION: &str = "description";
    /// Pseudo-field exposing `Record::sequence_id`.
    pub const SEQUENCE_ID: &str = "sequence_id";
    /// Pseudo-field exposing `Record::ingestion_time`.
    pub const INGESTION_TIME: &str = "ingestion_time";
    /// Inclusive start of a tumbling window.
    pub const WINDOW_START: &str = "window_start";
    /// Exclusive end of a tumbling window.
    pub const WINDOW_END: &str = "window_end";
}

/// A record (row) of named values.
#[derive(Clone, Debug, Default)]
pub struct Record {
    /// Assigned by the table on append; 0 until then.
    sequence_id: SequenceId,
    /// Milliseconds since the Unix epoch, assigned on append.
    ingestion_time: i64,
    /// Field values in insertion order.
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty, unstamped record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unstamped record from name/value pairs.
    ///
    /// Later pairs overwrite earlier pairs with the same name.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Self::new();
        for (name, value) in fields {
            record.set(name, value);
        }
        record
    }

    /// Creates a derived row (aggregate, join output).
    pub fn derived(fields: Vec<(String, Value)>) -> Self {
        Self {
            sequence_id: DERIVED_SEQUENCE_ID,
            ingestion_time: 0,
            fields,
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns a copy of this record carrying the given ingestion metadata.
    pub fn with_metadata(mut self, sequence_id: SequenceId, ingestion_time: i64) -> Self {
        self.sequence_id = sequence_id;
        self.ingestion_time = ingestion_time;
        self
    }

    /// Copies the ingestion metadata of `source` onto this record.
    pub fn with_lineage(self, source: &Record) -> Self {
        self.with_metadata(source.sequence_id, source.ingestion_time)
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Returns the sequence id (0 while unstamped).
    #[inline]
    pub fn sequence_id(&self) -> SequenceId {
        self.sequence_id
    }

    /// Returns the ingestion time in milliseconds.
    #[inline]
    pub fn ingestion_time(&self) -> i64 {
        self.ingestion_time
    }

    /// Returns true once a table has assigned metadata.
    #[inline]
    pub fn is_stamped(&self) -> bool {
        self.sequence_id != 0
    }

    /// Returns true if this is a derived row.
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.sequence_id == DERIVED_SEQUENCE_ID
    }

    /// Gets a stored field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Gets a field by value, including the `sequence_id` and
    /// `ingestion_time` pseudo-fields. Missing fields read as Null.
    pub fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.get(name) {
            return value.clone();
        }
        match name {
            fields::SEQUENCE_ID if self.is_stamped() && !self.is_derived() => {
                Value::from(self.sequence_id)
            }
            fields::INGESTION_TIME if self.is_stamped() && !self.is_derived() => {
                Value::DateTime(self.ingestion_time)
            }
            _ => Value::Null,
        }
    }

    /// Returns true if the field is stored on this record.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns a numeric field as f64.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    /// Returns a string field.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Gets a non-null field or skips the computation.
    pub fn require(&self, name: &str) -> RowResult<&Value> {
        match self.get(name) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ComputationSkipped::missing(name)),
        }
    }

    /// Gets a numeric field or skips the computation.
    pub fn require_number(&self, name: &str) -> RowResult<f64> {
        self.require(name)?
            .as_number()
            .ok_or_else(|| ComputationSkipped::wrong_type(name, DataType::Float64))
    }

    /// Gets a string field or skips the computation.
    pub fn require_str(&self, name: &str) -> RowResult<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| ComputationSkipped::wrong_type(name, DataType::String))
    }

    /// Event time of this record in milliseconds.
    ///
    /// Reads `field` (DateTime, ISO-8601 string or epoch seconds) and falls
    /// back to the ingestion time when it is absent or unparseable.
    pub fn time_millis(&self, field: &str) -> i64 {
        self.get(field)
            .and_then(time::value_to_millis)
            .unwrap_or(self.ingestion_time)
    }

    /// Returns this record's fields followed by `other`'s; `other` wins on
    /// a name clash. The result keeps this record's metadata.
    pub fn merge(&self, other: &Record) -> Record {
        let mut merged = self.clone();
        for (name, value) in &other.fields {
            merged.set(name.clone(), value.clone());
        }
        merged
    }

    /// Iterates over the fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.sequence_id == other.sequence_id && self.fields == other.fields
    }
}
