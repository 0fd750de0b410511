//! Data type definitions for Tally records.
//!
//! This module defines the scalar types a record field can hold.

/// Supported field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Ordered sequence of values, produced by `collect`
    List,
}
