//! The transaction contract callers ingest through.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;
use tally_core::time::parse_timestamp_in;
use tally_core::{fields, Error, Record, Result, Value};

/// Income or expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a transaction happened: an ISO-8601 string or epoch seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionTime {
    EpochSeconds(f64),
    Iso(String),
}

impl TransactionTime {
    /// Epoch milliseconds, if the time is well-formed. ISO strings without
    /// an offset are read as UTC.
    pub fn to_millis(&self) -> Option<i64> {
        self.to_millis_in(Utc.fix())
    }

    /// Epoch milliseconds, reading ISO strings without an offset as local
    /// time at `offset`.
    pub fn to_millis_in(&self, offset: FixedOffset) -> Option<i64> {
        match self {
            TransactionTime::EpochSeconds(secs) if secs.is_finite() => Some((secs * 1000.0).round() as i64),
            TransactionTime::EpochSeconds(_) => None,
            TransactionTime::Iso(text) => parse_timestamp_in(text, offset),
        }
    }
}

/// A single income or expense event.
///
/// A transaction without a timestamp is placed in time by its ingestion time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TransactionTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: f64, category: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            category: category.into(),
            timestamp: None,
            description: None,
            user_id: None,
        }
    }

    pub fn income(amount: f64, category: impl Into<String>) -> Self {
        Self::new(TransactionKind::Income, amount, category)
    }

    pub fn expense(amount: f64, category: impl Into<String>) -> Self {
        Self::new(TransactionKind::Expense, amount, category)
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(TransactionTime::Iso(timestamp.into()));
        self
    }

    pub fn with_epoch_seconds(mut self, seconds: f64) -> Self {
        self.timestamp = Some(TransactionTime::EpochSeconds(seconds));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Decodes a transaction from a JSON object.
    pub fn from_json(json: &Json) -> Result<Self> {
        Ok(Transaction::deserialize(json)?)
    }

    /// Checks the contract: a positive finite amount, a non-empty category
    /// and, if given, a parseable timestamp.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::validation(
                fields::AMOUNT,
                format!("must be a positive number, got {}", self.amount),
            ));
        }
        if self.category.trim().is_empty() {
            return Err(Error::validation(fields::CATEGORY, "must not be empty"));
        }
        if let Some(time) = &self.timestamp {
            if time.to_millis().is_none() {
                return Err(Error::validation(
                    fields::TIMESTAMP,
                    format!("not an ISO-8601 time or epoch seconds: {:?}", time),
                ));
            }
        }
        Ok(())
    }

    /// The record stored in the table. The timestamp is normalised to a
    /// `DateTime` value.
    pub fn to_record(&self) -> Record {
        self.to_record_in(Utc.fix())
    }

    /// Like [`to_record`](Transaction::to_record), reading a timestamp
    /// without an offset as local time at `offset`.
    pub fn to_record_in(&self, offset: FixedOffset) -> Record {
        let mut record = Record::new()
            .with(fields::TYPE, self.kind.as_str())
            .with(fields::AMOUNT, self.amount)
            .with(fields::CATEGORY, self.category.trim());
        if let Some(millis) = self.timestamp.as_ref().and_then(|t| t.to_millis_in(offset)) {
            record.set(fields::TIMESTAMP, Value::DateTime(millis));
        }
        if let Some(description) = &self.description {
            record.set(fields::DESCRIPTION, description.as_str());
        }
        if let Some(user_id) = &self.user_id {
            record.set("user_id", user_id.as_str());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let txn = Transaction::from_json(&json!({
            "type": "expense",
            "amount": 45.5,
            "category": "Food",
            "timestamp": "2024-03-01T12:00:00",
            "description": "groceries"
        }))
        .unwrap();
        assert_eq!(txn.kind, TransactionKind::Expense);
        assert_eq!(txn.amount, 45.5);
        assert_eq!(txn.timestamp, Some(TransactionTime::Iso("2024-03-01T12:00:00".into())));
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_from_json_epoch_and_integer_amount() {
        let txn = Transaction::from_json(&json!({
            "type": "income",
            "amount": 5000,
            "category": "Salary",
            "timestamp": 1_700_000_000
        }))
        .unwrap();
        assert_eq!(txn.amount, 5000.0);
        assert_eq!(txn.timestamp.and_then(|t| t.to_millis()), Some(1_700_000_000_000));
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(matches!(
            Transaction::from_json(&json!({"type": "refund", "amount": 1, "category": "x"})),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            Transaction::from_json(&json!({"type": "income", "category": "x"})),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(Transaction::expense(0.0, "Food").validate().is_err());
        assert!(Transaction::expense(-1.0, "Food").validate().is_err());
        assert!(Transaction::expense(f64::NAN, "Food").validate().is_err());
        assert!(Transaction::expense(1.0, "  ").validate().is_err());
        assert!(Transaction::expense(1.0, "Food").with_timestamp("yesterday").validate().is_err());
        assert!(Transaction::expense(1.0, "Food").with_timestamp("2024-03-01").validate().is_ok());
        assert!(Transaction::expense(1.0, "Food").validate().is_ok());
    }

    #[test]
    fn test_to_record() {
        let record = Transaction::income(5000.0, " Salary ")
            .with_timestamp("1970-01-01T00:01:00Z")
            .with_description("March pay")
            .with_user("alex")
            .to_record();
        assert_eq!(record.str("type"), Some("income"));
        assert_eq!(record.number("amount"), Some(5000.0));
        assert_eq!(record.str("category"), Some("Salary"));
        assert_eq!(record.get("timestamp"), Some(&Value::DateTime(60_000)));
        assert_eq!(record.str("description"), Some("March pay"));
        assert_eq!(record.str("user_id"), Some("alex"));
        assert!(!record.is_stamped());
    }

    #[test]
    fn test_to_record_in_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let txn = Transaction::expense(3.0, "Food").with_timestamp("1970-01-01T05:30:00");
        assert_eq!(txn.to_record_in(ist).get("timestamp"), Some(&Value::DateTime(0)));
        assert_eq!(txn.to_record().get("timestamp"), Some(&Value::DateTime(19_800_000)));
    }

    #[test]
    fn test_to_record_without_timestamp() {
        let record = Transaction::expense(3.0, "Food").to_record();
        assert!(!record.contains("timestamp"));
    }
}
