//! Change notifications delivered to subscribers.

use tally_core::Record;

/// What a subscriber receives after each ingest.
///
/// `result` is the subscriber's view recomputed over the table after the
/// record was appended.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeNotification<T = Vec<Record>> {
    /// The record that was appended, with its sequence id and ingestion time.
    pub record: Record,
    /// The freshly recomputed view.
    pub result: T,
    /// Always true: tables are append-only.
    pub is_addition: bool,
    /// Ingestion time of `record`, epoch milliseconds.
    pub time: i64,
}

impl<T> ChangeNotification<T> {
    /// Notification for a newly appended record.
    pub fn addition(record: Record, result: T) -> Self {
        let time = record.ingestion_time();
        Self {
            record,
            result,
            is_addition: true,
            time,
        }
    }

    /// Replaces the result, keeping the change metadata.
    pub fn map<U, F>(self, f: F) -> ChangeNotification<U>
    where
        F: FnOnce(T) -> U,
    {
        ChangeNotification {
            record: self.record,
            result: f(self.result),
            is_addition: self.is_addition,
            time: self.time,
        }
    }
}

impl ChangeNotification<Vec<Record>> {
    /// The first result row, which is the only one for single-row views.
    pub fn first(&self) -> Option<&Record> {
        self.result.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addition() {
        let record = Record::new().with("amount", 10.0).with_metadata(3, 1_500);
        let note = ChangeNotification::addition(record.clone(), vec![Record::new().with("total", 10.0)]);
        assert!(note.is_addition);
        assert_eq!(note.time, 1_500);
        assert_eq!(note.record, record);
        assert_eq!(note.first().and_then(|r| r.number("total")), Some(10.0));
    }

    #[test]
    fn test_map() {
        let record = Record::new().with_metadata(1, 7);
        let note = ChangeNotification::addition(record, vec![Record::new(), Record::new()]);
        let counted = note.map(|rows| rows.len());
        assert_eq!(counted.result, 2);
        assert_eq!(counted.time, 7);
    }
}
