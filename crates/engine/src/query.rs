//! Named queries and their results.

use crate::metrics::{CategorySummary, EngineInfo, FinancialMetrics, TrailingSummary, TumblingSummary};
use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;
use tally_core::{record_to_json, Error, Record, Result};

/// What to compute.
///
/// Window lengths of `None` fall back to the engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuerySpec {
    /// Whole-history totals, risk level and health score.
    Metrics,
    /// Per-category totals.
    Categories,
    /// Totals over the last N minutes.
    Trailing { minutes: Option<u64> },
    /// Totals per N-minute tumbling window.
    Tumbling { minutes: Option<u64> },
    /// Every stored transaction.
    Transactions,
    /// Engine status.
    Info,
}

impl QuerySpec {
    /// Parses `metrics`, `categories`, `windowed[:N]` (or `trailing[:N]`),
    /// `tumbling[:N]`, `transactions` or `info`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim().to_ascii_lowercase();
        let (name, arg) = match text.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (text.as_str(), None),
        };
        let minutes = match arg {
            None => None,
            Some(arg) => match arg.parse::<u64>() {
                Ok(m) if m > 0 => Some(m),
                _ => return Err(Error::invalid_query(text.clone())),
            },
        };
        match (name, minutes) {
            ("metrics", None) => Ok(QuerySpec::Metrics),
            ("categories", None) => Ok(QuerySpec::Categories),
            ("windowed" | "trailing", minutes) => Ok(QuerySpec::Trailing { minutes }),
            ("tumbling", minutes) => Ok(QuerySpec::Tumbling { minutes }),
            ("transactions", None) => Ok(QuerySpec::Transactions),
            ("info", None) => Ok(QuerySpec::Info),
            _ => Err(Error::invalid_query(text.clone())),
        }
    }

    /// Rejects explicit zero-length windows.
    pub fn validate(&self) -> Result<()> {
        match self {
            QuerySpec::Trailing { minutes: Some(0) } | QuerySpec::Tumbling { minutes: Some(0) } => {
                Err(Error::invalid_query(self.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for QuerySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        QuerySpec::parse(s)
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuerySpec::Metrics => write!(f, "metrics"),
            QuerySpec::Categories => write!(f, "categories"),
            QuerySpec::Trailing { minutes: None } => write!(f, "windowed"),
            QuerySpec::Trailing { minutes: Some(m) } => write!(f, "windowed:{}", m),
            QuerySpec::Tumbling { minutes: None } => write!(f, "tumbling"),
            QuerySpec::Tumbling { minutes: Some(m) } => write!(f, "tumbling:{}", m),
            QuerySpec::Transactions => write!(f, "transactions"),
            QuerySpec::Info => write!(f, "info"),
        }
    }
}

/// The answer to a [`QuerySpec`].
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Metrics(FinancialMetrics),
    Categories(Vec<CategorySummary>),
    Trailing(TrailingSummary),
    Tumbling(Vec<TumblingSummary>),
    Transactions(Vec<Record>),
    Info(EngineInfo),
}

fn to_json<T: Serialize>(value: &T) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

impl QueryResult {
    /// A JSON object, or an array of objects for the list-shaped queries.
    pub fn to_json(&self) -> Json {
        match self {
            QueryResult::Metrics(metrics) => to_json(metrics),
            QueryResult::Categories(categories) => to_json(categories),
            QueryResult::Trailing(summary) => to_json(summary),
            QueryResult::Tumbling(windows) => to_json(windows),
            QueryResult::Transactions(rows) => Json::Array(rows.iter().map(record_to_json).collect()),
            QueryResult::Info(info) => to_json(info),
        }
    }

    pub fn metrics(&self) -> Option<&FinancialMetrics> {
        match self {
            QueryResult::Metrics(metrics) => Some(metrics),
            _ => None,
        }
    }

    pub fn categories(&self) -> Option<&[CategorySummary]> {
        match self {
            QueryResult::Categories(categories) => Some(categories),
            _ => None,
        }
    }

    pub fn trailing(&self) -> Option<&TrailingSummary> {
        match self {
            QueryResult::Trailing(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn tumbling(&self) -> Option<&[TumblingSummary]> {
        match self {
            QueryResult::Tumbling(windows) => Some(windows),
            _ => None,
        }
    }

    pub fn transactions(&self) -> Option<&[Record]> {
        match self {
            QueryResult::Transactions(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&EngineInfo> {
        match self {
            QueryResult::Info(info) => Some(info),
            _ => None,
        }
    }
}
