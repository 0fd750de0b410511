//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```json
//! {
//!   "trailing_window_minutes": 10,
//!   "strategy": "running_totals",
//!   "risk": { "medium": 0.4 }
//! }
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::{fields, Error, Result};

/// Which aggregation strategy backs the metrics and category queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Recompute from the table on every query.
    #[default]
    Recompute,
    /// Keep running sums and counts, updated on each ingest.
    RunningTotals,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Recompute => write!(f, "recompute"),
            StrategyKind::RunningTotals => write!(f, "running_totals"),
        }
    }
}

/// Expense-to-income ratios above which the risk level steps up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.75,
            critical: 0.9,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default length of the trailing window query.
    pub trailing_window_minutes: u64,
    /// Default size of the tumbling window query.
    pub tumbling_window_minutes: u64,
    /// Field holding each transaction's event time.
    pub time_field: String,
    /// UTC offset, in minutes, of timestamps written without one.
    pub naive_time_offset_minutes: i32,
    pub strategy: StrategyKind,
    pub risk: RiskThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trailing_window_minutes: 5,
            tumbling_window_minutes: 5,
            time_field: fields::TIMESTAMP.to_string(),
            naive_time_offset_minutes: 0,
            strategy: StrategyKind::default(),
            risk: RiskThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trailing_window(mut self, minutes: u64) -> Self {
        self.trailing_window_minutes = minutes;
        self
    }

    pub fn with_tumbling_window(mut self, minutes: u64) -> Self {
        self.tumbling_window_minutes = minutes;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_risk(mut self, risk: RiskThresholds) -> Self {
        self.risk = risk;
        self
    }

    /// Reads timestamps without an offset as local time `minutes` east of UTC.
    pub fn with_naive_time_offset(mut self, minutes: i32) -> Self {
        self.naive_time_offset_minutes = minutes;
        self
    }

    /// The offset applied to timestamps written without one.
    pub fn naive_time_offset(&self) -> Result<FixedOffset> {
        self.naive_time_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::invalid_config(
                    "naive_time_offset_minutes",
                    format!("must be within 24 hours of UTC, got {}", self.naive_time_offset_minutes),
                )
            })
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that windows are non-empty and risk thresholds ascend.
    pub fn validate(&self) -> Result<()> {
        if self.trailing_window_minutes == 0 {
            return Err(Error::invalid_config("trailing_window_minutes", "must be at least 1"));
        }
        if self.tumbling_window_minutes == 0 {
            return Err(Error::invalid_config("tumbling_window_minutes", "must be at least 1"));
        }
        if self.time_field.trim().is_empty() {
            return Err(Error::invalid_config("time_field", "must not be empty"));
        }
        self.naive_time_offset()?;
        let RiskThresholds { medium, high, critical } = self.risk;
        if ![medium, high, critical].iter().all(|t| t.is_finite() && *t >= 0.0) {
            return Err(Error::invalid_config("risk", "thresholds must be finite and non-negative"));
        }
        if !(medium <= high && high <= critical) {
            return Err(Error::invalid_config(
                "risk",
                format!("expected medium <= high <= critical, got {} / {} / {}", medium, high, critical),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.trailing_window_minutes, 5);
        assert_eq!(config.tumbling_window_minutes, 5);
        assert_eq!(config.time_field, "timestamp");
        assert_eq!(config.strategy, StrategyKind::Recompute);
        assert_eq!(config.risk.critical, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(
            r#"{"trailing_window_minutes": 10, "strategy": "running_totals", "risk": {"medium": 0.4}}"#,
        )
        .unwrap();
        assert_eq!(config.trailing_window_minutes, 10);
        assert_eq!(config.tumbling_window_minutes, 5);
        assert_eq!(config.strategy, StrategyKind::RunningTotals);
        assert_eq!(config.risk.medium, 0.4);
        assert_eq!(config.risk.high, 0.75);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(EngineConfig::from_json("{"), Err(Error::Parse { .. })));
        assert!(matches!(
            EngineConfig::from_json(r#"{"strategy": "magic"}"#),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let zero = EngineConfig::new().with_trailing_window(0);
        assert!(matches!(zero.validate(), Err(Error::InvalidConfig { .. })));

        let unordered = EngineConfig::new().with_risk(RiskThresholds {
            medium: 0.8,
            high: 0.7,
            critical: 0.9,
        });
        assert!(matches!(unordered.validate(), Err(Error::InvalidConfig { .. })));

        assert!(matches!(
            EngineConfig::from_json(r#"{"tumbling_window_minutes": 0}"#),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_naive_time_offset() {
        let config = EngineConfig::from_json(r#"{"naive_time_offset_minutes": 330}"#).unwrap();
        assert_eq!(config.naive_time_offset().unwrap().local_minus_utc(), 19_800);
        assert_eq!(EngineConfig::default().naive_time_offset().unwrap().local_minus_utc(), 0);

        let far = EngineConfig::new().with_naive_time_offset(24 * 60);
        assert!(matches!(far.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(StrategyKind::RunningTotals.to_string(), "running_totals");
        assert_eq!(
            serde_json::to_string(&StrategyKind::Recompute).unwrap(),
            "\"recompute\""
        );
    }
}
