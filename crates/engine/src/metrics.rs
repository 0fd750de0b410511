//! Financial summaries computed from income and expense totals.

use crate::config::RiskThresholds;
use serde::Serialize;
use std::fmt;
use tally_core::{fields, Record, Value};
use tally_table::{Aggregates, Reducer};

/// Category name used for rows without one.
pub const UNCATEGORIZED: &str = "uncategorized";

pub(crate) const TOTAL_INCOME: &str = "total_income";
pub(crate) const TOTAL_EXPENSES: &str = "total_expenses";
pub(crate) const TRANSACTION_COUNT: &str = "transaction_count";

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Income, expenses and row count over some set of transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expenses: f64,
    pub count: u64,
}

impl Totals {
    /// Reducers producing the three totals from a row set.
    pub fn aggregates() -> Aggregates {
        Aggregates::new()
            .with(TOTAL_INCOME, Reducer::sum(fields::AMOUNT).where_eq(fields::TYPE, "income"))
            .with(TOTAL_EXPENSES, Reducer::sum(fields::AMOUNT).where_eq(fields::TYPE, "expense"))
            .with(TRANSACTION_COUNT, Reducer::count())
    }

    /// Reads totals back from a row reduced with [`Totals::aggregates`].
    pub fn from_record(record: &Record) -> Self {
        Self {
            income: record.number(TOTAL_INCOME).unwrap_or(0.0),
            expenses: record.number(TOTAL_EXPENSES).unwrap_or(0.0),
            count: record
                .get(TRANSACTION_COUNT)
                .and_then(Value::as_i64)
                .map(|n| n.max(0) as u64)
                .unwrap_or(0),
        }
    }

    /// Adds one transaction row.
    pub fn apply(&mut self, record: &Record) {
        let amount = record.number(fields::AMOUNT).unwrap_or(0.0);
        match record.str(fields::TYPE) {
            Some("income") => self.income += amount,
            Some("expense") => self.expenses += amount,
            _ => {}
        }
        self.count += 1;
    }

    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }

    /// Expenses as a fraction of income; `None` without income.
    pub fn expense_ratio(&self) -> Option<f64> {
        if self.income > 0.0 {
            Some(self.expenses / self.income)
        } else {
            None
        }
    }
}

/// Coarse risk classification from the expense-to-income ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Spending anything with no income at all is critical.
    pub fn assess(totals: &Totals, thresholds: &RiskThresholds) -> Self {
        match totals.expense_ratio() {
            Some(ratio) if ratio > thresholds.critical => RiskLevel::Critical,
            Some(ratio) if ratio > thresholds.high => RiskLevel::High,
            Some(ratio) if ratio > thresholds.medium => RiskLevel::Medium,
            Some(_) => RiskLevel::Low,
            None if totals.expenses > 0.0 => RiskLevel::Critical,
            None => RiskLevel::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 100 minus the expense ratio as a percentage, clamped to 0..=100.
pub fn health_score(totals: &Totals) -> f64 {
    match totals.expense_ratio() {
        Some(ratio) => (100.0 - ratio * 100.0).clamp(0.0, 100.0),
        None if totals.expenses > 0.0 => 0.0,
        None => 100.0,
    }
}

/// Whole-history metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinancialMetrics {
    pub balance: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_cash_flow: f64,
    pub transaction_count: u64,
    pub risk_level: RiskLevel,
    pub financial_health_score: f64,
    pub avg_transaction: f64,
}

impl FinancialMetrics {
    pub fn from_totals(totals: &Totals, thresholds: &RiskThresholds) -> Self {
        let balance = round_to(totals.net(), 2);
        let avg_transaction = if totals.count > 0 {
            (totals.income + totals.expenses) / totals.count as f64
        } else {
            0.0
        };
        Self {
            balance,
            total_income: round_to(totals.income, 2),
            total_expenses: round_to(totals.expenses, 2),
            net_cash_flow: balance,
            transaction_count: totals.count,
            risk_level: RiskLevel::assess(totals, thresholds),
            financial_health_score: round_to(health_score(totals), 1),
            avg_transaction: round_to(avg_transaction, 2),
        }
    }
}

/// Per-category totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
    pub transaction_count: u64,
}

impl CategorySummary {
    pub fn from_totals(category: impl Into<String>, totals: &Totals) -> Self {
        Self {
            category: category.into(),
            total_income: round_to(totals.income, 2),
            total_expenses: round_to(totals.expenses, 2),
            net: round_to(totals.net(), 2),
            transaction_count: totals.count,
        }
    }
}

/// Display name of a category key.
pub fn category_name(value: &Value) -> String {
    match value {
        Value::Null => UNCATEGORIZED.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Activity in the last few minutes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrailingSummary {
    pub window_minutes: u64,
    pub recent_income: f64,
    pub recent_expenses: f64,
    pub recent_transactions: u64,
    pub spending_rate_per_minute: f64,
    pub net_flow: f64,
    pub period_summary: String,
}

impl TrailingSummary {
    pub fn from_totals(window_minutes: u64, totals: &Totals) -> Self {
        let rate = if window_minutes > 0 {
            totals.expenses / window_minutes as f64
        } else {
            0.0
        };
        Self {
            window_minutes,
            recent_income: round_to(totals.income, 2),
            recent_expenses: round_to(totals.expenses, 2),
            recent_transactions: totals.count,
            spending_rate_per_minute: round_to(rate, 2),
            net_flow: round_to(totals.net(), 2),
            period_summary: period_summary(window_minutes, totals),
        }
    }
}

fn period_summary(window_minutes: u64, totals: &Totals) -> String {
    if totals.count == 0 {
        format!("No activity in last {} minutes", window_minutes)
    } else if totals.income > totals.expenses {
        format!("Positive cash flow: +₹{:.2}", totals.income - totals.expenses)
    } else if totals.expenses > totals.income {
        format!("Net spending: -₹{:.2}", totals.expenses - totals.income)
    } else {
        "Balanced activity".to_string()
    }
}

/// One tumbling window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TumblingSummary {
    /// RFC 3339, inclusive.
    pub window_start: String,
    /// RFC 3339, exclusive.
    pub window_end: String,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub transaction_count: u64,
}

/// Engine status.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineInfo {
    pub strategy: String,
    pub event_count: u64,
    pub events_per_minute: f64,
    pub subscription_count: usize,
    pub transaction_count: usize,
    pub trailing_window_minutes: u64,
    pub tumbling_window_minutes: u64,
}
