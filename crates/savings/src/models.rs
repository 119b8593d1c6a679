use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One calendar month of summed activity. `month` is the canonical
/// first-of-month key, 'YYYY-MM-01', unique within a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRecord {
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

impl MonthRecord {
    /// Net savings for the month. May be negative.
    pub fn savings(&self) -> f64 {
        self.income - self.expenses
    }
}

/// Tolerant input shape for the aggregator. The month may be missing and the
/// amounts may arrive as numbers, numeric strings, or garbage; normalization
/// sorts that out rather than erroring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMonthRecord {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub income: Value,
    #[serde(default)]
    pub expenses: Value,
}

impl RawMonthRecord {
    pub fn new(month: impl Into<String>, income: f64, expenses: f64) -> Self {
        Self {
            month: Some(month.into()),
            income: Value::from(income),
            expenses: Value::from(expenses),
        }
    }
}

impl From<MonthRecord> for RawMonthRecord {
    fn from(record: MonthRecord) -> Self {
        RawMonthRecord::new(record.month, record.income, record.expenses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub horizon: usize,
    pub average: f64,
    pub projected: f64,
    pub best: f64,
    pub likely: f64,
    /// False means "insufficient history", not a zero projection.
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consistency {
    pub saved_months: usize,
    pub window: usize,
    pub ratio: f64,
}

/// Advisory flags for banner selection only; no business logic hangs off
/// these beyond conditional messaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgeStates {
    pub empty_series: bool,
    pub single_month_history: bool,
    pub income_without_expense: bool,
    pub expense_without_income: bool,
}

/// The whole derived summary. Recomputed from scratch on every request; it
/// has no identity or persistence of its own.
#[derive(Debug, Clone, Serialize)]
pub struct SavingsSummary {
    pub current: Option<MonthRecord>,
    pub last_month: Option<MonthRecord>,
    pub savings: f64,
    pub tone: Tone,
    pub rate: f64,
    pub target: Option<f64>,
    pub progress: u32,
    pub forecast: Forecast,
    pub best_month: Option<MonthRecord>,
    pub low_month: Option<MonthRecord>,
    pub consistency: Consistency,
    pub edge_states: EdgeStates,
}

/// Persisted savings target for a single month. Sparse: most months have none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsTarget {
    pub id: i64,
    pub month: String,       // 'YYYY-MM-01'
    pub target_amount: i64,  // Cents
}
