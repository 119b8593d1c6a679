use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub entry_date: String, // 'YYYY-MM-DD'
    pub amount: i64,        // Cents; income positive, expenses negative
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateEntryRequest {
    entry_date: String,
    amount: i64,
    description: Option<String>,
}

#[derive(Deserialize)]
pub struct RawCreateEntryRequest {
    pub entry_date: String,
    pub amount_dollars: f64,
    pub kind: String, // "income" or "expense"
    pub description: Option<String>,
}

impl CreateEntryRequest {
    pub fn new(
        entry_date: String,
        amount_dollars: f64,
        is_income: bool,
        description: Option<String>,
    ) -> Result<Self, String> {
        if NaiveDate::parse_from_str(&entry_date, "%Y-%m-%d").is_err() {
            return Err("Invalid date format, expected YYYY-MM-DD".to_string());
        }

        let mut amount = (amount_dollars.abs() * 100.0).round() as i64;
        if !is_income {
            amount = -amount;
        }

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            entry_date,
            amount,
            description,
        })
    }

    pub fn entry_date(&self) -> &str {
        &self.entry_date
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[derive(Debug, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_income: i64,
    pub total_expenses: i64,
    pub net: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_entry_request_expense() {
        let req = CreateEntryRequest::new("2025-10-27".into(), 45.50, false, None).unwrap();
        assert_eq!(req.amount(), -4550);
    }

    #[test]
    fn test_create_entry_request_income() {
        let req = CreateEntryRequest::new("2025-10-27".into(), 100.00, true, None).unwrap();
        assert_eq!(req.amount(), 10000);
    }

    #[test]
    fn test_create_entry_request_bad_date() {
        assert!(CreateEntryRequest::new("27/10/2025".into(), 10.0, true, None).is_err());
    }

    #[test]
    fn test_create_entry_request_blank_description_dropped() {
        let req =
            CreateEntryRequest::new("2025-10-27".into(), 10.0, true, Some("   ".into())).unwrap();
        assert_eq!(req.description(), None);
    }
}
