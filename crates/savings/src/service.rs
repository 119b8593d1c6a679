use crate::aggregate::{self, DEFAULT_HORIZON};
use crate::models::{MonthRecord, RawMonthRecord, SavingsSummary};
use crate::repository::SavingsRepository;
use chrono::{Datelike, Months, NaiveDate};
use database::{Database, RepositoryError};
use std::collections::BTreeMap;
use tracing::instrument;

/// Trailing window fetched for the dashboard series.
const SERIES_MONTHS: u32 = 12;

#[derive(Debug, thiserror::Error)]
pub enum SavingsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for SavingsError {
    fn from(err: RepositoryError) -> Self {
        SavingsError::Infrastructure(err.to_string())
    }
}

pub struct SavingsService;

impl SavingsService {
    /// Fetches a complete snapshot (trailing series + all targets) and runs
    /// the aggregator over it. The snapshot is refetched on every call; no
    /// incremental patching.
    #[instrument(skip(db))]
    pub async fn get_summary(
        db: &Database,
        selected_month: &str, // YYYY-MM
        today: NaiveDate,
    ) -> Result<(SavingsSummary, Vec<MonthRecord>), SavingsError> {
        let window_start = today
            .with_day(1)
            .and_then(|d| d.checked_sub_months(Months::new(SERIES_MONTHS - 1)))
            .unwrap_or(today);
        let since = aggregate::month_key(window_start);

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = SavingsRepository::new(uow.connection());

        let rows = repo.monthly_totals_since(&since).await?;
        let target_rows = repo.list_targets().await?;

        let raw: Vec<RawMonthRecord> = rows
            .into_iter()
            .map(|r| {
                RawMonthRecord::new(
                    r.month,
                    r.income as f64 / 100.0,
                    r.expenses as f64 / 100.0,
                )
            })
            .collect();

        let targets: BTreeMap<String, f64> = target_rows
            .into_iter()
            .map(|t| (t.month, t.target_amount as f64 / 100.0))
            .collect();

        let summary = aggregate::summarize(&raw, &targets, selected_month, today, DEFAULT_HORIZON);
        let series = aggregate::normalize_series(&raw);

        Ok((summary, series))
    }

    #[instrument(skip(db))]
    pub async fn set_target(
        db: &Database,
        month: String,
        target_dollars: f64,
    ) -> Result<(), SavingsError> {
        let key = aggregate::canonical_month_key(&month).ok_or_else(|| {
            SavingsError::InvalidInput("Invalid month format. Expected YYYY-MM".into())
        })?;
        if target_dollars < 0.0 {
            return Err(SavingsError::InvalidInput("Target cannot be negative".into()));
        }

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = SavingsRepository::new(uow.connection());

        repo.upsert_target(&key, (target_dollars * 100.0).round() as i64)
            .await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
