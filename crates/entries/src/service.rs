use crate::models::{CreateEntryRequest, Entry, MonthlySummary};
use crate::repository::EntryRepository;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Entry not found")]
    NotFound,
}

impl From<RepositoryError> for EntryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => EntryError::NotFound,
            RepositoryError::Infrastructure(e) => EntryError::Infrastructure(e.to_string()),
            _ => EntryError::Infrastructure(err.to_string()),
        }
    }
}

pub struct EntryService;

impl EntryService {
    #[instrument(skip(db))]
    pub async fn create_entry(
        db: &Database,
        entry_date: String,
        amount_dollars: f64,
        is_income: bool,
        description: Option<String>,
    ) -> Result<i64, EntryError> {
        let req = CreateEntryRequest::new(entry_date, amount_dollars, is_income, description)
            .map_err(EntryError::InvalidInput)?;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = EntryRepository::new(uow.connection());

        let id = repo.create(&req).await?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(id)
    }

    #[instrument(skip(db))]
    pub async fn update_entry(
        db: &Database,
        id: i64,
        entry_date: String,
        amount_dollars: f64,
        is_income: bool,
        description: Option<String>,
    ) -> Result<Entry, EntryError> {
        let req = CreateEntryRequest::new(entry_date, amount_dollars, is_income, description)
            .map_err(EntryError::InvalidInput)?;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = EntryRepository::new(uow.connection());

        repo.update(id, &req).await?;

        let entry = repo.find_by_id(id).await?.ok_or(EntryError::NotFound)?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(entry)
    }

    #[instrument(skip(db))]
    pub async fn get_entry(db: &Database, id: i64) -> Result<Entry, EntryError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = EntryRepository::new(uow.connection());

        let entry = repo.find_by_id(id).await?.ok_or(EntryError::NotFound)?;

        Ok(entry)
    }

    #[instrument(skip(db))]
    pub async fn get_month_view(
        db: &Database,
        month: &str, // YYYY-MM
    ) -> Result<(Vec<Entry>, MonthlySummary), EntryError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = EntryRepository::new(uow.connection());

        let entries = repo.list_by_month(month).await?;

        let mut total_income = 0;
        let mut total_expenses = 0;

        for e in &entries {
            if e.amount > 0 {
                total_income += e.amount;
            } else {
                total_expenses += e.amount.abs();
            }
        }

        let summary = MonthlySummary {
            month: month.to_string(),
            total_income,
            total_expenses,
            net: total_income - total_expenses,
        };

        Ok((entries, summary))
    }

    #[instrument(skip(db))]
    pub async fn delete_entry(db: &Database, id: i64) -> Result<(), EntryError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = EntryRepository::new(uow.connection());

        repo.delete(id).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
