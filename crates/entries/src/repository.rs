use crate::models::{CreateEntryRequest, Entry};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct EntryRecord {
    id: i64,
    entry_date: String,
    amount: i64,
    description: Option<String>,
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        Entry {
            id: record.id,
            entry_date: record.entry_date,
            amount: record.amount,
            description: record.description,
        }
    }
}

pub(crate) struct EntryRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> EntryRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, req: &CreateEntryRequest) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO entries (entry_date, amount, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(req.entry_date())
        .bind(req.amount())
        .bind(req.description())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn update(&mut self, id: i64, req: &CreateEntryRequest) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE entries SET entry_date = $1, amount = $2, description = $3 WHERE id = $4",
        )
        .bind(req.entry_date())
        .bind(req.amount())
        .bind(req.description())
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Entry>, RepositoryError> {
        let record = sqlx::query_as::<_, EntryRecord>(
            "SELECT id, entry_date, amount, description FROM entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }

    pub async fn list_by_month(&mut self, month: &str) -> Result<Vec<Entry>, RepositoryError> {
        let records = sqlx::query_as::<_, EntryRecord>(
            "SELECT id, entry_date, amount, description FROM entries WHERE strftime('%Y-%m', entry_date) = $1 ORDER BY entry_date DESC, id DESC",
        )
        .bind(month)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    #[tokio::test]
    async fn test_create_entry() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let mut repo = EntryRepository::new(uow.connection());
        let req = CreateEntryRequest::new("2026-01-01".to_string(), 10.0, false, Some("Groceries".into())).unwrap();

        let id = repo.create(&req).await.unwrap();
        assert!(id > 0);

        let e = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(e.amount, -1000);
        assert_eq!(e.description, Some("Groceries".to_string()));
    }

    #[tokio::test]
    async fn test_list_entries_by_month() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let mut repo = EntryRepository::new(uow.connection());
        repo.create(&CreateEntryRequest::new("2026-01-05".to_string(), 10.0, false, None).unwrap())
            .await
            .unwrap();
        repo.create(&CreateEntryRequest::new("2026-02-05".to_string(), 10.0, false, None).unwrap())
            .await
            .unwrap();

        let list = repo.list_by_month("2026-01").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].entry_date, "2026-01-05");
    }

    #[tokio::test]
    async fn test_update_entry() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let mut repo = EntryRepository::new(uow.connection());
        let id = repo
            .create(&CreateEntryRequest::new("2026-01-01".to_string(), 10.0, false, None).unwrap())
            .await
            .unwrap();

        let update_req =
            CreateEntryRequest::new("2026-01-02".to_string(), 20.0, true, Some("Salary".into())).unwrap();
        repo.update(id, &update_req).await.unwrap();

        let e = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(e.amount, 2000);
        assert_eq!(e.entry_date, "2026-01-02");
        assert_eq!(e.description, Some("Salary".to_string()));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let mut repo = EntryRepository::new(uow.connection());
        let id = repo
            .create(&CreateEntryRequest::new("2026-01-01".to_string(), 10.0, false, None).unwrap())
            .await
            .unwrap();

        assert!(repo.find_by_id(id).await.unwrap().is_some());
        repo.delete(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
    }
}
