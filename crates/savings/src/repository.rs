use crate::models::SavingsTarget;
use database::{self, RepositoryError};
use sqlx::FromRow;

/// Summed activity for one calendar month, straight from the ledger.
#[derive(FromRow)]
pub(crate) struct MonthTotalsRecord {
    pub month: String, // 'YYYY-MM-01'
    pub income: i64,   // Cents
    pub expenses: i64, // Cents
}

#[derive(FromRow)]
struct TargetRecord {
    id: i64,
    month: String,
    target_amount: i64,
}

impl From<TargetRecord> for SavingsTarget {
    fn from(record: TargetRecord) -> Self {
        SavingsTarget {
            id: record.id,
            month: record.month,
            target_amount: record.target_amount,
        }
    }
}

pub(crate) struct SavingsRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> SavingsRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    /// One row per calendar month with entries on or after `since`
    /// ('YYYY-MM-DD'), already summed per month as the aggregator expects.
    pub async fn monthly_totals_since(
        &mut self,
        since: &str,
    ) -> Result<Vec<MonthTotalsRecord>, RepositoryError> {
        let records = sqlx::query_as::<_, MonthTotalsRecord>(
            "SELECT strftime('%Y-%m-01', entry_date) AS month,
                    COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0) AS income,
                    COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0) AS expenses
             FROM entries
             WHERE entry_date >= $1
             GROUP BY strftime('%Y-%m', entry_date)
             ORDER BY month DESC",
        )
        .bind(since)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records)
    }

    pub async fn list_targets(&mut self) -> Result<Vec<SavingsTarget>, RepositoryError> {
        let records = sqlx::query_as::<_, TargetRecord>(
            "SELECT id, month, target_amount FROM savings_targets ORDER BY month DESC",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn upsert_target(
        &mut self,
        month: &str,
        target_amount: i64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO savings_targets (month, target_amount) VALUES ($1, $2)
             ON CONFLICT(month) DO UPDATE SET target_amount = excluded.target_amount",
        )
        .bind(month)
        .bind(target_amount)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    async fn insert_entry(conn: &mut database::Connection, date: &str, amount: i64) {
        sqlx::query("INSERT INTO entries (entry_date, amount) VALUES ($1, $2)")
            .bind(date)
            .bind(amount)
            .execute(conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_monthly_totals_group_and_sum() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        insert_entry(uow.connection(), "2026-01-05", 200_000).await; // income
        insert_entry(uow.connection(), "2026-01-20", -50_000).await; // expense
        insert_entry(uow.connection(), "2026-02-03", -30_000).await;
        insert_entry(uow.connection(), "2025-12-31", 10_000).await; // before cutoff

        let mut repo = SavingsRepository::new(uow.connection());
        let rows = repo.monthly_totals_since("2026-01-01").await.unwrap();

        assert_eq!(rows.len(), 2);
        // Descending by month
        assert_eq!(rows[0].month, "2026-02-01");
        assert_eq!(rows[0].income, 0);
        assert_eq!(rows[0].expenses, 30_000);
        assert_eq!(rows[1].month, "2026-01-01");
        assert_eq!(rows[1].income, 200_000);
        assert_eq!(rows[1].expenses, 50_000);
    }

    #[tokio::test]
    async fn test_upsert_target_replaces() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let mut repo = SavingsRepository::new(uow.connection());
        repo.upsert_target("2026-01-01", 100_000).await.unwrap();
        repo.upsert_target("2026-01-01", 150_000).await.unwrap();
        repo.upsert_target("2026-02-01", 50_000).await.unwrap();

        let targets = repo.list_targets().await.unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].month, "2026-02-01");
        assert_eq!(targets[1].month, "2026-01-01");
        assert_eq!(targets[1].target_amount, 150_000);
    }
}
