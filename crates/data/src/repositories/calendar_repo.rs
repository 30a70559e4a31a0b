//! Economic calendar repository.

use anyhow::Result;
use sqlx::SqlitePool;

use super::UpsertStats;
use crate::models::CalendarRecord;

/// Repository for the `Calendars` table.
#[derive(Debug, Clone)]
pub struct CalendarRepository {
    pool: SqlitePool,
}

impl CalendarRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces calendar events by `(date, country, event)`.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, records: &[CalendarRecord]) -> Result<UpsertStats> {
        let mut stats = UpsertStats::default();
        if records.is_empty() {
            return Ok(stats);
        }

        let mut tx = self.pool.begin().await?;

        for record in records {
            if !record.has_key() {
                stats.skipped += 1;
                continue;
            }

            let deleted =
                sqlx::query("DELETE FROM Calendars WHERE date = ?1 AND country = ?2 AND event = ?3")
                    .bind(&record.date)
                    .bind(&record.country)
                    .bind(&record.event)
                    .execute(&mut *tx)
                    .await?;
            stats.deleted += deleted.rows_affected();

            sqlx::query(
                r#"
                INSERT INTO Calendars
                    (date, country, event, currency, previous, estimate, actual,
                     change, impact, changePercentage)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&record.date)
            .bind(&record.country)
            .bind(&record.event)
            .bind(&record.currency)
            .bind(record.previous)
            .bind(record.estimate)
            .bind(record.actual)
            .bind(record.change)
            .bind(&record.impact)
            .bind(record.change_percentage)
            .execute(&mut *tx)
            .await?;
            stats.inserted += 1;
        }

        tx.commit().await?;
        Ok(stats)
    }

    /// Reads the whole table ordered by key.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn fetch_all(&self) -> Result<Vec<CalendarRecord>> {
        let records = sqlx::query_as::<_, CalendarRecord>(
            r#"
            SELECT date, country, event, currency,
                   CAST(previous AS REAL) AS previous,
                   CAST(estimate AS REAL) AS estimate,
                   CAST(actual AS REAL) AS actual,
                   CAST(change AS REAL) AS change,
                   impact,
                   CAST(changePercentage AS REAL) AS changePercentage
            FROM Calendars
            ORDER BY date, country, event
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Counts the rows in the table.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Calendars")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseClient;

    fn event(date: &str, country: &str, actual: Option<f64>) -> CalendarRecord {
        CalendarRecord {
            date: date.to_string(),
            country: country.to_string(),
            event: "CPI YoY".to_string(),
            currency: Some("USD".to_string()),
            actual,
            impact: Some("High".to_string()),
            ..CalendarRecord::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_event() {
        let db = DatabaseClient::in_memory().await.unwrap();
        db.create_schema().await.unwrap();
        let repo = CalendarRepository::new(db.pool().clone());

        let first = repo
            .upsert_batch(&[event("2023-11-14 13:30:00", "US", None)])
            .await
            .unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(first.deleted, 0);

        let second = repo
            .upsert_batch(&[event("2023-11-14 13:30:00", "US", Some(3.2))])
            .await
            .unwrap();
        assert_eq!(second.deleted, 1);

        let rows = repo.fetch_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actual, Some(3.2));
        assert_eq!(rows[0].currency.as_deref(), Some("USD"));
    }

    #[tokio::test]
    async fn test_whole_number_values_read_back_as_floats() {
        let db = DatabaseClient::in_memory().await.unwrap();
        db.create_schema().await.unwrap();
        let repo = CalendarRepository::new(db.pool().clone());

        let mut payrolls = event("2023-11-03 12:30:00", "US", Some(150.0));
        payrolls.event = "Non Farm Payrolls".to_string();
        payrolls.previous = Some(297.0);
        payrolls.estimate = Some(180.0);
        payrolls.change = Some(-147.0);
        repo.upsert_batch(&[payrolls]).await.unwrap();

        let rows = repo.fetch_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actual, Some(150.0));
        assert_eq!(rows[0].previous, Some(297.0));
        assert_eq!(rows[0].estimate, Some(180.0));
        assert_eq!(rows[0].change, Some(-147.0));
        assert_eq!(rows[0].change_percentage, None);
    }

    #[tokio::test]
    async fn test_upsert_skips_rows_without_key() {
        let db = DatabaseClient::in_memory().await.unwrap();
        db.create_schema().await.unwrap();
        let repo = CalendarRepository::new(db.pool().clone());

        let stats = repo
            .upsert_batch(&[
                event("2023-11-14 13:30:00", "US", Some(3.2)),
                event("2023-11-15 01:30:00", "", Some(0.1)),
            ])
            .await
            .unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
