//! Macroeconomic indicator repository.

use anyhow::Result;
use sqlx::SqlitePool;

use super::UpsertStats;
use crate::models::IndicatorRecord;

/// Repository for the `Indicators` table.
#[derive(Debug, Clone)]
pub struct IndicatorRepository {
    pool: SqlitePool,
}

impl IndicatorRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces indicator releases by `(Country, Indicator, Date)`.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, records: &[IndicatorRecord]) -> Result<UpsertStats> {
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

            let deleted = sqlx::query(
                "DELETE FROM Indicators WHERE Country = ?1 AND Indicator = ?2 AND Date = ?3",
            )
            .bind(&record.country)
            .bind(&record.indicator)
            .bind(record.date)
            .execute(&mut *tx)
            .await?;
            stats.deleted += deleted.rows_affected();

            sqlx::query(
                r#"
                INSERT INTO Indicators
                    (Country, Indicator, Date, Symbol, Actual, Previous, MOM, YOY,
                     Trend, Slope, ZS5Y)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&record.country)
            .bind(&record.indicator)
            .bind(record.date)
            .bind(&record.symbol)
            .bind(record.actual)
            .bind(record.previous)
            .bind(record.mom)
            .bind(record.yoy)
            .bind(&record.trend)
            .bind(&record.slope)
            .bind(record.zs5y)
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
    pub async fn fetch_all(&self) -> Result<Vec<IndicatorRecord>> {
        let records = sqlx::query_as::<_, IndicatorRecord>(
            r#"
            SELECT Country, Indicator, Date, Symbol,
                   CAST(Actual AS REAL) AS Actual,
                   CAST(Previous AS REAL) AS Previous,
                   CAST(MOM AS REAL) AS MOM,
                   CAST(YOY AS REAL) AS YOY,
                   Trend, Slope, ZS5Y
            FROM Indicators
            ORDER BY Country, Indicator, Date
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
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Indicators")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
