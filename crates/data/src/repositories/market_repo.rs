//! Financial market snapshot repository.

use anyhow::Result;
use sqlx::SqlitePool;

use super::UpsertStats;
use crate::models::MarketRecord;

/// Repository for the `Markets` table.
#[derive(Debug, Clone)]
pub struct MarketRepository {
    pool: SqlitePool,
}

impl MarketRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces market rows matching `(Country, Symbol, Last_value)`.
    ///
    /// Rows without a last value are skipped.
    ///
    /// # Errors
    /// Returns an error if the database transaction fails.
    pub async fn upsert_batch(&self, records: &[MarketRecord]) -> Result<UpsertStats> {
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
                "DELETE FROM Markets WHERE Country = ?1 AND Symbol = ?2 AND Last_value = ?3",
            )
            .bind(&record.country)
            .bind(&record.symbol)
            .bind(record.last_value)
            .execute(&mut *tx)
            .await?;
            stats.deleted += deleted.rows_affected();

            sqlx::query(
                r#"
                INSERT INTO Markets
                    (Country, Market, Symbol, Last_value, Momentum, Trend, Oscillator,
                     RSI, DOD, WOW, MOM, YOY, Date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&record.country)
            .bind(&record.market)
            .bind(&record.symbol)
            .bind(record.last_value)
            .bind(record.momentum)
            .bind(record.trend)
            .bind(record.oscillator)
            .bind(record.rsi)
            .bind(record.dod)
            .bind(record.wow)
            .bind(record.mom)
            .bind(record.yoy)
            .bind(record.date)
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
    pub async fn fetch_all(&self) -> Result<Vec<MarketRecord>> {
        let records = sqlx::query_as::<_, MarketRecord>(
            r#"
            SELECT Country, Market, Symbol,
                   CAST(Last_value AS REAL) AS Last_value,
                   CAST(Momentum AS REAL) AS Momentum,
                   CAST(Trend AS REAL) AS Trend,
                   CAST(Oscillator AS REAL) AS Oscillator,
                   CAST(RSI AS REAL) AS RSI,
                   CAST(DOD AS REAL) AS DOD,
                   CAST(WOW AS REAL) AS WOW,
                   CAST(MOM AS REAL) AS MOM,
                   CAST(YOY AS REAL) AS YOY,
                   Date
            FROM Markets
            ORDER BY Country, Market, Symbol, Last_value
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
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Markets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
