use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Tables of the economics database, in creation order.
pub const TABLES: [&str; 3] = ["Calendars", "Markets", "Indicators"];

const CREATE_CALENDARS: &str = r"
    CREATE TABLE IF NOT EXISTS Calendars (
        date             TEXT NOT NULL,
        country          TEXT NOT NULL,
        event            TEXT NOT NULL,
        currency         TEXT,
        previous         NUMERIC,
        estimate         NUMERIC,
        actual           NUMERIC,
        change           NUMERIC,
        impact           TEXT,
        changePercentage NUMERIC,
        PRIMARY KEY (date, country, event)
    )
";

const CREATE_MARKETS: &str = r"
    CREATE TABLE IF NOT EXISTS Markets (
        Country    TEXT NOT NULL,
        Market     TEXT NOT NULL,
        Symbol     TEXT NOT NULL,
        Last_value NUMERIC NOT NULL,
        Momentum   NUMERIC,
        Trend      NUMERIC,
        Oscillator NUMERIC,
        RSI        NUMERIC,
        DOD        NUMERIC,
        WOW        NUMERIC,
        MOM        NUMERIC,
        YOY        NUMERIC,
        Date       TEXT,
        PRIMARY KEY (Country, Market, Symbol, Last_value)
    )
";

const CREATE_INDICATORS: &str = r"
    CREATE TABLE IF NOT EXISTS Indicators (
        Country   TEXT NOT NULL,
        Indicator TEXT NOT NULL,
        Date      TEXT NOT NULL,
        Symbol    TEXT,
        Actual    NUMERIC,
        Previous  NUMERIC,
        MOM       NUMERIC,
        YOY       NUMERIC,
        Trend     TEXT,
        Slope     TEXT,
        ZS5Y      INTEGER,
        PRIMARY KEY (Country, Indicator, Date)
    )
";

fn create_statement(table: &str) -> Option<&'static str> {
    match table {
        "Calendars" => Some(CREATE_CALENDARS),
        "Markets" => Some(CREATE_MARKETS),
        "Indicators" => Some(CREATE_INDICATORS),
        _ => None,
    }
}

fn key_columns(table: &str) -> &'static str {
    match table {
        "Calendars" => "date, country, event",
        "Markets" => "Country, Market, Symbol, Last_value",
        _ => "Country, Indicator, Date",
    }
}

/// Row count of a table after reorganisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Clone)]
pub struct DatabaseClient {
    pool: SqlitePool,
}

impl DatabaseClient {
    /// Opens (creating if needed) the `SQLite` database at `database_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        if let Some(file_path) = database_url.strip_prefix("sqlite://") {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        Ok(Self { pool })
    }

    /// Creates a private in-memory database.
    ///
    /// Uses a single connection: every `SQLite` memory connection is a separate database.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the `Calendars`, `Markets` and `Indicators` tables if missing.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn create_schema(&self) -> Result<()> {
        for table in TABLES {
            if let Some(statement) = create_statement(table) {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to create table {table}"))?;
            }
        }
        tracing::info!("Schema ready: {}", TABLES.join(", "));
        Ok(())
    }

    /// Lists the user tables in the database.
    ///
    /// # Errors
    /// Returns an error if the catalog query fails.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Rewrites each table in primary-key order.
    ///
    /// Repeated delete/insert upserts scatter rows across the file, so
    /// consumers reading without `ORDER BY` see them out of order. Each table
    /// is copied into `<table>_backup`, dropped, recreated with its schema and
    /// refilled from the backup sorted by key.
    ///
    /// # Errors
    /// Returns an error if any statement fails; the transaction is rolled back.
    pub async fn reorg_tables(&self) -> Result<Vec<ReorgCount>> {
        let mut counts = Vec::with_capacity(TABLES.len());

        for table in TABLES {
            let Some(create) = create_statement(table) else {
                continue;
            };
            let backup = format!("{table}_backup");
            let mut tx = self.pool.begin().await?;

            sqlx::query(&format!("DROP TABLE IF EXISTS {backup}"))
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!("CREATE TABLE {backup} AS SELECT * FROM {table}"))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to back up {table}"))?;
            sqlx::query(&format!("DROP TABLE {table}"))
                .execute(&mut *tx)
                .await?;
            sqlx::query(create).execute(&mut *tx).await?;
            sqlx::query(&format!(
                "INSERT INTO {table} SELECT * FROM {backup} ORDER BY {}",
                key_columns(table)
            ))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to restore {table}"))?;

            let (rows,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!("{} Reorg Count: {}", table, rows);
            counts.push(ReorgCount {
                table: table.to_string(),
                rows,
            });
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let db = DatabaseClient::in_memory().await.unwrap();
        db.create_schema().await.unwrap();
        db.create_schema().await.unwrap();

        let tables = db.list_tables().await.unwrap();
        assert_eq!(tables, vec!["Calendars", "Indicators", "Markets"]);
    }

    #[tokio::test]
    async fn test_reorg_keeps_rows_and_orders_by_key() {
        let db = DatabaseClient::in_memory().await.unwrap();
        db.create_schema().await.unwrap();

        for (country, indicator) in [("US", "GDP"), ("CN", "CPI"), ("KR", "PMI")] {
            sqlx::query("INSERT INTO Indicators (Country, Indicator, Date) VALUES (?1, ?2, '2023-11-07')")
                .bind(country)
                .bind(indicator)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let counts = db.reorg_tables().await.unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(
            counts[2],
            ReorgCount {
                table: "Indicators".to_string(),
                rows: 3
            }
        );

        let countries: Vec<(String,)> = sqlx::query_as("SELECT Country FROM Indicators")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let countries: Vec<String> = countries.into_iter().map(|(c,)| c).collect();
        assert_eq!(countries, vec!["CN", "KR", "US"]);

        // primary key survives the rebuild
        let duplicate = sqlx::query(
            "INSERT INTO Indicators (Country, Indicator, Date) VALUES ('US', 'GDP', '2023-11-07')",
        )
        .execute(db.pool())
        .await;
        assert!(duplicate.is_err());
    }
}
