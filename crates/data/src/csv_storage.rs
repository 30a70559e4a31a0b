use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{Reader, Writer};
use quant_batch_core::Bar;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of a `{ticker}_hist_{timeframe}.csv` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BarRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    ticker: String,
}

/// One row of a `{ticker}.csv` close file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CloseRow {
    date: NaiveDate,
    close: f64,
}

/// Parses the timestamp forms found in history files.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, RFC 3339 and a bare date (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub struct CsvStorage;

impl CsvStorage {
    /// Writes any serializable rows with a header line.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads rows with a header line.
    ///
    /// # Errors
    /// Returns error if file cannot be opened or a row does not deserialize
    pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let mut reader = Reader::from_reader(file);

        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row.with_context(|| format!("Malformed row in {}", path.display()))?);
        }
        Ok(records)
    }

    /// Writes OHLCV bars of one ticker.
    ///
    /// Format: date,open,high,low,close,volume,ticker
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_bars(path: &Path, ticker: &str, bars: &[Bar]) -> Result<()> {
        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|bar| bar.timestamp);

        let rows: Vec<BarRow> = sorted
            .iter()
            .map(|bar| BarRow {
                date: bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                ticker: ticker.to_string(),
            })
            .collect();

        Self::write_records(path, &rows)
    }

    /// Reads the bars of `ticker`, oldest first.
    ///
    /// Rows of other tickers and rows with an unreadable date are dropped.
    ///
    /// # Errors
    /// Returns error if file cannot be opened or parsed
    pub fn read_bars(path: &Path, ticker: &str) -> Result<Vec<Bar>> {
        let rows: Vec<BarRow> = Self::read_records(path)?;

        let mut bars: Vec<Bar> = rows
            .into_iter()
            .filter(|row| row.ticker == ticker)
            .filter_map(|row| {
                let timestamp = parse_timestamp(&row.date);
                if timestamp.is_none() {
                    tracing::warn!("Skipping row with unreadable date {:?}", row.date);
                }
                timestamp.map(|timestamp| Bar {
                    timestamp,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                })
            })
            .collect();

        bars.sort_by_key(|bar| bar.timestamp);
        Ok(bars)
    }

    /// Writes daily closes as `date,close`.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_closes(path: &Path, bars: &[Bar]) -> Result<()> {
        let rows: Vec<CloseRow> = bars
            .iter()
            .map(|bar| CloseRow {
                date: bar.timestamp.date_naive(),
                close: bar.close,
            })
            .collect();
        Self::write_records(path, &rows)
    }

    /// Reads a `date,close` file, oldest first.
    ///
    /// # Errors
    /// Returns error if file cannot be opened or parsed
    pub fn read_closes(path: &Path) -> Result<Vec<(NaiveDate, f64)>> {
        let rows: Vec<CloseRow> = Self::read_records(path)?;
        let mut closes: Vec<(NaiveDate, f64)> =
            rows.into_iter().map(|row| (row.date, row.close)).collect();
        closes.sort_by_key(|(date, _)| *date);
        Ok(closes)
    }
}
