use crate::bar::{Bar, Timeframe};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of historical price bars.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Longest available history of `ticker` at `timeframe`, oldest first.
    async fn history(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>>;

    /// Daily bars of `ticker` between `start` (inclusive) and `end` (exclusive).
    async fn daily_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>>;

    /// Daily bars covering the last `months` months.
    async fn daily_months(&self, ticker: &str, months: u32) -> Result<Vec<Bar>> {
        let end = chrono::Utc::now().date_naive() + chrono::Duration::days(1);
        let start = end
            .checked_sub_months(chrono::Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        self.daily_range(ticker, start, end).await
    }
}
