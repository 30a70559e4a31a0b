//! Historical price collector for the Yahoo chart API.
//!
//! Serves both the fixed-range history files (`1min` over 7 days, `1hour`
//! over 730 days, `1day` over 10 years) and explicit daily date ranges.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use quant_batch_core::{Bar, MarketDataConfig, PriceSource, Timeframe};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::CollectorError;

/// Attempts per request when the failure is transient.
const MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Time window of a chart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartWindow {
    /// Provider range keyword such as `10y`.
    Range(&'static str),
    /// Explicit `[start, end)` period.
    Period {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Statistics of a chart download.
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    /// Bars kept
    pub bars: u64,
    /// Timestamps dropped for missing quote fields
    pub incomplete: u64,
    /// Requests sent, including retries
    pub requests: u64,
}

impl FetchStats {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Bars: {}, Incomplete: {}, Requests: {}",
            self.bars, self.incomplete, self.requests
        )
    }
}

/// Chart API client implementing [`PriceSource`].
pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl YahooChartClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MarketDataConfig) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        let quota =
            Quota::per_second(NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Downloads bars of `ticker` for `window` at the provider `interval`.
    ///
    /// Transient failures are retried.
    ///
    /// # Errors
    /// Returns the last error once attempts are exhausted, or the first
    /// non-transient error.
    pub async fn fetch_chart(
        &self,
        ticker: &str,
        interval: &str,
        window: ChartWindow,
    ) -> Result<(Vec<Bar>, FetchStats), CollectorError> {
        let mut stats = FetchStats::default();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.until_ready().await;
            stats.requests += 1;

            match self.fetch_once(ticker, interval, window).await {
                Ok(response) => {
                    let bars = decode_bars(response, &mut stats)?;
                    return Ok((bars, stats));
                }
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!("{} chart request failed ({}), retrying", ticker, e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(
        &self,
        ticker: &str,
        interval: &str,
        window: ChartWindow,
    ) -> Result<ChartResponse, CollectorError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let mut query: Vec<(&str, String)> = vec![
            ("interval", interval.to_string()),
            ("includePrePost", "false".to_string()),
        ];
        match window {
            ChartWindow::Range(range) => query.push(("range", range.to_string())),
            ChartWindow::Period { start, end } => {
                query.push(("period1", start.timestamp().to_string()));
                query.push(("period2", end.timestamp().to_string()));
            }
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // error payloads arrive with 4xx statuses
        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(parsed) => {
                if let Some(error) = parsed.chart.error {
                    return Err(CollectorError::api(error.code, error.description));
                }
                if !status.is_success() {
                    return Err(CollectorError::status(status.as_u16(), url));
                }
                Ok(parsed)
            }
            Err(_) if !status.is_success() => Err(CollectorError::status(status.as_u16(), url)),
            Err(e) => Err(CollectorError::Decode(e.to_string())),
        }
    }
}

fn decode_bars(response: ChartResponse, stats: &mut FetchStats) -> Result<Vec<Bar>, CollectorError> {
    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| CollectorError::Decode("chart result is empty".to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let field = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let fields = (
            DateTime::from_timestamp(ts, 0),
            field(&quote.open, i),
            field(&quote.high, i),
            field(&quote.low, i),
            field(&quote.close, i),
        );
        match fields {
            (Some(timestamp), Some(open), Some(high), Some(low), Some(close)) => bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: field(&quote.volume, i).unwrap_or(0.0),
            }),
            _ => stats.incomplete += 1,
        }
    }

    bars.sort_by_key(|bar| bar.timestamp);
    bars.dedup_by_key(|bar| bar.timestamp);
    stats.bars = bars.len() as u64;
    Ok(bars)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[async_trait]
impl PriceSource for YahooChartClient {
    async fn history(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>> {
        let (bars, stats) = self
            .fetch_chart(
                ticker,
                timeframe.provider_interval(),
                ChartWindow::Range(timeframe.provider_range()),
            )
            .await
            .with_context(|| format!("Failed to fetch {ticker} history for {timeframe}"))?;

        tracing::debug!("{} {}: {}", ticker, timeframe, stats.summary());
        Ok(bars)
    }

    async fn daily_range(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>> {
        anyhow::ensure!(start < end, "Start date {start} must be before end date {end}");

        let window = ChartWindow::Period {
            start: midnight(start),
            end: midnight(end),
        };
        let (bars, stats) = self
            .fetch_chart(ticker, Timeframe::OneDay.provider_interval(), window)
            .await
            .with_context(|| format!("Failed to fetch {ticker} daily bars {start} ~ {end}"))?;

        tracing::debug!("{} {} ~ {}: {}", ticker, start, end, stats.summary());
        Ok(bars)
    }
}
