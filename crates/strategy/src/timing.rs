//! Moving-average timing model for the tactical allocation sleeves.
//!
//! `signal = SMA(short) - SMA(long)`; a pivot is a bar where the signal
//! changes sign. Tickers whose latest pivot is recent get a weight change:
//! add 75% after an upward cross, sell 75% after a downward one.

use crate::indicators::{rsi, sma};
use anyhow::Result;
use chrono::NaiveDate;
use quant_batch_core::{banner, AssetWeight, Bar, PriceSource};
use serde::{Deserialize, Serialize};

const RSI_LENGTH: usize = 14;
const HISTORY_MONTHS: u32 = 36;

/// One bar of the timing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub signal: f64,
    pub rsi: f64,
    pub pivot: bool,
}

/// A recent crossover that calls for a weight change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotAlert {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub signal: f64,
    pub rsi: f64,
    /// 1.75 to add 75% to the position, 0.25 to sell 75% of it.
    pub change_rate: f64,
}

/// Timing rows of one ticker, oldest first.
#[must_use]
pub fn timing_rows(ticker: &str, bars: &[Bar], short: usize, long: usize) -> Vec<TimingRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = sma(&closes, short);
    let slow = sma(&closes, long);
    let strength = rsi(&closes, RSI_LENGTH);

    let signal: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    bars.iter()
        .enumerate()
        .map(|(i, bar)| TimingRow {
            date: bar.timestamp.date_naive(),
            ticker: ticker.to_string(),
            close: bar.close,
            signal: signal[i],
            rsi: strength[i],
            // NaN products compare false
            pivot: i > 0 && signal[i - 1] * signal[i] < 0.0,
        })
        .collect()
}

/// Latest pivot of each ticker when it falls on or after `since`.
#[must_use]
pub fn recent_pivots(rows: &[TimingRow], since: NaiveDate) -> Vec<PivotAlert> {
    let mut latest: Vec<&TimingRow> = Vec::new();
    for row in rows.iter().filter(|r| r.pivot) {
        match latest.iter_mut().find(|r| r.ticker == row.ticker) {
            Some(slot) if slot.date < row.date => *slot = row,
            Some(_) => {}
            None => latest.push(row),
        }
    }

    latest
        .into_iter()
        .filter(|row| row.date >= since)
        .map(|row| PivotAlert {
            ticker: row.ticker.clone(),
            date: row.date,
            close: row.close,
            signal: row.signal,
            rsi: row.rsi,
            change_rate: if row.signal > 0.0 { 1.75 } else { 0.25 },
        })
        .collect()
}

pub struct TimingModel {
    pub short: usize,
    pub long: usize,
    /// Pivots older than this many days are not reported.
    pub lookback_days: i64,
}

impl TimingModel {
    #[must_use]
    pub fn new(short: usize, long: usize, lookback_days: i64) -> Self {
        Self {
            short,
            long,
            lookback_days,
        }
    }

    /// Fetches the sleeves, logs and returns the recent pivots.
    ///
    /// A ticker that fails to download is logged and skipped.
    pub async fn run(
        &self,
        source: &dyn PriceSource,
        sleeves: &[AssetWeight],
        today: NaiveDate,
    ) -> Result<Vec<PivotAlert>> {
        let mut rows = Vec::new();
        for sleeve in sleeves {
            match source.daily_months(&sleeve.ticker, HISTORY_MONTHS).await {
                Ok(bars) => rows.extend(timing_rows(&sleeve.ticker, &bars, self.short, self.long)),
                Err(e) => tracing::error!("Timing model: failed to load {}: {:#}", sleeve.ticker, e),
            }
        }

        let since = today - chrono::Duration::days(self.lookback_days);
        let alerts = recent_pivots(&rows, since);

        tracing::info!(
            "{}",
            banner(&format!(
                " {}-day vs {}-day moving average: adjust weights per timing model ",
                self.long, self.short
            ))
        );
        for alert in &alerts {
            tracing::info!(
                "{} {} close {:.2} signal {:.4} RSI {:.2} change rate {:.2}",
                alert.date,
                alert.ticker,
                alert.close,
                alert.signal,
                alert.rsi,
                alert.change_rate
            );
            for row in rows.iter().filter(|r| r.ticker == alert.ticker).rev().take(3) {
                tracing::debug!("{:?}", row);
            }
        }
        if alerts.is_empty() {
            tracing::info!("No pivots since {}", since);
        }

        Ok(alerts)
    }
}
