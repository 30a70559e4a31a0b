//! Maximum drawdown watch over a long daily history.

use crate::indicators::{cumulative_returns, daily_returns, drawdown};
use anyhow::Result;
use chrono::NaiveDate;
use quant_batch_core::{Bar, PriceSource, ResultBlock};
use quant_batch_data::CsvStorage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the drawdown report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub daily_return: f64,
    pub cumulative_return: f64,
    pub drawdown: f64,
}

/// Drawdown rows of one ticker. The first bar only seeds the returns.
#[must_use]
pub fn drawdown_rows(ticker: &str, bars: &[Bar]) -> Vec<DrawdownRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = daily_returns(&closes);
    let cumulative = cumulative_returns(&returns);
    let declines = drawdown(&cumulative);

    bars.iter()
        .skip(1)
        .zip(returns.iter().zip(cumulative.iter().zip(&declines)))
        .map(|(bar, (&ret, (&cum, &dd)))| DrawdownRow {
            ticker: ticker.to_string(),
            date: bar.timestamp.date_naive(),
            close: bar.close,
            daily_return: ret,
            cumulative_return: cum,
            drawdown: dd,
        })
        .collect()
}

/// Drawdown summary of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    pub ticker: String,
    pub max_drawdown: f64,
    pub breaches: usize,
    pub last_breach: Option<NaiveDate>,
    pub current: f64,
}

#[must_use]
pub fn summarize(ticker: &str, rows: &[DrawdownRow], threshold: f64) -> DrawdownSummary {
    let breaching: Vec<&DrawdownRow> = rows.iter().filter(|r| r.drawdown < threshold).collect();
    DrawdownSummary {
        ticker: ticker.to_string(),
        max_drawdown: rows.iter().map(|r| r.drawdown).fold(0.0, f64::min),
        breaches: breaching.len(),
        last_breach: breaching.last().map(|r| r.date),
        current: rows.last().map_or(0.0, |r| r.drawdown),
    }
}

pub struct DrawdownWatch {
    /// Drawdown level reported as a buying zone, e.g. `-0.3`.
    pub threshold: f64,
    pub years: u32,
}

impl DrawdownWatch {
    #[must_use]
    pub fn new(threshold: f64, years: u32) -> Self {
        Self { threshold, years }
    }

    /// Computes drawdowns for each ticker, writes all rows to `report_path`
    /// and logs one block per ticker.
    pub async fn run(
        &self,
        source: &dyn PriceSource,
        tickers: &[String],
        report_path: &Path,
    ) -> Result<Vec<DrawdownSummary>> {
        let mut report = Vec::new();
        let mut summaries = Vec::new();

        for ticker in tickers {
            let bars = match source.daily_months(ticker, self.years * 12).await {
                Ok(bars) => bars,
                Err(e) => {
                    tracing::error!("Drawdown: failed to load {}: {:#}", ticker, e);
                    continue;
                }
            };
            let rows = drawdown_rows(ticker, &bars);
            let summary = summarize(ticker, &rows, self.threshold);

            ResultBlock::new(format!("Maximum Drawdown of {ticker}"))
                .row("Max Drawdown", format!("{:.2}%", summary.max_drawdown * 100.0))
                .row("Current Drawdown", format!("{:.2}%", summary.current * 100.0))
                .row(
                    format!("Days below {:.0}%", self.threshold * 100.0),
                    summary.breaches,
                )
                .row(
                    "Last Breach",
                    summary
                        .last_breach
                        .map_or_else(|| "-".to_string(), |d| d.to_string()),
                )
                .log();

            report.extend(rows);
            summaries.push(summary);
        }

        CsvStorage::write_records(report_path, &report)?;
        tracing::info!("Wrote {} drawdown rows to {}", report.len(), report_path.display());
        Ok(summaries)
    }
}
