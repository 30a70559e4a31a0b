//! Commitment of Traders positioning as a timing signal.
//!
//! Each weekly report is matched with the last close on or before its
//! report date. Bollinger bands are then drawn over one positioning field
//! instead of the price, and extremes of that field trade the ticker.

use crate::indicators::{bollinger, percent_position};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use quant_batch_backtest::{evaluate, extract_trade_pairs, Sizing, StrategyOutcome};
use quant_batch_core::{PriceSource, ResultBlock, Signal};
use quant_batch_data::{CsvStorage, SentimentRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Positioning fields of the financial futures report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CotField {
    DealerLong,
    DealerShort,
    LevMoneyLong,
    LevMoneyShort,
}

impl CotField {
    pub const ALL: [CotField; 4] = [
        Self::DealerLong,
        Self::DealerShort,
        Self::LevMoneyLong,
        Self::LevMoneyShort,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DealerLong => "dealer_long",
            Self::DealerShort => "dealer_short",
            Self::LevMoneyLong => "lev_money_long",
            Self::LevMoneyShort => "lev_money_short",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::DealerLong => 0,
            Self::DealerShort => 1,
            Self::LevMoneyLong => 2,
            Self::LevMoneyShort => 3,
        }
    }
}

impl std::fmt::Display for CotField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report joined with the ticker close.
#[derive(Debug, Clone, PartialEq)]
pub struct CotRow {
    pub report_date: NaiveDate,
    pub quote_date: NaiveDate,
    pub close: f64,
    /// Field values in [`CotField::ALL`] order.
    pub fields: [f64; 4],
}

impl CotRow {
    #[must_use]
    pub fn field(&self, field: CotField) -> f64 {
        self.fields[field.index()]
    }
}

/// Joins each report with the last close dated on or before it, at most
/// `tolerance_days` earlier. Reports without a close or with a missing
/// field are dropped. Both inputs must be sorted by date.
#[must_use]
pub fn merge_asof(
    sentiment: &[SentimentRecord],
    closes: &[(NaiveDate, f64)],
    tolerance_days: i64,
) -> Vec<CotRow> {
    let tolerance = Duration::days(tolerance_days);
    let mut rows = Vec::new();
    let mut cursor = 0usize;

    for record in sentiment {
        while cursor < closes.len() && closes[cursor].0 <= record.report_date {
            cursor += 1;
        }
        let Some(&(quote_date, close)) = cursor.checked_sub(1).and_then(|i| closes.get(i)) else {
            continue;
        };
        if record.report_date - quote_date > tolerance || !close.is_finite() {
            continue;
        }
        let Some(fields) = record.fields() else {
            continue;
        };
        rows.push(CotRow {
            report_date: record.report_date,
            quote_date,
            close,
            fields,
        });
    }
    rows
}

/// Band thresholds applied to a positioning field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CotParams {
    pub band_length: usize,
    pub band_std: f64,
    pub min_bandwidth: f64,
    pub max_buy_pct: f64,
    pub min_sell_pct: f64,
    pub cash: f64,
    pub tolerance_days: i64,
}

impl Default for CotParams {
    fn default() -> Self {
        Self {
            band_length: 20,
            band_std: 2.0,
            min_bandwidth: 0.0,
            max_buy_pct: 0.25,
            min_sell_pct: 0.75,
            cash: 10_000.0,
            tolerance_days: 7,
        }
    }
}

/// One signal per row from the bands over `field`.
#[must_use]
pub fn field_signals(rows: &[CotRow], field: CotField, params: &CotParams) -> Vec<Signal> {
    let values: Vec<f64> = rows.iter().map(|r| r.field(field)).collect();
    let bands = bollinger(&values, params.band_length, params.band_std);

    (0..rows.len())
        .map(|i| {
            if !bands.is_valid(i) {
                return Signal::Hold;
            }
            let width = bands.upper[i] - bands.lower[i];
            let pct = percent_position(
                values[i],
                bands.lower[i] - width / 2.0,
                bands.upper[i] + width / 2.0,
            );
            let bandwidth = (bands.bandwidth[i] / 100.0).clamp(0.0, 1.0);
            if pct.is_nan() || bandwidth.is_nan() {
                return Signal::Hold;
            }
            Signal::from_conditions(
                bandwidth > params.min_bandwidth && pct < params.max_buy_pct,
                pct > params.min_sell_pct,
            )
        })
        .collect()
}

/// Outcome of trading the ticker on one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOutcome {
    pub field: CotField,
    pub outcome: StrategyOutcome,
}

pub struct CotStrategy {
    params: CotParams,
}

impl CotStrategy {
    #[must_use]
    pub fn new(params: CotParams) -> Self {
        Self { params }
    }

    /// Sized backtest of every field over the joined rows.
    #[must_use]
    pub fn evaluate(&self, rows: &[CotRow]) -> Vec<FieldOutcome> {
        let prices: Vec<f64> = rows.iter().map(|r| r.close).collect();
        CotField::ALL
            .iter()
            .map(|&field| {
                let signals = field_signals(rows, field, &self.params);
                let pairs = extract_trade_pairs(&prices, &signals);
                FieldOutcome {
                    field,
                    outcome: evaluate(&pairs, Sizing::Cash(self.params.cash)),
                }
            })
            .collect()
    }

    /// Refreshes the ticker file over the report period, joins it with the
    /// sentiment rows and logs one block per field.
    pub async fn run(
        &self,
        source: &dyn PriceSource,
        ticker: &str,
        sentiment: &[SentimentRecord],
        ticker_file: &Path,
    ) -> Result<Vec<FieldOutcome>> {
        let (Some(first), Some(last)) = (sentiment.first(), sentiment.last()) else {
            anyhow::bail!("no sentiment rows for {ticker}");
        };

        let bars = source
            .daily_range(ticker, first.report_date, last.report_date)
            .await
            .with_context(|| format!("failed to fetch daily bars for {ticker}"))?;
        if bars.is_empty() {
            tracing::warn!("No daily bars for {}, reusing {}", ticker, ticker_file.display());
        } else {
            CsvStorage::write_closes(ticker_file, &bars)?;
        }
        let closes = CsvStorage::read_closes(ticker_file)?;

        let rows = merge_asof(sentiment, &closes, self.params.tolerance_days);
        tracing::debug!("{}: {} sentiment rows joined with closes", ticker, rows.len());

        let outcomes = self.evaluate(&rows);
        for result in &outcomes {
            let o = result.outcome;
            ResultBlock::new(format!("Result of {ticker} for (Field: {})", result.field))
                .row("Profit / Loss", format!("{:.2}", o.profit))
                .row("Wins / Losses", format!("{} / {}", o.wins, o.losses))
                .row(
                    format!("Win Rate (BB length={})", self.params.band_length),
                    format!("{:.2}%", o.win_rate()),
                )
                .log();
        }
        Ok(outcomes)
    }
}

impl Default for CotStrategy {
    fn default() -> Self {
        Self::new(CotParams::default())
    }
}
