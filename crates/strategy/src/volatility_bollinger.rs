//! Volatility-filtered Bollinger band mean reversion.
//!
//! The BB(20, 2) channel is widened by half its width on each side. A bar
//! buys when the close sits in the lower quarter of the widened channel
//! while band volatility is above its usual floor, and sells in the upper
//! quarter.

use crate::indicators::{bollinger, percent_position};
use quant_batch_backtest::{evaluate, sequential_pairs, Sizing, StrategyOutcome};
use quant_batch_core::{closes, Bar, ResultBlock, Signal, Timeframe};
use serde::{Deserialize, Serialize};

pub const BAND_LENGTH: usize = 20;
pub const BAND_STD: f64 = 2.0;

/// Band features of one bar with fully formed bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRow {
    pub close: f64,
    /// Close position inside the widened channel, in `[0, 1]`.
    pub close_pct: f64,
    /// `upper / lower - 1`.
    pub volatility: f64,
}

/// Buy and sell thresholds on band features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub min_volatility: f64,
    pub max_buy_pct: f64,
    pub min_sell_pct: f64,
}

/// Band rows of a close series. Warm-up bars are dropped.
#[must_use]
pub fn band_rows(closes: &[f64]) -> Vec<BandRow> {
    let bands = bollinger(closes, BAND_LENGTH, BAND_STD);
    (0..closes.len())
        .filter(|&i| bands.is_valid(i))
        .map(|i| {
            let width = bands.upper[i] - bands.lower[i];
            let high_limit = bands.upper[i] + width / 2.0;
            let low_limit = bands.lower[i] - width / 2.0;
            BandRow {
                close: closes[i],
                close_pct: percent_position(closes[i], low_limit, high_limit),
                volatility: bands.upper[i] / bands.lower[i] - 1.0,
            }
        })
        .collect()
}

/// Mean volatility minus one sample standard deviation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn min_volatility(rows: &[BandRow]) -> f64 {
    let values: Vec<f64> = rows
        .iter()
        .map(|r| r.volatility)
        .filter(|v| v.is_finite())
        .collect();
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    mean - variance.sqrt()
}

/// One signal per row; a sell overrides a buy.
#[must_use]
pub fn signals(rows: &[BandRow], thresholds: &BandThresholds) -> Vec<Signal> {
    rows.iter()
        .map(|row| {
            Signal::from_conditions(
                row.volatility > thresholds.min_volatility
                    && row.close_pct < thresholds.max_buy_pct,
                row.close_pct > thresholds.min_sell_pct,
            )
        })
        .collect()
}

/// Runs the fixed-threshold strategy on one history file.
pub struct VolatilityBollinger {
    max_buy_pct: f64,
    min_sell_pct: f64,
}

impl Default for VolatilityBollinger {
    fn default() -> Self {
        Self {
            max_buy_pct: 0.25,
            min_sell_pct: 0.75,
        }
    }
}

impl VolatilityBollinger {
    /// Open on a buy while flat, close on the next sell, one share per trade.
    #[must_use]
    pub fn backtest(&self, bars: &[Bar]) -> StrategyOutcome {
        let rows = band_rows(&closes(bars));
        let thresholds = BandThresholds {
            min_volatility: min_volatility(&rows),
            max_buy_pct: self.max_buy_pct,
            min_sell_pct: self.min_sell_pct,
        };
        let prices: Vec<f64> = rows.iter().map(|r| r.close).collect();
        let pairs = sequential_pairs(&prices, &signals(&rows, &thresholds));
        evaluate(&pairs, Sizing::Unit)
    }

    /// Backtests and logs the result block. Empty histories log nothing.
    pub fn run(&self, ticker: &str, timeframe: Timeframe, bars: &[Bar]) -> Option<StrategyOutcome> {
        if bars.is_empty() {
            tracing::warn!("No {} bars for {}", timeframe, ticker);
            return None;
        }
        let outcome = self.backtest(bars);
        ResultBlock::new(format!(
            "Volatility-Bollinger Bands Strategy: Result of {ticker} for timeframe {timeframe}"
        ))
        .outcome(outcome.profit, outcome.wins, outcome.losses)
        .log();
        Some(outcome)
    }
}
