//! Long-only trend following with a stop loss and a trailing stop.
//!
//! The account waits for a run of green bars, buys as many whole shares as
//! the cash allows, and exits when the close falls below the stop. Once the
//! close has gained enough over the entry the stop trails the close.

use anyhow::{Context, Result};
use quant_batch_core::{Bar, ResultBlock, Timeframe};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signed length of the current run of same-colour bars: positive for
/// green runs, negative for red ones.
#[must_use]
pub fn bar_counts(bars: &[Bar]) -> Vec<i64> {
    let mut counts = Vec::with_capacity(bars.len());
    let mut run = 0i64;
    let mut previous: Option<bool> = None;

    for bar in bars {
        let green = bar.is_green();
        run = if previous == Some(green) { run + 1 } else { 1 };
        previous = Some(green);
        counts.push(if green { run } else { -run });
    }
    counts
}

/// Percentages are in percent, e.g. `-2` for a 2% stop loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendParams {
    pub cash: Decimal,
    pub stop_loss_pct: Decimal,
    pub trailing_stop_pct: Decimal,
    pub trailing_trigger_pct: Decimal,
    pub green_bars_to_open: i64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            cash: Decimal::from(10_000),
            stop_loss_pct: Decimal::from(-2),
            trailing_stop_pct: Decimal::from(-1),
            trailing_trigger_pct: Decimal::from(2),
            green_bars_to_open: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Wait,
    Long {
        open_price: Decimal,
        shares: Decimal,
        trailing_trigger: Decimal,
        stop_price: Decimal,
    },
}

/// Final account state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendOutcome {
    /// Cash after the last position is liquidated at the final close.
    pub final_cash: Decimal,
    pub entries: usize,
    pub stop_outs: usize,
}

fn percent_of(price: Decimal, pct: Decimal) -> Decimal {
    price * (Decimal::ONE + pct / Decimal::ONE_HUNDRED)
}

fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).with_context(|| format!("price {value} is not representable"))
}

pub struct TrendFollowing {
    params: TrendParams,
}

impl TrendFollowing {
    #[must_use]
    pub fn new(params: TrendParams) -> Self {
        Self { params }
    }

    /// Walks the bars oldest first.
    pub fn backtest(&self, bars: &[Bar]) -> Result<TrendOutcome> {
        let counts = bar_counts(bars);
        let mut cash = self.params.cash;
        let mut position = Position::Wait;
        let mut entries = 0;
        let mut stop_outs = 0;
        let mut last_close = Decimal::ZERO;

        for (bar, &count) in bars.iter().zip(&counts) {
            let close = to_decimal(bar.close)?;
            position = match position {
                Position::Wait if close > Decimal::ZERO && count >= self.params.green_bars_to_open => {
                    let shares = (cash / close).floor();
                    cash -= shares * close;
                    entries += 1;
                    Position::Long {
                        open_price: close,
                        shares,
                        trailing_trigger: percent_of(close, self.params.trailing_trigger_pct),
                        stop_price: percent_of(close, self.params.stop_loss_pct),
                    }
                }
                Position::Wait => Position::Wait,
                Position::Long {
                    shares, stop_price, ..
                } if close < stop_price => {
                    cash += shares * close;
                    stop_outs += 1;
                    Position::Wait
                }
                Position::Long {
                    open_price,
                    shares,
                    trailing_trigger,
                    stop_price,
                } => {
                    let stop_price = if open_price < close && close > trailing_trigger {
                        stop_price.max(percent_of(close, self.params.trailing_stop_pct))
                    } else {
                        stop_price
                    };
                    Position::Long {
                        open_price,
                        shares,
                        trailing_trigger,
                        stop_price,
                    }
                }
            };

            let (state, open_price, shares) = match position {
                Position::Wait => ("WAIT", Decimal::ZERO, Decimal::ZERO),
                Position::Long {
                    open_price, shares, ..
                } => ("LONG", open_price, shares),
            };
            tracing::debug!(
                "{}: {:<5}: {:>8} - Cash: {:>8} - Shares: {:>4} - CURR PRICE: {:>8} - CURR POS: {}",
                bar.timestamp,
                state,
                open_price.round_dp(2),
                cash.round_dp(2),
                shares,
                close.round_dp(2),
                (shares * close).round_dp(2)
            );
            last_close = close;
        }

        if let Position::Long { shares, .. } = position {
            cash += shares * last_close;
        }

        Ok(TrendOutcome {
            final_cash: cash,
            entries,
            stop_outs,
        })
    }

    /// Backtests one history and logs the final cash.
    pub fn run(&self, ticker: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<TrendOutcome> {
        let outcome = self.backtest(bars)?;
        let profit = (outcome.final_cash - self.params.cash).to_f64().unwrap_or(f64::NAN);
        ResultBlock::new(format!(
            "Trend Following Strategy: RESULT of {ticker} for {timeframe}"
        ))
        .row("Cash after Trade", outcome.final_cash.round_dp(2))
        .row("Profit / Loss", format!("{profit:.2}"))
        .row("Entries / Stop outs", format!("{} / {}", outcome.entries, outcome.stop_outs))
        .log();
        Ok(outcome)
    }
}

impl Default for TrendFollowing {
    fn default() -> Self {
        Self::new(TrendParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candles(ohlc: &[(f64, f64)]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        ohlc.iter()
            .enumerate()
            .map(|(i, &(open, close))| Bar {
                timestamp: start + Duration::days(i64::try_from(i).unwrap()),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_bar_counts() {
        let bars = candles(&[(1.0, 2.0), (2.0, 3.0), (3.0, 2.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0)]);
        assert_eq!(bar_counts(&bars), vec![1, 2, -1, -2, -3, 1]);
    }

    #[test]
    fn test_opens_after_four_green_bars_and_liquidates() {
        let bars = candles(&[
            (99.0, 100.0),
            (100.0, 101.0),
            (101.0, 102.0),
            (102.0, 103.0), // fourth green bar: buy 97 shares at 103
            (103.0, 104.0),
        ]);
        let outcome = TrendFollowing::default().backtest(&bars).unwrap();
        assert_eq!(outcome.entries, 1);
        assert_eq!(outcome.stop_outs, 0);
        // 10000 - 97 * 103 + 97 * 104
        assert_eq!(outcome.final_cash, dec!(10097));
    }

    #[test]
    fn test_stop_loss_exits() {
        let bars = candles(&[
            (96.0, 97.0),
            (97.0, 98.0),
            (98.0, 99.0),
            (99.0, 100.0), // buy 100 shares at 100, stop at 98
            (100.0, 97.0), // below the stop
            (97.0, 96.0),
        ]);
        let outcome = TrendFollowing::default().backtest(&bars).unwrap();
        assert_eq!(outcome.stop_outs, 1);
        assert_eq!(outcome.final_cash, dec!(9700));
    }

    #[test]
    fn test_trailing_stop_locks_gain() {
        let bars = candles(&[
            (96.0, 97.0),
            (97.0, 98.0),
            (98.0, 99.0),
            (99.0, 100.0), // buy 100 shares at 100, trigger 102
            (100.0, 110.0), // stop trails to 108.9
            (110.0, 108.0), // below the trailed stop
        ]);
        let outcome = TrendFollowing::default().backtest(&bars).unwrap();
        assert_eq!(outcome.stop_outs, 1);
        assert_eq!(outcome.final_cash, dec!(10800));
    }

    #[test]
    fn test_no_entry_without_green_run() {
        let bars = candles(&[(2.0, 1.0), (1.0, 2.0), (2.0, 1.0)]);
        let outcome = TrendFollowing::default().backtest(&bars).unwrap();
        assert_eq!(outcome.entries, 0);
        assert_eq!(outcome.final_cash, dec!(10000));
    }
}
