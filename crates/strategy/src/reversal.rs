//! Outside-bar reversal patterns.

use quant_batch_backtest::{evaluate, sequential_pairs, Sizing, StrategyOutcome};
use quant_batch_core::{closes, Bar, ResultBlock, Signal, Timeframe};

/// Bullish reversal: a lower low that closes above the previous high after
/// opening below the previous close.
fn is_bullish(prev: &Bar, bar: &Bar) -> bool {
    bar.low < prev.low && bar.close > prev.high && bar.open < prev.close
}

/// Bearish reversal: a higher high that closes below the previous low after
/// opening above the previous open.
fn is_bearish(prev: &Bar, bar: &Bar) -> bool {
    bar.high > prev.high && bar.close < prev.low && bar.open > prev.open
}

/// One signal per bar. The first bar has no predecessor and holds.
#[must_use]
pub fn signals(bars: &[Bar]) -> Vec<Signal> {
    let mut out = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        out.push(Signal::Hold);
    }
    out.extend(
        bars.windows(2)
            .map(|w| Signal::from_conditions(is_bullish(&w[0], &w[1]), is_bearish(&w[0], &w[1]))),
    );
    out
}

/// Sequential open/close backtest, one share per trade.
#[must_use]
pub fn backtest(bars: &[Bar]) -> StrategyOutcome {
    let pairs = sequential_pairs(&closes(bars), &signals(bars));
    evaluate(&pairs, Sizing::Unit)
}

/// Backtests one history and logs the result block.
pub fn run(ticker: &str, timeframe: Timeframe, bars: &[Bar]) -> Option<StrategyOutcome> {
    if bars.is_empty() {
        tracing::warn!("No {} bars for {}", timeframe, ticker);
        return None;
    }
    let outcome = backtest(bars);
    ResultBlock::new(format!(
        "Reversal Strategy: Result of {ticker} for timeframe {timeframe}"
    ))
    .outcome(outcome.profit, outcome.wins, outcome.losses)
    .log();
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_bullish_and_bearish_patterns() {
        let bars = [
            bar(100.0, 101.0, 99.0, 100.0),
            // lower low, close above prior high, open below prior close
            bar(99.5, 102.0, 98.0, 101.5),
            bar(101.5, 102.5, 100.5, 102.0),
            // higher high, close below prior low, open above prior open
            bar(102.0, 103.0, 99.0, 100.0),
        ];
        assert_eq!(
            signals(&bars),
            vec![Signal::Hold, Signal::Buy, Signal::Hold, Signal::Sell]
        );

        let outcome = backtest(&bars);
        assert!((outcome.profit - (100.0 - 101.5)).abs() < 1e-9);
        assert_eq!((outcome.wins, outcome.losses), (0, 1));
    }

    #[test]
    fn test_signals_empty_and_single() {
        assert!(signals(&[]).is_empty());
        assert_eq!(signals(&[bar(1.0, 1.0, 1.0, 1.0)]), vec![Signal::Hold]);
    }
}
