//! Turning per-bar signals into open/close trade pairs.
//!
//! Two extraction styles are used by the strategies:
//!
//! - [`extract_trade_pairs`] filters the signal stream first (holds and
//!   repeated signals removed, a leading sell and a trailing buy dropped) and
//!   pairs what remains.
//! - [`sequential_pairs`] walks the bars, opening on a buy while flat and
//!   closing on the next sell.

use quant_batch_core::Signal;

/// A completed long trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePair {
    pub open_index: usize,
    pub close_index: usize,
    pub open_price: f64,
    pub close_price: f64,
}

impl TradePair {
    /// Price change per share.
    #[must_use]
    pub fn price_change(&self) -> f64 {
        self.close_price - self.open_price
    }
}

/// Indices of the operations that survive filtering.
///
/// Holds are removed, then every signal equal to the previous kept one,
/// then a leading sell and a trailing buy. The result alternates
/// buy, sell, buy, sell.
#[must_use]
pub fn filter_operations(signals: &[Signal]) -> Vec<usize> {
    let mut ops: Vec<usize> = Vec::new();
    let mut last: Option<Signal> = None;

    for (i, &signal) in signals.iter().enumerate() {
        if !signal.is_trade() || last == Some(signal) {
            continue;
        }
        ops.push(i);
        last = Some(signal);
    }

    if ops.first().is_some_and(|&i| signals[i] == Signal::Sell) {
        ops.remove(0);
    }
    if ops.last().is_some_and(|&i| signals[i] == Signal::Buy) {
        ops.pop();
    }
    ops
}

/// Pairs the filtered operations into trades.
///
/// `prices` and `signals` are aligned bar by bar.
#[must_use]
pub fn extract_trade_pairs(prices: &[f64], signals: &[Signal]) -> Vec<TradePair> {
    debug_assert_eq!(prices.len(), signals.len());

    filter_operations(signals)
        .chunks_exact(2)
        .map(|ops| TradePair {
            open_index: ops[0],
            close_index: ops[1],
            open_price: prices[ops[0]],
            close_price: prices[ops[1]],
        })
        .collect()
}

/// Open on a buy while flat, close on the next sell.
///
/// A position still open after the last bar is ignored.
#[must_use]
pub fn sequential_pairs(prices: &[f64], signals: &[Signal]) -> Vec<TradePair> {
    debug_assert_eq!(prices.len(), signals.len());

    let mut pairs = Vec::new();
    let mut open: Option<usize> = None;

    for (i, (&price, &signal)) in prices.iter().zip(signals).enumerate() {
        match (signal, open) {
            (Signal::Buy, None) => open = Some(i),
            (Signal::Sell, Some(open_index)) => {
                pairs.push(TradePair {
                    open_index,
                    close_index: i,
                    open_price: prices[open_index],
                    close_price: price,
                });
                open = None;
            }
            _ => {}
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signal::{Buy, Hold, Sell};

    #[test]
    fn test_filter_operations_drops_noise() {
        let signals = [Sell, Hold, Buy, Buy, Hold, Sell, Sell, Buy, Hold, Sell, Buy];
        assert_eq!(filter_operations(&signals), vec![2, 5, 7, 9]);
    }

    #[test]
    fn test_filter_operations_edge_cases() {
        assert!(filter_operations(&[]).is_empty());
        assert!(filter_operations(&[Hold, Hold]).is_empty());
        assert!(filter_operations(&[Sell]).is_empty());
        assert!(filter_operations(&[Buy]).is_empty());
        assert!(filter_operations(&[Sell, Buy]).is_empty());
        assert_eq!(filter_operations(&[Buy, Sell]), vec![0, 1]);
    }

    #[test]
    fn test_extract_trade_pairs() {
        let prices = [10.0, 11.0, 9.0, 12.0, 13.0, 12.5];
        let signals = [Buy, Buy, Sell, Buy, Sell, Buy];

        let pairs = extract_trade_pairs(&prices, &signals);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].open_price, 10.0);
        assert_eq!(pairs[0].close_price, 9.0);
        assert_eq!(pairs[0].price_change(), -1.0);
        assert_eq!(pairs[1].open_index, 3);
        assert_eq!(pairs[1].close_index, 4);
    }

    #[test]
    fn test_sequential_pairs_ignores_sell_while_flat() {
        let prices = [5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let signals = [Sell, Buy, Buy, Sell, Sell, Buy];

        let pairs = sequential_pairs(&prices, &signals);
        assert_eq!(
            pairs,
            vec![TradePair {
                open_index: 1,
                close_index: 3,
                open_price: 6.0,
                close_price: 8.0,
            }]
        );
    }
}
