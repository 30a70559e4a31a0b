//! Profit and loss of trade pairs.

use crate::metrics::{MetricsCalculator, StrategyOutcome};
use crate::trades::TradePair;

/// Position size of each trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// One share per trade.
    Unit,
    /// As many whole shares as the cash buys at the open price.
    Cash(f64),
}

impl Sizing {
    /// Shares bought at `price`.
    #[must_use]
    pub fn shares(&self, price: f64) -> f64 {
        match *self {
            Self::Unit => 1.0,
            Self::Cash(cash) if price > 0.0 => (cash / price).floor(),
            Self::Cash(_) => 0.0,
        }
    }

    /// Realized reward of one trade.
    #[must_use]
    pub fn reward(&self, pair: &TradePair) -> f64 {
        pair.price_change() * self.shares(pair.open_price)
    }
}

/// Sums the rewards of `pairs`.
#[must_use]
pub fn evaluate(pairs: &[TradePair], sizing: Sizing) -> StrategyOutcome {
    let mut calc = MetricsCalculator::new();
    for pair in pairs {
        calc.add_trade(sizing.reward(pair));
    }
    calc.outcome()
}

/// Profit of buying whole shares with `cash` at the first price and
/// holding to the last.
#[must_use]
pub fn buy_and_hold(prices: &[f64], cash: f64) -> f64 {
    match (prices.first(), prices.last()) {
        (Some(&first), Some(&last)) => (last - first) * Sizing::Cash(cash).shares(first),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(open_price: f64, close_price: f64) -> TradePair {
        TradePair {
            open_index: 0,
            close_index: 1,
            open_price,
            close_price,
        }
    }

    #[test]
    fn test_cash_sizing_uses_whole_shares() {
        let sizing = Sizing::Cash(10_000.0);
        assert_eq!(sizing.shares(300.0), 33.0);
        assert_eq!(sizing.shares(0.0), 0.0);
        assert!((sizing.reward(&pair(300.0, 310.0)) - 330.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_unit_and_cash() {
        let pairs = [pair(100.0, 104.0), pair(105.0, 101.0), pair(99.0, 99.0)];

        let unit = evaluate(&pairs, Sizing::Unit);
        assert!((unit.profit - 0.0).abs() < 1e-9);
        assert_eq!((unit.wins, unit.losses), (1, 1));

        let sized = evaluate(&pairs, Sizing::Cash(1_000.0));
        // 10 shares * 4 - 9 shares * 4
        assert!((sized.profit - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_buy_and_hold() {
        assert!((buy_and_hold(&[250.0, 260.0, 270.0], 10_000.0) - 800.0).abs() < 1e-9);
        assert_eq!(buy_and_hold(&[], 10_000.0), 0.0);
    }
}
