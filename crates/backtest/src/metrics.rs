use quant_batch_core::win_rate_pct;
use serde::{Deserialize, Serialize};

/// Realized result of a strategy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub profit: f64,
    pub wins: usize,
    pub losses: usize,
}

impl StrategyOutcome {
    /// Winning share of the decided trades in percent, 0 without trades.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate(&self) -> f64 {
        win_rate_pct(self.wins as f64, self.losses as f64)
    }

    #[must_use]
    pub fn trades(&self) -> usize {
        self.wins + self.losses
    }
}

/// Accumulates per-trade rewards.
///
/// Zero rewards count as neither win nor loss.
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    profit: f64,
    wins: usize,
    losses: usize,
}

impl MetricsCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a realized trade reward.
    pub fn add_trade(&mut self, pnl: f64) {
        self.profit += pnl;
        if pnl > 0.0 {
            self.wins += 1;
        } else if pnl < 0.0 {
            self.losses += 1;
        }
    }

    /// Profit, wins and losses so far.
    #[must_use]
    pub fn outcome(&self) -> StrategyOutcome {
        StrategyOutcome {
            profit: self.profit,
            wins: self.wins,
            losses: self.losses,
        }
    }
}
