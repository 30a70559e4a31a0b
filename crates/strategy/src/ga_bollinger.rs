//! Volatility-Bollinger thresholds tuned by a genetic search.
//!
//! The genes are the three thresholds of the fixed strategy: minimum band
//! volatility, maximum channel position to buy and minimum position to
//! sell. Fitness is the unsized profit over the training rows.

use crate::volatility_bollinger::{band_rows, signals, BandRow, BandThresholds};
use anyhow::Result;
use quant_batch_backtest::{
    buy_and_hold, evaluate, extract_trade_pairs, train_test_split, GeneSpace, GeneticAlgorithm,
    GeneticSettings, Sizing, StrategyOutcome,
};
use quant_batch_core::{banner, closes, Bar, GeneticConfig, ResultBlock, Timeframe};

/// Unsized outcome of `thresholds` over `rows`.
#[must_use]
pub fn outcome(rows: &[BandRow], thresholds: &BandThresholds) -> StrategyOutcome {
    let prices: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let pairs = extract_trade_pairs(&prices, &signals(rows, thresholds));
    evaluate(&pairs, Sizing::Unit)
}

fn thresholds(genes: &[f64]) -> BandThresholds {
    BandThresholds {
        min_volatility: genes[0],
        max_buy_pct: genes[1],
        min_sell_pct: genes[2],
    }
}

/// Result of one train/test run.
#[derive(Debug, Clone, PartialEq)]
pub struct TunedResult {
    pub thresholds: BandThresholds,
    pub train: StrategyOutcome,
    pub test: StrategyOutcome,
    pub train_buy_and_hold: f64,
    pub test_buy_and_hold: f64,
}

pub struct GaBollinger {
    config: GeneticConfig,
    cash: f64,
}

impl GaBollinger {
    #[must_use]
    pub fn new(config: GeneticConfig, cash: f64) -> Self {
        Self { config, cash }
    }

    fn settings(&self) -> GeneticSettings {
        GeneticSettings {
            generations: self.config.generations,
            solutions: self.config.threshold_solutions,
            parents_mating: self.config.parents_mating,
            mutation_genes: 1,
            seed: self.config.threshold_seed,
        }
    }

    /// Splits the rows, searches thresholds on the training part and
    /// scores them on both parts.
    pub fn optimize(&self, bars: &[Bar]) -> Result<TunedResult> {
        let rows = band_rows(&closes(bars));
        let (train, test) = train_test_split(
            &rows,
            self.config.test_fraction,
            self.config.split,
            self.config.split_seed,
        );
        if train.is_empty() || test.is_empty() {
            anyhow::bail!("not enough rows to split: {}", rows.len());
        }

        let ga = GeneticAlgorithm::new(vec![GeneSpace::range(0.0, 1.0); 3], self.settings());
        let best = ga
            .run(|genes| outcome(&train, &thresholds(genes)).profit)
            .ok_or_else(|| anyhow::anyhow!("genetic search produced no solution"))?;
        let tuned = thresholds(&best.genes);

        let prices = |rows: &[BandRow]| rows.iter().map(|r| r.close).collect::<Vec<f64>>();
        Ok(TunedResult {
            thresholds: tuned,
            train: outcome(&train, &tuned),
            test: outcome(&test, &tuned),
            train_buy_and_hold: buy_and_hold(&prices(&train), self.cash),
            test_buy_and_hold: buy_and_hold(&prices(&test), self.cash),
        })
    }

    /// Optimizes one history and logs the parameters and both results.
    pub fn run(&self, ticker: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<TunedResult> {
        tracing::info!("{}", banner(""));
        tracing::info!("{}", banner(&format!(" PROCESSING TIMEFRAME {timeframe} ")));
        tracing::info!("{}", banner(""));

        let result = self.optimize(bars)?;
        let t = &result.thresholds;
        ResultBlock::new(format!("{ticker} Best Solution Parameters for timeframe {timeframe}"))
            .row("Min Volatility", format!("{:6.4}", t.min_volatility))
            .row("Max Perc to Buy", format!("{:6.4}", t.max_buy_pct))
            .row("Min Perc to Sell", format!("{:6.4}", t.min_sell_pct))
            .log();

        for (label, o, bh) in [
            ("TRAIN", result.train, result.train_buy_and_hold),
            ("TEST", result.test, result.test_buy_and_hold),
        ] {
            ResultBlock::new(format!("{ticker} Result for timeframe {timeframe} ({label})"))
                .row("Profit / Loss (B&H)", format!("{bh:.2}"))
                .row("Profit / Loss (Strategy)", format!("{:.2}", o.profit))
                .row("Wins / Losses", format!("{} / {}", o.wins, o.losses))
                .row("Win Rate", format!("{:.2}%", o.win_rate()))
                .log();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use quant_batch_core::StrategyConfig;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::hours(i64::try_from(i).unwrap()),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0.0,
            })
            .collect()
    }

    fn config() -> GeneticConfig {
        let mut config = StrategyConfig::default().genetic;
        config.generations = 30;
        config.threshold_seed = Some(7);
        config
    }

    #[test]
    fn test_outcome_uses_filtered_pairs() {
        let row = |close, close_pct| BandRow {
            close,
            close_pct,
            volatility: 0.1,
        };
        let rows = [row(10.0, 0.9), row(8.0, 0.1), row(9.0, 0.1), row(12.0, 0.9)];
        let thresholds = BandThresholds {
            min_volatility: 0.0,
            max_buy_pct: 0.25,
            min_sell_pct: 0.75,
        };
        let result = outcome(&rows, &thresholds);
        assert!((result.profit - 4.0).abs() < 1e-9);
        assert_eq!((result.wins, result.losses), (1, 0));
    }

    #[test]
    fn test_optimize_finds_profitable_thresholds() {
        let closes: Vec<f64> = (0..600_usize)
            .map(|i| match i % 80 {
                10 => 95.0,
                50 => 105.0,
                _ if i % 2 == 0 => 100.5,
                _ => 99.5,
            })
            .collect();
        let result = GaBollinger::new(config(), 10_000.0)
            .optimize(&bars(&closes))
            .unwrap();

        assert!(result.train.profit > 0.0);
        assert!((0.0..1.0).contains(&result.thresholds.max_buy_pct));
        assert!(result.train_buy_and_hold.is_finite());
    }

    #[test]
    fn test_optimize_rejects_short_history() {
        let result = GaBollinger::new(config(), 10_000.0).optimize(&bars(&[1.0; 10]));
        assert!(result.is_err());
    }
}
