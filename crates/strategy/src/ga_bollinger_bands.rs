//! Separate buy and sell Bollinger bands tuned by a genetic search.
//!
//! A close under the lower buy band buys, a close over the upper sell band
//! sells. The search tunes the length and width of both bands. Results are
//! grouped into 3-month windows so that a parameter set must trade steadily
//! to score well: until the mean number of trades per window exceeds
//! [`MIN_OPERATIONS`] the fitness only counts trades.

use crate::indicators::bollinger;
use anyhow::Result;
use quant_batch_backtest::{
    buy_and_hold, extract_trade_pairs, month_windows, train_test_split, GeneSpace,
    GeneticAlgorithm, GeneticSettings, Sizing, TradePair,
};
use quant_batch_core::{banner, win_rate_pct, Bar, GeneticConfig, ResultBlock, Signal, Timeframe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trades per window a search must reach before profit counts.
pub const MIN_OPERATIONS: f64 = 252.0;
const WINDOW_MONTHS: u32 = 3;

/// Buy and sell band parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    pub buy_length: usize,
    pub buy_std: f64,
    pub sell_length: usize,
    pub sell_std: f64,
}

impl BandParams {
    /// Decodes `[buy_length, buy_std, sell_length, sell_std]` genes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_genes(genes: &[f64]) -> Self {
        let round3 = |v: f64| (v * 1_000.0).round() / 1_000.0;
        Self {
            buy_length: genes[0].max(1.0) as usize,
            buy_std: round3(genes[1]),
            sell_length: genes[2].max(1.0) as usize,
            sell_std: round3(genes[3]),
        }
    }

    #[must_use]
    pub fn gene_spaces() -> Vec<GeneSpace> {
        vec![
            GeneSpace::stepped(1.0, 200.0, 1.0),
            GeneSpace::stepped(0.1, 3.0, 0.01),
            GeneSpace::stepped(1.0, 200.0, 1.0),
            GeneSpace::stepped(0.1, 3.0, 0.01),
        ]
    }
}

/// One signal per close. Rows where either band is undefined hold.
#[must_use]
pub fn band_signals(closes: &[f64], params: &BandParams) -> Vec<Signal> {
    let buy = bollinger(closes, params.buy_length, params.buy_std);
    let sell = bollinger(closes, params.sell_length, params.sell_std);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            if buy.is_valid(i) && sell.is_valid(i) {
                Signal::from_conditions(close < buy.lower[i], close > sell.upper[i])
            } else {
                Signal::Hold
            }
        })
        .collect()
}

/// Windowed result of a parameter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    /// Fitness value.
    pub reward: f64,
    /// Mean winning trades per window.
    pub wins: f64,
    /// Mean losing trades per window.
    pub losses: f64,
    /// Total profit over all windows.
    pub pnl: f64,
}

impl WindowResult {
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        win_rate_pct(self.wins, self.losses)
    }
}

#[derive(Default)]
struct Window {
    reward: f64,
    wins: usize,
    losses: usize,
}

/// Groups the sized trade rewards by closing date into 3-month windows
/// ending on month ends, the first holding only the month of the first
/// operation. Windows without a win or a loss are dropped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn window_result(bars: &[Bar], pairs: &[TradePair], cash: f64, is_test: bool) -> WindowResult {
    let dates: Vec<_> = pairs
        .iter()
        .flat_map(|p| [bars[p.open_index].timestamp, bars[p.close_index].timestamp])
        .collect();
    let window_of = month_windows(&dates, WINDOW_MONTHS);

    let sizing = Sizing::Cash(cash);
    let mut windows: BTreeMap<i64, Window> = BTreeMap::new();
    for (k, pair) in pairs.iter().enumerate() {
        let reward = sizing.reward(pair);
        let window = windows.entry(window_of[2 * k + 1]).or_default();
        window.reward += reward;
        if reward > 0.0 {
            window.wins += 1;
        } else if reward < 0.0 {
            window.losses += 1;
        }
    }
    let windows: Vec<Window> = windows
        .into_values()
        .filter(|w| w.wins + w.losses > 0)
        .collect();

    if windows.is_empty() {
        return WindowResult {
            reward: if is_test { 0.0 } else { -MIN_OPERATIONS },
            ..WindowResult::default()
        };
    }

    let n = windows.len() as f64;
    let wins = windows.iter().map(|w| w.wins as f64).sum::<f64>() / n;
    let losses = windows.iter().map(|w| w.losses as f64).sum::<f64>() / n;
    let pnl = windows.iter().map(|w| w.reward).sum::<f64>();
    let reward = if MIN_OPERATIONS < wins + losses || is_test {
        pnl / n
    } else {
        -MIN_OPERATIONS + wins + losses
    };

    WindowResult {
        reward,
        wins,
        losses,
        pnl,
    }
}

/// Signals, trade pairs and windowed result of `params` over `bars`.
#[must_use]
pub fn evaluate_params(bars: &[Bar], params: &BandParams, cash: f64, is_test: bool) -> WindowResult {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let pairs = extract_trade_pairs(&closes, &band_signals(&closes, params));
    window_result(bars, &pairs, cash, is_test)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandSearchResult {
    pub params: BandParams,
    pub train: WindowResult,
    pub test: WindowResult,
    pub train_buy_and_hold: f64,
    pub test_buy_and_hold: f64,
}

pub struct GaBollingerBands {
    config: GeneticConfig,
    cash: f64,
}

impl GaBollingerBands {
    #[must_use]
    pub fn new(config: GeneticConfig, cash: f64) -> Self {
        Self { config, cash }
    }

    fn settings(&self) -> GeneticSettings {
        GeneticSettings {
            generations: self.config.generations,
            solutions: self.config.band_solutions,
            parents_mating: self.config.parents_mating,
            mutation_genes: 1,
            seed: self.config.band_seed,
        }
    }

    pub fn optimize(&self, bars: &[Bar]) -> Result<BandSearchResult> {
        let rows: Vec<Bar> = bars.iter().filter(|b| b.close.is_finite()).copied().collect();
        let (train, test) = train_test_split(
            &rows,
            self.config.test_fraction,
            self.config.split,
            self.config.split_seed,
        );
        if train.is_empty() || test.is_empty() {
            anyhow::bail!("not enough bars to split: {}", rows.len());
        }

        let ga = GeneticAlgorithm::new(BandParams::gene_spaces(), self.settings());
        let best = ga
            .run(|genes| evaluate_params(&train, &BandParams::from_genes(genes), self.cash, false).reward)
            .ok_or_else(|| anyhow::anyhow!("genetic search produced no solution"))?;
        let params = BandParams::from_genes(&best.genes);

        let prices = |rows: &[Bar]| rows.iter().map(|b| b.close).collect::<Vec<f64>>();
        Ok(BandSearchResult {
            params,
            train: evaluate_params(&train, &params, self.cash, false),
            test: evaluate_params(&test, &params, self.cash, true),
            train_buy_and_hold: buy_and_hold(&prices(&train), self.cash),
            test_buy_and_hold: buy_and_hold(&prices(&test), self.cash),
        })
    }

    pub fn run(&self, ticker: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<BandSearchResult> {
        tracing::info!("{}", banner(""));
        tracing::info!("{}", banner(" PROCESSING DATA "));
        tracing::info!("{}", banner(""));

        let result = self.optimize(bars)?;
        let p = &result.params;
        ResultBlock::new(format!("{ticker} Best Solution Parameters for timeframe {timeframe}"))
            .row("Buy Length", p.buy_length)
            .row("Buy Std", format!("{:.2}", p.buy_std))
            .row("Sell Length", p.sell_length)
            .row("Sell Std", format!("{:.2}", p.sell_std))
            .log();

        for (label, r, bh) in [
            ("TRAIN", result.train, result.train_buy_and_hold),
            ("TEST", result.test, result.test_buy_and_hold),
        ] {
            ResultBlock::new(format!("{ticker} Result for timeframe {timeframe} ({label})"))
                .row("Reward", format!("{:.2}", r.reward))
                .row("Profit / Loss (B&H)", format!("{bh:.2}"))
                .row("Profit / Loss (Strategy)", format!("{:.2}", r.pnl))
                .row("Wins / Losses", format!("{:.2} / {:.2}", r.wins, r.losses))
                .row("Win Rate", format!("{:.2}%", r.win_rate()))
                .log();
        }
        Ok(result)
    }
}
