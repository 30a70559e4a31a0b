pub mod genetic;
pub mod metrics;
pub mod pnl;
pub mod resample;
pub mod split;
pub mod trades;

pub use genetic::{GeneSpace, GeneticAlgorithm, GeneticSettings, Solution};
pub use metrics::{MetricsCalculator, StrategyOutcome};
pub use pnl::{buy_and_hold, evaluate, Sizing};
pub use resample::{month_windows, resample_last};
pub use split::train_test_split;
pub use trades::{extract_trade_pairs, filter_operations, sequential_pairs, TradePair};
