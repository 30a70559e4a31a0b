pub mod control_chart;
pub mod cot;
pub mod drawdown;
pub mod ga_bollinger;
pub mod ga_bollinger_bands;
pub mod indicators;
pub mod reversal;
pub mod timing;
pub mod trend_following;
pub mod volatility_bollinger;

pub use control_chart::{ChartPoint, Rule};
pub use cot::{CotField, CotParams, CotRow, CotStrategy, FieldOutcome};
pub use drawdown::{DrawdownRow, DrawdownSummary, DrawdownWatch};
pub use ga_bollinger::{GaBollinger, TunedResult};
pub use ga_bollinger_bands::{BandParams, BandSearchResult, GaBollingerBands, WindowResult};
pub use indicators::BollingerBands;
pub use timing::{PivotAlert, TimingModel, TimingRow};
pub use trend_following::{TrendFollowing, TrendOutcome, TrendParams};
pub use volatility_bollinger::{BandRow, BandThresholds, VolatilityBollinger};
