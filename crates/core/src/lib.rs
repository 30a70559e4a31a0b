pub mod bar;
pub mod config;
pub mod config_loader;
pub mod report;
pub mod signal;
pub mod traits;

pub use bar::{closes, Bar, Timeframe};
pub use config::{
    AppConfig, AssetWeight, CalendarConfig, CotConfig, DatabaseConfig, GeneticConfig,
    MacroVarConfig, MarketDataConfig, NationPage, PathsConfig, SplitMode, StrategyConfig,
};
pub use config_loader::ConfigLoader;
pub use report::{banner, center, win_rate_pct, ResultBlock};
pub use signal::Signal;
pub use traits::PriceSource;
