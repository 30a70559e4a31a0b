use crate::bar::Timeframe;
use serde::{Deserialize, Serialize};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.11 (KHTML, like Gecko) Chrome/23.0.1271.64 Safari/537.11";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub macrovar: MacroVarConfig,
    pub calendar: CalendarConfig,
    pub market_data: MarketDataConfig,
    pub cot: CotConfig,
    pub strategies: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: String,
    pub reports_dir: String,
}

/// A country page on the macro indicator site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationPage {
    /// Two letter code stored in the `Country` column.
    pub code: String,
    /// Path segment of the country page, e.g. `south-korea`.
    pub slug: String,
}

impl NationPage {
    fn new(code: &str, slug: &str) -> Self {
        Self {
            code: code.to_string(),
            slug: slug.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroVarConfig {
    pub base_url: String,
    pub nations: Vec<NationPage>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub lookback_weeks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotConfig {
    /// Archive holding the 2006-2016 history.
    pub bundle_url: String,
    /// Per-year archive, `{year}` is substituted.
    pub year_url: String,
    /// First year served by `year_url`.
    pub first_year: i32,
    pub sentiment_file: String,
    /// Market name the sentiment rows are filtered to.
    pub symbol: String,
    /// Older names of the same market, renamed to `symbol` before filtering.
    pub aliases: Vec<String>,
    pub user_agent: String,
}

/// Ticker and weight of a tactical asset allocation sleeve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub ticker: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// First 75% train, last 25% test.
    Chronological,
    /// Seeded random row assignment.
    Shuffled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    pub generations: usize,
    pub parents_mating: usize,
    pub threshold_solutions: usize,
    pub band_solutions: usize,
    pub band_seed: Option<u64>,
    pub threshold_seed: Option<u64>,
    pub split: SplitMode,
    pub split_seed: u64,
    pub test_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub gtaa: Vec<AssetWeight>,
    pub watch_tickers: Vec<String>,
    pub cot_tickers: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub cash: f64,
    pub pivot_lookback_days: i64,
    pub drawdown_threshold: f64,
    pub drawdown_years: u32,
    pub genetic: GeneticConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/Economics.db".to_string(),
                max_connections: 5,
            },
            paths: PathsConfig {
                data_dir: "data".to_string(),
                reports_dir: "reports".to_string(),
            },
            macrovar: MacroVarConfig {
                base_url: "https://macrovar.com".to_string(),
                nations: vec![
                    NationPage::new("CN", "china"),
                    NationPage::new("EU", "europe"),
                    NationPage::new("JP", "japan"),
                    NationPage::new("KR", "south-korea"),
                    NationPage::new("US", "united-states"),
                    NationPage::new("SG", "singapore"),
                    NationPage::new("DE", "germany"),
                    NationPage::new("BR", "brazil"),
                    NationPage::new("IN", "india"),
                    NationPage::new("VN", "vietnam"),
                ],
                timeout_secs: 30,
                user_agent: BROWSER_USER_AGENT.to_string(),
            },
            calendar: CalendarConfig {
                api_url: "https://financialmodelingprep.com".to_string(),
                api_key: None,
                lookback_weeks: 1,
            },
            market_data: MarketDataConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
                user_agent: BROWSER_USER_AGENT.to_string(),
                timeout_secs: 30,
                requests_per_second: 2,
            },
            cot: CotConfig {
                bundle_url: "https://www.cftc.gov/files/dea/history/fin_fut_txt_2006_2016.zip"
                    .to_string(),
                year_url: "https://www.cftc.gov/files/dea/history/fut_fin_txt_{year}.zip"
                    .to_string(),
                first_year: 2016,
                sentiment_file: "market_sentiment_data.csv".to_string(),
                symbol: "E-MINI S&P 500 - CHICAGO MERCANTILE EXCHANGE".to_string(),
                aliases: vec![
                    "E-MINI S&P 500 STOCK INDEX - CHICAGO MERCANTILE EXCHANGE".to_string(),
                ],
                user_agent: BROWSER_USER_AGENT.to_string(),
            },
            strategies: StrategyConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let gtaa = [
            ("VNQ", 20),
            ("GLD", 10),
            ("DBC", 10),
            ("IEF", 5),
            ("LQD", 5),
            ("BNDX", 5),
            ("TLT", 5),
            ("EEM", 10),
            ("VEA", 10),
            ("DWAS", 5),
            ("SEIM", 5),
            ("DFSV", 5),
            ("DFLV", 5),
        ]
        .into_iter()
        .map(|(ticker, weight)| AssetWeight {
            ticker: ticker.to_string(),
            weight,
        })
        .collect();

        Self {
            gtaa,
            watch_tickers: vec!["SPY".to_string(), "QQQ".to_string()],
            cot_tickers: ["SPY", "QQQ", "UUP", "FXY", "TLT", "VIXY", "BCI"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            timeframes: Timeframe::ALL.to_vec(),
            cash: 10_000.0,
            pivot_lookback_days: 5,
            drawdown_threshold: -0.3,
            drawdown_years: 12,
            genetic: GeneticConfig {
                generations: 50,
                parents_mating: 5,
                threshold_solutions: 20,
                band_solutions: 30,
                band_seed: Some(42),
                threshold_seed: None,
                split: SplitMode::Chronological,
                split_seed: 1104,
                test_fraction: 0.25,
            },
        }
    }
}

impl AppConfig {
    /// Path of a file inside the data directory.
    #[must_use]
    pub fn data_file(&self, name: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.paths.data_dir).join(name)
    }

    /// Path of a file inside the reports directory.
    #[must_use]
    pub fn report_file(&self, name: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.paths.reports_dir).join(name)
    }
}
