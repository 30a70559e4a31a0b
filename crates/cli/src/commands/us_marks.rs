//! US market strategy battery.
//!
//! Runs every job in a fixed order. A failing job, ticker or timeframe is
//! logged and the battery moves on.

use crate::commands::fetch_history::{fetch_history, history_file};
use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Args, ValueEnum};
use quant_batch_collector::{load_sentiment, CotDownloader, YahooChartClient};
use quant_batch_core::{AppConfig, Bar, PriceSource, Timeframe};
use quant_batch_data::CsvStorage;
use quant_batch_strategy::{
    control_chart, reversal, CotParams, CotStrategy, DrawdownWatch, GaBollinger,
    GaBollingerBands, TimingModel, TrendFollowing, TrendParams, VolatilityBollinger,
};
use rust_decimal::Decimal;

/// Jobs of the battery, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Job {
    Timing,
    Drawdown,
    History,
    VolatilityBollinger,
    GaBollinger,
    GaBands,
    Reversal,
    TrendFollowing,
    Cot,
    ControlChart,
}

impl Job {
    pub const ALL: [Job; 10] = [
        Self::Timing,
        Self::Drawdown,
        Self::History,
        Self::VolatilityBollinger,
        Self::GaBollinger,
        Self::GaBands,
        Self::Reversal,
        Self::TrendFollowing,
        Self::Cot,
        Self::ControlChart,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timing => "timing",
            Self::Drawdown => "drawdown",
            Self::History => "history",
            Self::VolatilityBollinger => "volatility-bollinger",
            Self::GaBollinger => "ga-bollinger",
            Self::GaBands => "ga-bands",
            Self::Reversal => "reversal",
            Self::TrendFollowing => "trend-following",
            Self::Cot => "cot",
            Self::ControlChart => "control-chart",
        }
    }
}

/// Arguments for the us-marks command.
#[derive(Args, Debug, Clone, Default)]
pub struct UsMarksArgs {
    /// Run only these jobs (defaults to all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<Job>,

    /// Reuse existing history and sentiment files instead of downloading them
    #[arg(long)]
    pub skip_fetch: bool,
}

impl UsMarksArgs {
    /// Selected jobs in run order.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        Job::ALL
            .into_iter()
            .filter(|job| self.only.is_empty() || self.only.contains(job))
            .collect()
    }
}

struct UsMarks<'a> {
    config: &'a AppConfig,
    source: &'a dyn PriceSource,
    skip_fetch: bool,
}

impl UsMarks<'_> {
    fn load_bars(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>> {
        let path = history_file(self.config, ticker, timeframe);
        CsvStorage::read_bars(&path, ticker)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Calls `f` for every watched ticker and timeframe with its history.
    fn each_history<F>(&self, job: Job, mut f: F)
    where
        F: FnMut(&str, Timeframe, &[Bar]) -> Result<()>,
    {
        let strategies = &self.config.strategies;
        for ticker in &strategies.watch_tickers {
            for &timeframe in &strategies.timeframes {
                let result = self
                    .load_bars(ticker, timeframe)
                    .and_then(|bars| f(ticker, timeframe, &bars));
                if let Err(e) = result {
                    tracing::error!("{} {} {}: {:#}", job.as_str(), ticker, timeframe, e);
                }
            }
        }
    }

    async fn run(&self, job: Job) -> Result<()> {
        let config = self.config;
        let strategies = &config.strategies;

        match job {
            Job::Timing => {
                let today = Utc::now().date_naive();
                for (short, long) in [(20, 200), (1, 200)] {
                    TimingModel::new(short, long, strategies.pivot_lookback_days)
                        .run(self.source, &strategies.gtaa, today)
                        .await?;
                }
            }
            Job::Drawdown => {
                DrawdownWatch::new(strategies.drawdown_threshold, strategies.drawdown_years)
                    .run(
                        self.source,
                        &strategies.watch_tickers,
                        &config.report_file("drawdown.csv"),
                    )
                    .await?;
            }
            Job::History => {
                if self.skip_fetch {
                    tracing::info!("Reusing existing history files");
                } else {
                    fetch_history(
                        self.source,
                        config,
                        &strategies.watch_tickers,
                        &strategies.timeframes,
                    )
                    .await?;
                }
            }
            Job::VolatilityBollinger => {
                let strategy = VolatilityBollinger::default();
                self.each_history(job, |ticker, timeframe, bars| {
                    strategy.run(ticker, timeframe, bars);
                    Ok(())
                });
            }
            Job::GaBollinger => {
                let strategy = GaBollinger::new(strategies.genetic.clone(), strategies.cash);
                self.each_history(job, |ticker, timeframe, bars| {
                    strategy.run(ticker, timeframe, bars).map(|_| ())
                });
            }
            Job::GaBands => {
                let strategy = GaBollingerBands::new(strategies.genetic.clone(), strategies.cash);
                self.each_history(job, |ticker, timeframe, bars| {
                    strategy.run(ticker, timeframe, bars).map(|_| ())
                });
            }
            Job::Reversal => {
                self.each_history(job, |ticker, timeframe, bars| {
                    reversal::run(ticker, timeframe, bars);
                    Ok(())
                });
            }
            Job::TrendFollowing => {
                let cash = Decimal::try_from(strategies.cash)
                    .with_context(|| format!("Invalid cash amount {}", strategies.cash))?;
                let strategy = TrendFollowing::new(TrendParams {
                    cash,
                    ..TrendParams::default()
                });
                self.each_history(job, |ticker, timeframe, bars| {
                    strategy.run(ticker, timeframe, bars).map(|_| ())
                });
            }
            Job::Cot => self.run_cot().await?,
            Job::ControlChart => {
                for ticker in &strategies.watch_tickers {
                    let path = config.data_file(&format!("{ticker}.csv"));
                    match CsvStorage::read_closes(&path) {
                        Ok(rows) => {
                            let closes: Vec<_> = rows
                                .into_iter()
                                .map(|(date, close)| {
                                    (date.and_time(chrono::NaiveTime::MIN).and_utc(), close)
                                })
                                .collect();
                            control_chart::run(ticker, &closes, strategies.cash);
                        }
                        Err(e) => tracing::error!("control-chart {}: {:#}", ticker, e),
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_cot(&self) -> Result<()> {
        let config = self.config;
        let sentiment_file = config.data_file(&config.cot.sentiment_file);

        if self.skip_fetch {
            tracing::info!("Reusing {}", sentiment_file.display());
        } else {
            let downloader = CotDownloader::new(&config.cot, config.market_data.timeout_secs)?;
            downloader
                .write_sentiment_file(&sentiment_file, Utc::now().year())
                .await?;
        }

        let sentiment = load_sentiment(&sentiment_file, &config.cot.symbol, &config.cot.aliases)?;
        let strategy = CotStrategy::new(CotParams {
            cash: config.strategies.cash,
            ..CotParams::default()
        });

        for ticker in &config.strategies.cot_tickers {
            let ticker_file = config.data_file(&format!("{ticker}.csv"));
            if let Err(e) = strategy
                .run(self.source, ticker, &sentiment, &ticker_file)
                .await
            {
                tracing::error!("cot {}: {:#}", ticker, e);
            }
        }
        Ok(())
    }
}

/// Runs the us-marks command.
///
/// # Errors
/// Returns an error if the market data client cannot be built.
pub async fn run_us_marks(config: &AppConfig, args: UsMarksArgs) -> Result<()> {
    let source = YahooChartClient::new(&config.market_data)?;
    let battery = UsMarks {
        config,
        source: &source,
        skip_fetch: args.skip_fetch,
    };

    for job in args.jobs() {
        tracing::info!("Running {}", job.as_str());
        if let Err(e) = battery.run(job).await {
            tracing::error!("{} failed: {:#}", job.as_str(), e);
        }
    }
    Ok(())
}
