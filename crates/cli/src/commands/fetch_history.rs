//! Price history download command.

use anyhow::Result;
use clap::Args;
use quant_batch_collector::YahooChartClient;
use quant_batch_core::{AppConfig, PriceSource, Timeframe};
use quant_batch_data::CsvStorage;
use std::path::PathBuf;

/// Arguments for the fetch-history command.
#[derive(Args, Debug, Clone)]
pub struct FetchHistoryArgs {
    /// Tickers to download (defaults to the watch list)
    #[arg(long = "ticker", num_args = 1..)]
    pub tickers: Vec<String>,

    /// Timeframes to download, e.g. "1min,1day" (defaults to all configured)
    #[arg(long = "timeframe", value_delimiter = ',')]
    pub timeframes: Vec<Timeframe>,
}

/// `{data_dir}/{ticker}_hist_{timeframe}.csv`
#[must_use]
pub fn history_file(config: &AppConfig, ticker: &str, timeframe: Timeframe) -> PathBuf {
    config.data_file(&format!("{ticker}_hist_{timeframe}.csv"))
}

/// Downloads every ticker and timeframe into its history file. Failed
/// downloads are logged and skipped. Returns the number of files written.
///
/// # Errors
/// Returns an error if a history file cannot be written.
pub async fn fetch_history(
    source: &dyn PriceSource,
    config: &AppConfig,
    tickers: &[String],
    timeframes: &[Timeframe],
) -> Result<usize> {
    let mut written = 0;

    for ticker in tickers {
        for &timeframe in timeframes {
            match source.history(ticker, timeframe).await {
                Ok(bars) if bars.is_empty() => {
                    tracing::warn!("No {} bars for {}", timeframe, ticker);
                }
                Ok(bars) => {
                    let path = history_file(config, ticker, timeframe);
                    CsvStorage::write_bars(&path, ticker, &bars)?;
                    tracing::info!("{} {}: {} bars -> {}", ticker, timeframe, bars.len(), path.display());
                    written += 1;
                }
                Err(e) => tracing::error!("History of {} {} failed: {:#}", ticker, timeframe, e),
            }
        }
    }

    Ok(written)
}

/// Runs the fetch-history command.
///
/// # Errors
/// Returns an error if the client cannot be built or a file cannot be written.
pub async fn run_fetch_history(config: &AppConfig, args: FetchHistoryArgs) -> Result<()> {
    let source = YahooChartClient::new(&config.market_data)?;
    let tickers = if args.tickers.is_empty() {
        config.strategies.watch_tickers.clone()
    } else {
        args.tickers
    };
    let timeframes = if args.timeframes.is_empty() {
        config.strategies.timeframes.clone()
    } else {
        args.timeframes
    };

    let written = fetch_history(&source, config, &tickers, &timeframes).await?;
    tracing::info!("History files written: {}", written);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_file_name() {
        let config = AppConfig::default();
        let path = history_file(&config, "SPY", Timeframe::OneHour);
        assert_eq!(path, PathBuf::from("data").join("SPY_hist_1hour.csv"));
    }
}
