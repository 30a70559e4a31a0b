//! Commitment of Traders sentiment file command.

use anyhow::Result;
use chrono::{Datelike, Utc};
use quant_batch_collector::CotDownloader;
use quant_batch_core::AppConfig;

/// Downloads the report archives up to the current year and writes the
/// sentiment CSV into the data directory.
///
/// # Errors
/// Returns an error if an archive cannot be downloaded or the file cannot
/// be written.
pub async fn run_cot_file(config: &AppConfig) -> Result<()> {
    let path = config.data_file(&config.cot.sentiment_file);
    let downloader = CotDownloader::new(&config.cot, config.market_data.timeout_secs)?;
    let rows = downloader
        .write_sentiment_file(&path, Utc::now().year())
        .await?;
    tracing::info!("{} sentiment rows in {}", rows, path.display());
    Ok(())
}
