//! Economics database command.
//!
//! Scrapes the country pages and the economic calendar into the `SQLite`
//! tables. Without any flag only the markets snapshot is refreshed.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use quant_batch_collector::{CalendarClient, MacroVarClient};
use quant_batch_core::AppConfig;
use quant_batch_data::{DatabaseClient, Repositories, UpsertStats};

/// Arguments for the economics command.
#[derive(Args, Debug, Clone, Default)]
pub struct EconomicsArgs {
    /// Create the Calendars, Markets and Indicators tables if missing
    #[arg(long)]
    pub create_tables: bool,

    /// Store the economic calendar of the lookback window
    #[arg(long)]
    pub calendars: bool,

    /// Store the financial markets snapshot of every country
    #[arg(long)]
    pub markets: bool,

    /// Store the macroeconomic indicators of every country
    #[arg(long)]
    pub indicators: bool,

    /// Rebuild the tables so rows are stored in key order
    #[arg(long)]
    pub reorg: bool,
}

impl EconomicsArgs {
    /// Falls back to the markets refresh when no step is selected.
    #[must_use]
    pub fn or_markets(mut self) -> Self {
        if !(self.create_tables || self.calendars || self.markets || self.indicators || self.reorg)
        {
            self.markets = true;
        }
        self
    }
}

fn log_stats(table: &str, scope: &str, stats: UpsertStats) {
    tracing::info!(
        "{} {}: {} inserted, {} replaced, {} skipped",
        table,
        scope,
        stats.inserted,
        stats.deleted,
        stats.skipped
    );
}

/// Runs the economics command.
///
/// A country page that fails to download is logged and skipped.
///
/// # Errors
/// Returns an error if the database cannot be opened or written.
pub async fn run_economics(config: &AppConfig, args: EconomicsArgs) -> Result<()> {
    let args = args.or_markets();
    let db = DatabaseClient::new(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open {}", config.database.url))?;

    if args.create_tables {
        db.create_schema().await?;
        tracing::info!("Tables: {}", db.list_tables().await?.join(", "));
    }

    let repos = Repositories::new(db.pool().clone());
    let today = Utc::now().date_naive();

    if args.calendars {
        let client = CalendarClient::new(&config.calendar, config.macrovar.timeout_secs)?;
        let countries: Vec<String> = config
            .macrovar
            .nations
            .iter()
            .map(|n| n.code.clone())
            .collect();
        let events = client.recent(today, &countries).await?;
        let stats = repos.calendars.upsert_batch(&events).await?;
        log_stats("Calendars", &today.to_string(), stats);
    }

    if args.markets || args.indicators {
        let client = MacroVarClient::new(&config.macrovar)?;

        for nation in &config.macrovar.nations {
            if args.markets {
                match client.markets(nation, today).await {
                    Ok(rows) => {
                        let stats = repos.markets.upsert_batch(&rows).await?;
                        log_stats("Markets", &nation.code, stats);
                    }
                    Err(e) => tracing::error!("Markets of {} failed: {}", nation.code, e),
                }
            }
            if args.indicators {
                match client.indicators(nation).await {
                    Ok(rows) => {
                        let stats = repos.indicators.upsert_batch(&rows).await?;
                        log_stats("Indicators", &nation.code, stats);
                    }
                    Err(e) => tracing::error!("Indicators of {} failed: {}", nation.code, e),
                }
            }
        }
    }

    if args.reorg {
        for count in db.reorg_tables().await? {
            tracing::debug!("{} holds {} rows", count.table, count.rows);
        }
    }

    Ok(())
}
