use anyhow::Result;
use clap::{Parser, Subcommand};
use quant_batch_core::ConfigLoader;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{EconomicsArgs, FetchHistoryArgs, UsMarksArgs};

#[derive(Parser)]
#[command(name = "quant-batch")]
#[command(about = "Economics database and US market strategy batch jobs", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    /// Profile merged over the config file (Config.{profile}.toml)
    #[arg(short, long, global = true, env = "QB_PROFILE")]
    profile: Option<String>,

    /// Optional log file path (appends instead of logging to stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape calendars, markets and indicators into the economics database
    Economics(EconomicsArgs),
    /// Download price history files
    FetchHistory(FetchHistoryArgs),
    /// Build the Commitment of Traders sentiment file
    CotFile,
    /// Run the US market strategy battery
    UsMarks(UsMarksArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let config = match &cli.profile {
        Some(profile) => ConfigLoader::load_with_profile(&cli.config, profile)?,
        None => ConfigLoader::load_from(&cli.config)?,
    };

    match cli.command {
        Commands::Economics(args) => {
            commands::run_economics(&config, args).await?;
        }
        Commands::FetchHistory(args) => {
            commands::run_fetch_history(&config, args).await?;
        }
        Commands::CotFile => {
            commands::run_cot_file(&config).await?;
        }
        Commands::UsMarks(args) => {
            commands::run_us_marks(&config, args).await?;
        }
    }

    Ok(())
}

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
