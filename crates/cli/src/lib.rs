pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use salescast_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::forecast::ForecastArgs;
use crate::commands::lifecycle::LifecycleArgs;
use crate::commands::stockout::StockoutArgs;

#[derive(Debug, Parser)]
#[command(
    name = "salescast",
    about = "Salescast operator CLI",
    long_about = "Forecast weekly sales, estimate stockout risk, and classify product lifecycle from exported rows.",
    after_help = "Examples:\n  salescast forecast --rows sales.json --start 2024-01-01 --end 2024-03-31\n  salescast stockout --events moves.json --inventory stock.json --as-of 2024-03-31\n  salescast config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a salescast.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Aggregate sales into weekly buckets and project the trend forward")]
    Forecast(ForecastArgs),
    #[command(about = "Estimate sales velocity per store and product and roll up stockout risk")]
    Stockout(StockoutArgs),
    #[command(about = "Classify product lifecycle and score performance against peers")]
    Lifecycle(LifecycleArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A config that fails to load is reported by the command itself.
    if let Ok(config) =
        AppConfig::load(LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() })
    {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Forecast(args) => commands::forecast::run(args, cli.config),
        Command::Stockout(args) => commands::stockout::run(args, cli.config),
        Command::Lifecycle(args) => commands::lifecycle::run(args, cli.config),
        Command::Config => commands::config::run(cli.config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
