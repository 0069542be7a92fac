use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use salescast_core::config::ConfigOverrides;
use salescast_core::{
    ApplicationError, RawInventoryRow, RawMovementRow, RecordAssessment, StockoutAnalyzer,
    StoreAlertSummary, VelocityEstimator, VelocityRecord,
};
use serde::Serialize;
use tracing::debug;

use crate::commands::{load_config, read_rows, CommandResult};

const COMMAND: &str = "stockout";

#[derive(Debug, Clone, Args)]
pub struct StockoutArgs {
    #[arg(long, help = "JSON array of inventory movement events")]
    pub events: PathBuf,
    #[arg(long, help = "JSON array of on-hand inventory snapshot rows")]
    pub inventory: PathBuf,
    #[arg(long = "as-of", help = "Last day of the velocity window (YYYY-MM-DD)")]
    pub as_of: NaiveDate,
    #[arg(long, help = "Velocity window in days")]
    pub window: Option<u32>,
}

#[derive(Debug, Serialize)]
struct StockoutReport {
    as_of: NaiveDate,
    window_start: NaiveDate,
    window_days: u32,
    skipped_count: usize,
    velocity: Vec<VelocityRecord>,
    assessments: Vec<RecordAssessment>,
    stores: Vec<StoreAlertSummary>,
}

pub fn run(args: StockoutArgs, config_path: Option<PathBuf>) -> CommandResult {
    match execute(args, config_path) {
        Ok(report) => {
            let at_risk = report.stores.iter().filter(|store| store.critical_count > 0).count();
            let message = format!(
                "analyzed {} stores, {at_risk} with critical products",
                report.stores.len()
            );
            CommandResult::success(COMMAND, message, report)
        }
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    args: StockoutArgs,
    config_path: Option<PathBuf>,
) -> Result<StockoutReport, ApplicationError> {
    let config = load_config(
        config_path,
        ConfigOverrides { window_days: args.window, ..ConfigOverrides::default() },
    )?;
    let window_days = config.velocity.window_days;
    let thresholds = config.stockout_thresholds();

    let events = read_rows::<RawMovementRow>(&args.events)?;
    let inventory = read_rows::<RawInventoryRow>(&args.inventory)?;
    let rejected = events.rejected + inventory.rejected;
    let (events, inventory) = (events.rows, inventory.rows);
    debug!(
        event_name = "cli.command.started",
        command = COMMAND,
        events = events.len(),
        inventory = inventory.len(),
        window_days,
        "stockout analysis started"
    );

    let estimate = VelocityEstimator.estimate(&events, &inventory, window_days, args.as_of)?;
    let assessments = StockoutAnalyzer.assess(&estimate.records, &thresholds)?;
    let stores = StockoutAnalyzer.analyze(&estimate.records, &thresholds)?;

    debug!(
        event_name = "cli.command.completed",
        command = COMMAND,
        records = estimate.records.len(),
        stores = stores.len(),
        "stockout analysis completed"
    );

    Ok(StockoutReport {
        as_of: estimate.as_of,
        window_start: estimate.window_start,
        window_days,
        skipped_count: estimate.skipped_count + rejected,
        velocity: estimate.records,
        assessments,
        stores,
    })
}
