use std::path::PathBuf;

use clap::Args;
use salescast_core::config::ConfigOverrides;
use salescast_core::{
    ApplicationError, Lifecycle, LifecycleClassifier, ProductPerformanceRecord,
    RawPeriodTotalsRow,
};
use serde::Serialize;
use tracing::debug;

use crate::commands::{load_config, read_rows, CommandResult};

const COMMAND: &str = "lifecycle";

#[derive(Debug, Clone, Args)]
pub struct LifecycleArgs {
    #[arg(long, help = "JSON array of per-product totals for the current period")]
    pub current: PathBuf,
    #[arg(long, help = "JSON array of per-product totals for the prior period")]
    pub prior: PathBuf,
    #[arg(long = "period-days", help = "Length of each period in days")]
    pub period_days: u32,
}

#[derive(Debug, Serialize)]
struct LifecycleReport {
    period_days: u32,
    skipped_count: usize,
    products: Vec<ProductPerformanceRecord>,
}

pub fn run(args: LifecycleArgs, config_path: Option<PathBuf>) -> CommandResult {
    match execute(args, config_path) {
        Ok(report) => {
            let declining = report
                .products
                .iter()
                .filter(|product| product.lifecycle == Lifecycle::Decline)
                .count();
            let message =
                format!("scored {} products, {declining} declining", report.products.len());
            CommandResult::success(COMMAND, message, report)
        }
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    args: LifecycleArgs,
    config_path: Option<PathBuf>,
) -> Result<LifecycleReport, ApplicationError> {
    let config = load_config(config_path, ConfigOverrides::default())?;

    let current = read_rows::<RawPeriodTotalsRow>(&args.current)?;
    let prior = read_rows::<RawPeriodTotalsRow>(&args.prior)?;
    let rejected = current.rejected + prior.rejected;
    let (current, prior) = (current.rows, prior.rows);
    debug!(
        event_name = "cli.command.started",
        command = COMMAND,
        current = current.len(),
        prior = prior.len(),
        "lifecycle scoring started"
    );

    let classifier = LifecycleClassifier::new(config.scoring_weights());
    let scores = classifier.score_rows(&current, &prior, args.period_days)?;
    let skipped_count = scores.skipped_count + rejected;
    let products = scores.records;

    debug!(
        event_name = "cli.command.completed",
        command = COMMAND,
        products = products.len(),
        skipped_count,
        "lifecycle scoring completed"
    );

    Ok(LifecycleReport { period_days: args.period_days, skipped_count, products })
}
