use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use salescast_core::config::ConfigOverrides;
use salescast_core::{
    ApplicationError, DateRange, ForecastMetric, ForecastResult, ProductId, RawSaleRow,
    SeriesAggregator, SupplierId, TrendForecaster, WeeklyPoint,
};
use serde::Serialize;
use tracing::debug;

use crate::commands::{load_config, read_rows, CommandResult};

const COMMAND: &str = "forecast";

#[derive(Debug, Clone, Args)]
pub struct ForecastArgs {
    #[arg(long, help = "JSON array of sales rows")]
    pub rows: PathBuf,
    #[arg(long, help = "First day of the series (YYYY-MM-DD)")]
    pub start: NaiveDate,
    #[arg(long, help = "Last day of the series (YYYY-MM-DD)")]
    pub end: NaiveDate,
    #[arg(long, help = "Restrict the series to a single product")]
    pub product: Option<String>,
    #[arg(
        long,
        conflicts_with = "product",
        help = "Restrict the series to one supplier's products"
    )]
    pub supplier: Option<String>,
    #[arg(long, default_value = "revenue", help = "Metric to forecast: revenue|units")]
    pub metric: ForecastMetric,
    #[arg(long, help = "Weeks to project beyond the series")]
    pub horizon: Option<u32>,
    #[arg(long, help = "Trailing weeks held out for accuracy measurement")]
    pub backtest: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ForecastReport {
    product_id: Option<ProductId>,
    supplier_id: Option<SupplierId>,
    start: NaiveDate,
    end: NaiveDate,
    skipped_count: usize,
    out_of_range_count: usize,
    forecast: ForecastResult,
}

pub fn run(args: ForecastArgs, config_path: Option<PathBuf>) -> CommandResult {
    match execute(args, config_path) {
        Ok(report) => {
            let message = format!(
                "forecast {} weeks ahead, trend {}",
                report.forecast.horizon_weeks,
                report.forecast.trend_label.as_str()
            );
            CommandResult::success(COMMAND, message, report)
        }
        Err(error) => CommandResult::from_error(COMMAND, &error),
    }
}

fn execute(
    args: ForecastArgs,
    config_path: Option<PathBuf>,
) -> Result<ForecastReport, ApplicationError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            horizon_weeks: args.horizon,
            backtest_weeks: args.backtest,
            ..ConfigOverrides::default()
        },
    )?;
    let params = config.forecast_params();

    let loaded = read_rows::<RawSaleRow>(&args.rows)?;
    let rows = loaded.rows;
    let range = DateRange::new(args.start, args.end)?;
    debug!(
        event_name = "cli.command.started",
        command = COMMAND,
        rows = rows.len(),
        metric = ?args.metric,
        "forecast started"
    );

    let aggregator = SeriesAggregator;
    let product_id = args.product.map(ProductId);
    let supplier_id = args.supplier.map(SupplierId);
    let (points, skipped_count, out_of_range_count) = match (&product_id, &supplier_id) {
        (Some(product_id), _) => {
            let mut set = aggregator.aggregate_by_product(&rows, range);
            let points = set
                .series
                .remove(product_id)
                .unwrap_or_else(|| range.week_starts().map(WeeklyPoint::empty).collect());
            (points, set.skipped_count, set.out_of_range_count)
        }
        (None, Some(supplier_id)) => {
            let series = aggregator.aggregate_for_supplier(&rows, supplier_id, range);
            (series.points, series.skipped_count, series.out_of_range_count)
        }
        (None, None) => {
            let series = aggregator.aggregate(&rows, range);
            (series.points, series.skipped_count, series.out_of_range_count)
        }
    };
    let skipped_count = skipped_count + loaded.rejected;

    let forecast = TrendForecaster::new(params.band_widening).forecast_metric(
        &points,
        args.metric,
        params.horizon_weeks,
        params.backtest_weeks,
    )?;

    debug!(
        event_name = "cli.command.completed",
        command = COMMAND,
        weeks = points.len(),
        skipped_count,
        "forecast completed"
    );

    Ok(ForecastReport {
        product_id,
        supplier_id,
        start: range.start(),
        end: range.end(),
        skipped_count,
        out_of_range_count,
        forecast,
    })
}
