use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use salescast_core::config::{AppConfig, ConfigOverrides, LogFormat};
use salescast_core::ApplicationError;
use serde::Serialize;
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

#[derive(Debug, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(config_path.clone(), ConfigOverrides::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(COMMAND, &error),
    };

    let file_path = config_path.or_else(detect_config_path);
    let file_doc = match load_config_file_doc(file_path.as_deref()) {
        Ok(doc) => doc,
        Err(error) => return CommandResult::from_error(COMMAND, &error),
    };

    let entries = describe(&config, file_doc.as_ref(), file_path.as_deref());
    CommandResult::success(
        COMMAND,
        "effective config (source precedence: env > file > default)",
        entries,
    )
}

fn describe(
    config: &AppConfig,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> Vec<ConfigEntry> {
    let fields: [(&'static str, String, &[&str]); 14] = [
        (
            "forecast.horizon_weeks",
            config.forecast.horizon_weeks.to_string(),
            &["SALESCAST_FORECAST_HORIZON_WEEKS"],
        ),
        (
            "forecast.backtest_weeks",
            config.forecast.backtest_weeks.to_string(),
            &["SALESCAST_FORECAST_BACKTEST_WEEKS"],
        ),
        (
            "forecast.band_widening",
            config.forecast.band_widening.as_str().to_string(),
            &["SALESCAST_FORECAST_BAND_WIDENING"],
        ),
        (
            "velocity.window_days",
            config.velocity.window_days.to_string(),
            &["SALESCAST_VELOCITY_WINDOW_DAYS"],
        ),
        (
            "stockout.critical_days",
            config.stockout.critical_days.to_string(),
            &["SALESCAST_STOCKOUT_CRITICAL_DAYS"],
        ),
        (
            "stockout.high_days",
            config.stockout.high_days.to_string(),
            &["SALESCAST_STOCKOUT_HIGH_DAYS"],
        ),
        (
            "stockout.low_days",
            config.stockout.low_days.to_string(),
            &["SALESCAST_STOCKOUT_LOW_DAYS"],
        ),
        (
            "stockout.reorder_point",
            config.stockout.reorder_point.to_string(),
            &["SALESCAST_STOCKOUT_REORDER_POINT"],
        ),
        (
            "scoring.velocity_weight",
            config.scoring.velocity_weight.to_string(),
            &["SALESCAST_SCORING_VELOCITY_WEIGHT"],
        ),
        (
            "scoring.revenue_weight",
            config.scoring.revenue_weight.to_string(),
            &["SALESCAST_SCORING_REVENUE_WEIGHT"],
        ),
        (
            "scoring.growth_weight",
            config.scoring.growth_weight.to_string(),
            &["SALESCAST_SCORING_GROWTH_WEIGHT"],
        ),
        (
            "scoring.growth_clamp_pct",
            config.scoring.growth_clamp_pct.to_string(),
            &["SALESCAST_SCORING_GROWTH_CLAMP_PCT"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SALESCAST_LOGGING_LEVEL", "SALESCAST_LOG_LEVEL"],
        ),
        (
            "logging.format",
            log_format_name(config.logging.format).to_string(),
            &["SALESCAST_LOGGING_FORMAT", "SALESCAST_LOG_FORMAT"],
        ),
    ];

    fields
        .into_iter()
        .map(|(key, value, env_keys)| ConfigEntry {
            key,
            value,
            source: field_source(key, env_keys, file_doc, file_path),
        })
        .collect()
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("salescast.toml"), PathBuf::from("config/salescast.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Result<Option<Value>, ApplicationError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Configuration(format!("could not read `{}`: {error}", path.display()))
    })?;
    // Interpolation placeholders may not be valid TOML on their own; attribution
    // then falls back to env/default.
    Ok(raw.parse::<Value>().ok())
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, key_path) {
            let file_path = file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
