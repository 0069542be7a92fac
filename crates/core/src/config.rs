use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forecast::{BandWidening, ForecastParams};
use crate::lifecycle::ScoringWeights;
use crate::stockout::StockoutThresholds;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub forecast: ForecastConfig,
    pub velocity: VelocityConfig,
    pub stockout: StockoutConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

/// Longest projection accepted, two years of weeks.
pub const MAX_HORIZON_WEEKS: u32 = 104;
/// Longest backtest hold-out, one year of weeks.
pub const MAX_BACKTEST_WEEKS: u32 = 52;
/// Longest velocity window, one leap year of days.
pub const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Clone, Debug, PartialEq)]
pub struct ForecastConfig {
    /// 1..=MAX_HORIZON_WEEKS
    pub horizon_weeks: u32,
    /// 0..=MAX_BACKTEST_WEEKS
    pub backtest_weeks: u32,
    pub band_widening: BandWidening,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VelocityConfig {
    /// 1..=MAX_WINDOW_DAYS
    pub window_days: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StockoutConfig {
    pub critical_days: f64,
    pub high_days: f64,
    pub low_days: f64,
    pub reorder_point: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    pub velocity_weight: f64,
    pub revenue_weight: f64,
    pub growth_weight: f64,
    pub growth_clamp_pct: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub horizon_weeks: Option<u32>,
    pub backtest_weeks: Option<u32>,
    pub window_days: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            forecast: ForecastConfig {
                horizon_weeks: 8,
                backtest_weeks: 4,
                band_widening: BandWidening::SqrtHorizon,
            },
            velocity: VelocityConfig { window_days: 28 },
            stockout: StockoutConfig {
                critical_days: 3.0,
                high_days: 7.0,
                low_days: 14.0,
                reorder_point: 10,
            },
            scoring: ScoringConfig {
                velocity_weight: 0.40,
                revenue_weight: 0.40,
                growth_weight: 0.20,
                growth_clamp_pct: 100.0,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("salescast.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn forecast_params(&self) -> ForecastParams {
        ForecastParams {
            horizon_weeks: self.forecast.horizon_weeks,
            backtest_weeks: self.forecast.backtest_weeks,
            band_widening: self.forecast.band_widening,
        }
    }

    pub fn stockout_thresholds(&self) -> StockoutThresholds {
        StockoutThresholds {
            critical_days: self.stockout.critical_days,
            high_days: self.stockout.high_days,
            low_days: self.stockout.low_days,
            reorder_point: self.stockout.reorder_point,
        }
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights {
            velocity: self.scoring.velocity_weight,
            revenue: self.scoring.revenue_weight,
            growth: self.scoring.growth_weight,
            growth_clamp_pct: self.scoring.growth_clamp_pct,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(forecast) = patch.forecast {
            if let Some(horizon_weeks) = forecast.horizon_weeks {
                self.forecast.horizon_weeks = horizon_weeks;
            }
            if let Some(backtest_weeks) = forecast.backtest_weeks {
                self.forecast.backtest_weeks = backtest_weeks;
            }
            if let Some(band_widening) = forecast.band_widening {
                self.forecast.band_widening = band_widening;
            }
        }

        if let Some(velocity) = patch.velocity {
            if let Some(window_days) = velocity.window_days {
                self.velocity.window_days = window_days;
            }
        }

        if let Some(stockout) = patch.stockout {
            if let Some(critical_days) = stockout.critical_days {
                self.stockout.critical_days = critical_days;
            }
            if let Some(high_days) = stockout.high_days {
                self.stockout.high_days = high_days;
            }
            if let Some(low_days) = stockout.low_days {
                self.stockout.low_days = low_days;
            }
            if let Some(reorder_point) = stockout.reorder_point {
                self.stockout.reorder_point = reorder_point;
            }
        }

        if let Some(scoring) = patch.scoring {
            if let Some(velocity_weight) = scoring.velocity_weight {
                self.scoring.velocity_weight = velocity_weight;
            }
            if let Some(revenue_weight) = scoring.revenue_weight {
                self.scoring.revenue_weight = revenue_weight;
            }
            if let Some(growth_weight) = scoring.growth_weight {
                self.scoring.growth_weight = growth_weight;
            }
            if let Some(growth_clamp_pct) = scoring.growth_clamp_pct {
                self.scoring.growth_clamp_pct = growth_clamp_pct;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SALESCAST_FORECAST_HORIZON_WEEKS") {
            self.forecast.horizon_weeks = parse_u32("SALESCAST_FORECAST_HORIZON_WEEKS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_FORECAST_BACKTEST_WEEKS") {
            self.forecast.backtest_weeks = parse_u32("SALESCAST_FORECAST_BACKTEST_WEEKS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_FORECAST_BAND_WIDENING") {
            self.forecast.band_widening =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SALESCAST_FORECAST_BAND_WIDENING".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Some(value) = read_env("SALESCAST_VELOCITY_WINDOW_DAYS") {
            self.velocity.window_days = parse_u32("SALESCAST_VELOCITY_WINDOW_DAYS", &value)?;
        }

        if let Some(value) = read_env("SALESCAST_STOCKOUT_CRITICAL_DAYS") {
            self.stockout.critical_days = parse_f64("SALESCAST_STOCKOUT_CRITICAL_DAYS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_STOCKOUT_HIGH_DAYS") {
            self.stockout.high_days = parse_f64("SALESCAST_STOCKOUT_HIGH_DAYS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_STOCKOUT_LOW_DAYS") {
            self.stockout.low_days = parse_f64("SALESCAST_STOCKOUT_LOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_STOCKOUT_REORDER_POINT") {
            self.stockout.reorder_point = parse_u64("SALESCAST_STOCKOUT_REORDER_POINT", &value)?;
        }

        if let Some(value) = read_env("SALESCAST_SCORING_VELOCITY_WEIGHT") {
            self.scoring.velocity_weight = parse_f64("SALESCAST_SCORING_VELOCITY_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_SCORING_REVENUE_WEIGHT") {
            self.scoring.revenue_weight = parse_f64("SALESCAST_SCORING_REVENUE_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_SCORING_GROWTH_WEIGHT") {
            self.scoring.growth_weight = parse_f64("SALESCAST_SCORING_GROWTH_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("SALESCAST_SCORING_GROWTH_CLAMP_PCT") {
            self.scoring.growth_clamp_pct =
                parse_f64("SALESCAST_SCORING_GROWTH_CLAMP_PCT", &value)?;
        }

        let log_level =
            read_env("SALESCAST_LOGGING_LEVEL").or_else(|| read_env("SALESCAST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SALESCAST_LOGGING_FORMAT").or_else(|| read_env("SALESCAST_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(horizon_weeks) = overrides.horizon_weeks {
            self.forecast.horizon_weeks = horizon_weeks;
        }
        if let Some(backtest_weeks) = overrides.backtest_weeks {
            self.forecast.backtest_weeks = backtest_weeks;
        }
        if let Some(window_days) = overrides.window_days {
            self.velocity.window_days = window_days;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_forecast(&self.forecast)?;
        validate_velocity(&self.velocity)?;
        self.stockout_thresholds()
            .validate()
            .map_err(|error| ConfigError::Validation(format!("stockout: {error}")))?;
        self.scoring_weights()
            .validate()
            .map_err(|error| ConfigError::Validation(format!("scoring: {error}")))?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("salescast.toml"), PathBuf::from("config/salescast.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_forecast(forecast: &ForecastConfig) -> Result<(), ConfigError> {
    if forecast.horizon_weeks == 0 || forecast.horizon_weeks > MAX_HORIZON_WEEKS {
        return Err(ConfigError::Validation(format!(
            "forecast.horizon_weeks must be in range 1..={MAX_HORIZON_WEEKS}"
        )));
    }

    if forecast.backtest_weeks > MAX_BACKTEST_WEEKS {
        return Err(ConfigError::Validation(format!(
            "forecast.backtest_weeks must be in range 0..={MAX_BACKTEST_WEEKS}"
        )));
    }

    Ok(())
}

fn validate_velocity(velocity: &VelocityConfig) -> Result<(), ConfigError> {
    if velocity.window_days == 0 || velocity.window_days > MAX_WINDOW_DAYS {
        return Err(ConfigError::Validation(format!(
            "velocity.window_days must be in range 1..={MAX_WINDOW_DAYS}"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    forecast: Option<ForecastPatch>,
    velocity: Option<VelocityPatch>,
    stockout: Option<StockoutPatch>,
    scoring: Option<ScoringPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    horizon_weeks: Option<u32>,
    backtest_weeks: Option<u32>,
    band_widening: Option<BandWidening>,
}

#[derive(Debug, Default, Deserialize)]
struct VelocityPatch {
    window_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StockoutPatch {
    critical_days: Option<f64>,
    high_days: Option<f64>,
    low_days: Option<f64>,
    reorder_point: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    velocity_weight: Option<f64>,
    revenue_weight: Option<f64>,
    growth_weight: Option<f64>,
    growth_clamp_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, MAX_BACKTEST_WEEKS,
        MAX_HORIZON_WEEKS, MAX_WINDOW_DAYS,
    };
    use crate::forecast::BandWidening;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config == AppConfig::default(), "defaults should load unchanged")?;
        ensure(
            config.forecast.band_widening == BandWidening::SqrtHorizon,
            "default band widening should be sqrt_horizon",
        )?;
        ensure(
            (config.scoring_weights().velocity - 0.40).abs() < f64::EPSILON,
            "default velocity weight should be 0.40",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SALESCAST_WINDOW", "14");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescast.toml");
            fs::write(
                &path,
                r#"
[velocity]
window_days = ${TEST_SALESCAST_WINDOW}

[forecast]
band_widening = "constant"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.velocity.window_days == 14, "window should be loaded from environment")?;
            ensure(
                config.forecast.band_widening == BandWidening::Constant,
                "band widening should be read from file",
            )
        })();

        clear_vars(&["TEST_SALESCAST_WINDOW"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_LOG_LEVEL", "warn");
        env::set_var("SALESCAST_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["SALESCAST_LOG_LEVEL", "SALESCAST_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_FORECAST_BACKTEST_WEEKS", "6");
        env::set_var("SALESCAST_STOCKOUT_HIGH_DAYS", "10");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescast.toml");
            fs::write(
                &path,
                r#"
[forecast]
horizon_weeks = 12
backtest_weeks = 2

[stockout]
high_days = 5.0
reorder_point = 25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    horizon_weeks: Some(16),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.forecast.horizon_weeks == 16, "override horizon should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.forecast.backtest_weeks == 6, "env backtest should win over file")?;
            ensure(
                (config.stockout.high_days - 10.0).abs() < f64::EPSILON,
                "env high_days should win over file",
            )?;
            ensure(config.stockout.reorder_point == 25, "file reorder point should win over default")
        })();

        clear_vars(&["SALESCAST_FORECAST_BACKTEST_WEEKS", "SALESCAST_STOCKOUT_HIGH_DAYS"]);
        result
    }

    #[test]
    fn inverted_thresholds_fail_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_STOCKOUT_CRITICAL_DAYS", "9");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("critical_days")
            );
            ensure(has_message, "validation failure should mention critical_days")
        })();

        clear_vars(&["SALESCAST_STOCKOUT_CRITICAL_DAYS"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCAST_VELOCITY_WINDOW_DAYS", "four weeks");

        let result = (|| -> Result<(), String> {
            let reported = matches!(
                AppConfig::load(LoadOptions::default()),
                Err(ConfigError::InvalidEnvOverride { ref key, .. })
                    if key == "SALESCAST_VELOCITY_WINDOW_DAYS"
            );
            ensure(reported, "invalid env override should name the variable")
        })();

        clear_vars(&["SALESCAST_VELOCITY_WINDOW_DAYS"]);
        result
    }

    #[test]
    fn zero_weights_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescast.toml");
            fs::write(
                &path,
                r#"
[scoring]
velocity_weight = 0.0
revenue_weight = 0.0
growth_weight = 0.0
"#,
            )
            .map_err(|err| err.to_string())?;

            let failed = matches!(
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }),
                Err(ConfigError::Validation(ref message)) if message.starts_with("scoring")
            );
            ensure(failed, "all-zero weights should fail validation")
        })();

        result
    }

    #[test]
    fn horizon_backtest_and_window_caps_are_inclusive() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let load = |overrides: ConfigOverrides| {
            AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
        };
        let rejected_on = |overrides: ConfigOverrides, field: &str| {
            matches!(
                load(overrides),
                Err(ConfigError::Validation(ref message)) if message.starts_with(field)
            )
        };

        let at_caps = load(ConfigOverrides {
            horizon_weeks: Some(MAX_HORIZON_WEEKS),
            backtest_weeks: Some(MAX_BACKTEST_WEEKS),
            window_days: Some(MAX_WINDOW_DAYS),
            ..ConfigOverrides::default()
        });
        ensure(at_caps.is_ok(), "values at the caps should load")?;

        ensure(
            rejected_on(
                ConfigOverrides { horizon_weeks: Some(105), ..ConfigOverrides::default() },
                "forecast.horizon_weeks",
            ),
            "horizon above 104 weeks should be rejected",
        )?;
        ensure(
            rejected_on(
                ConfigOverrides { backtest_weeks: Some(53), ..ConfigOverrides::default() },
                "forecast.backtest_weeks",
            ),
            "backtest above 52 weeks should be rejected",
        )?;
        ensure(
            rejected_on(
                ConfigOverrides { window_days: Some(367), ..ConfigOverrides::default() },
                "velocity.window_days",
            ),
            "window above 366 days should be rejected",
        )
    }

    #[test]
    fn required_missing_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");
        let failed = matches!(
            AppConfig::load(LoadOptions {
                config_path: Some(missing),
                require_file: true,
                ..LoadOptions::default()
            }),
            Err(ConfigError::MissingConfigFile(_))
        );
        ensure(failed, "require_file should fail when the file is absent")
    }
}
