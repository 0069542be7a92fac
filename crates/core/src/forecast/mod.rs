//! Weekly trend forecasting.
//!
//! Fits an ordinary least squares line over a zero-filled weekly series,
//! projects it forward, and attaches 1σ/2σ bands derived from the in-sample
//! residual spread. Accuracy is measured by refitting on a truncated history
//! and scoring the held-out weeks.

pub mod trend;

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::series::WeeklyPoint;

pub use trend::LinearTrend;

/// Minimum number of points a trend is fitted on.
pub const MIN_FIT_POINTS: usize = 4;

/// Slope, as a fraction of mean weekly value, beyond which a trend is no
/// longer flat.
pub const FLAT_TREND_FRACTION: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMetric {
    #[default]
    Revenue,
    Units,
}

impl ForecastMetric {
    pub fn value(&self, point: &WeeklyPoint) -> f64 {
        match self {
            Self::Revenue => point.revenue.to_f64().unwrap_or(0.0),
            Self::Units => point.units as f64,
        }
    }
}

impl std::str::FromStr for ForecastMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "revenue" => Ok(Self::Revenue),
            "units" => Ok(Self::Units),
            other => Err(format!("unsupported forecast metric `{other}` (expected revenue|units)")),
        }
    }
}

/// How σ grows with forecast step `k` (zero-based).
///
/// - `Constant`: σ_k = σ.
/// - `SqrtHorizon`: σ_k = σ·√(1 + k), the random-walk growth of accumulated
///   error. This is the default.
///
/// Both keep band width non-decreasing along the horizon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandWidening {
    Constant,
    #[default]
    SqrtHorizon,
}

impl BandWidening {
    pub fn sigma_at(&self, sigma: f64, step: usize) -> f64 {
        match self {
            Self::Constant => sigma,
            Self::SqrtHorizon => sigma * (1.0 + step as f64).sqrt(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::SqrtHorizon => "sqrt_horizon",
        }
    }
}

impl std::str::FromStr for BandWidening {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(Self::Constant),
            "sqrt_horizon" => Ok(Self::SqrtHorizon),
            other => Err(format!(
                "unsupported band widening `{other}` (expected constant|sqrt_horizon)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Rising,
    Falling,
    Flat,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Flat => "flat",
        }
    }
}

/// Upper and lower bounds, index-aligned with `ForecastResult::predictions`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

impl ConfidenceBand {
    pub fn width_at(&self, index: usize) -> Option<f64> {
        Some(self.upper.get(index)? - self.lower.get(index)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Fraction, not percent: 0.05 means 5 %.
    pub mape: f64,
    /// May be negative when the backtest model is worse than the mean.
    pub r_squared: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub metric: ForecastMetric,
    pub historical: Vec<WeeklyPoint>,
    pub horizon_weeks: u32,
    pub prediction_periods: Vec<NaiveDate>,
    pub predictions: Vec<f64>,
    pub confidence_1sigma: ConfidenceBand,
    pub confidence_2sigma: ConfidenceBand,
    pub accuracy: ForecastAccuracy,
    pub trend_label: TrendLabel,
    pub slope: f64,
    pub intercept: f64,
    pub sigma: f64,
    pub band_widening: BandWidening,
}

/// Forecast parameters as a bundle, usually built from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastParams {
    pub horizon_weeks: u32,
    pub backtest_weeks: u32,
    pub band_widening: BandWidening,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TrendForecaster {
    band_widening: BandWidening,
}

impl TrendForecaster {
    pub fn new(band_widening: BandWidening) -> Self {
        Self { band_widening }
    }

    /// Revenue forecast.
    pub fn forecast(
        &self,
        series: &[WeeklyPoint],
        horizon_weeks: u32,
        backtest_weeks: u32,
    ) -> Result<ForecastResult, EngineError> {
        self.forecast_metric(series, ForecastMetric::Revenue, horizon_weeks, backtest_weeks)
    }

    pub fn forecast_metric(
        &self,
        series: &[WeeklyPoint],
        metric: ForecastMetric,
        horizon_weeks: u32,
        backtest_weeks: u32,
    ) -> Result<ForecastResult, EngineError> {
        if horizon_weeks == 0 {
            return Err(EngineError::InvalidHorizon { horizon_weeks });
        }

        let required = backtest_weeks as usize + MIN_FIT_POINTS;
        if series.len() < required {
            return Err(EngineError::InsufficientHistory { required, actual: series.len() });
        }

        let values: Vec<f64> = series.iter().map(|point| metric.value(point)).collect();
        let n = values.len();
        let model = LinearTrend::fit(&values);
        let sigma = model.residual_std_dev(&values);

        let horizon = horizon_weeks as usize;
        let mut predictions = Vec::with_capacity(horizon);
        let mut one_sigma = ConfidenceBand::default();
        let mut two_sigma = ConfidenceBand::default();
        for step in 0..horizon {
            let predicted = model.predict((n + step) as f64);
            let spread = self.band_widening.sigma_at(sigma, step);

            predictions.push(predicted);
            one_sigma.upper.push(predicted + spread);
            one_sigma.lower.push(predicted - spread);
            two_sigma.upper.push(predicted + 2.0 * spread);
            two_sigma.lower.push(predicted - 2.0 * spread);
        }

        let prediction_periods = series
            .last()
            .map(|last| {
                (1..=horizon)
                    .map(|offset| last.period_start + Duration::weeks(offset as i64))
                    .collect()
            })
            .unwrap_or_default();

        let accuracy = backtest(&values, backtest_weeks as usize);
        let trend_label = classify_trend(model.slope, trend::mean(&values));

        debug!(
            event_name = "engine.forecast.completed",
            metric = ?metric,
            history_weeks = n,
            horizon_weeks,
            backtest_weeks,
            slope = model.slope,
            sigma,
            mape = accuracy.mape,
            r_squared = accuracy.r_squared,
            "trend forecast completed"
        );

        Ok(ForecastResult {
            metric,
            historical: series.to_vec(),
            horizon_weeks,
            prediction_periods,
            predictions,
            confidence_1sigma: one_sigma,
            confidence_2sigma: two_sigma,
            accuracy,
            trend_label,
            slope: model.slope,
            intercept: model.intercept,
            sigma,
            band_widening: self.band_widening,
        })
    }
}

/// Refits on the leading `len - backtest_weeks` points and scores the
/// held-out tail (MAPE) and the whole series (R²).
fn backtest(values: &[f64], backtest_weeks: usize) -> ForecastAccuracy {
    if values.iter().all(|value| *value == 0.0) {
        return ForecastAccuracy { mape: 0.0, r_squared: 0.0 };
    }

    let train_len = values.len() - backtest_weeks;
    let model = LinearTrend::fit(&values[..train_len]);

    let held_out = &values[train_len..];
    let held_out_predictions: Vec<f64> =
        (train_len..values.len()).map(|t| model.predict(t as f64)).collect();

    ForecastAccuracy {
        mape: trend::mape(held_out, &held_out_predictions),
        r_squared: trend::r_squared(values, &model),
    }
}

fn classify_trend(slope: f64, mean: f64) -> TrendLabel {
    if mean <= 0.0 {
        return TrendLabel::Flat;
    }

    let threshold = FLAT_TREND_FRACTION * mean;
    if slope > threshold {
        TrendLabel::Rising
    } else if slope < -threshold {
        TrendLabel::Falling
    } else {
        TrendLabel::Flat
    }
}
