//! Ordinary least squares trend line over an evenly spaced series and the
//! goodness-of-fit measures used by the forecaster.

use serde::{Deserialize, Serialize};

/// Relative tolerance below which a sum of squares is treated as zero.
const TOLERANCE: f64 = 1e-9;

/// `y = intercept + slope * t` with `t` the zero-based week index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearTrend {
    /// Fits over `values[t]` for `t = 0..len`. A single point (or an empty
    /// slice) yields a flat line through its mean.
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self { intercept: 0.0, slope: 0.0 };
        }

        let t_mean = (n as f64 - 1.0) / 2.0;
        let y_mean = mean(values);

        let mut covariance = 0.0;
        let mut t_variance = 0.0;
        for (t, y) in values.iter().enumerate() {
            let dt = t as f64 - t_mean;
            covariance += dt * (y - y_mean);
            t_variance += dt * dt;
        }

        let slope = if t_variance > 0.0 { covariance / t_variance } else { 0.0 };
        Self { intercept: y_mean - slope * t_mean, slope }
    }

    pub fn predict(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }

    pub fn sum_squared_residuals(&self, values: &[f64]) -> f64 {
        values
            .iter()
            .enumerate()
            .map(|(t, y)| {
                let residual = y - self.predict(t as f64);
                residual * residual
            })
            .sum()
    }

    /// Residual standard deviation with two degrees of freedom spent on the
    /// fit. Zero when there are not enough points to estimate it.
    pub fn residual_std_dev(&self, values: &[f64]) -> f64 {
        if values.len() <= 2 {
            return 0.0;
        }
        (self.sum_squared_residuals(values) / (values.len() - 2) as f64).sqrt()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Coefficient of determination of `model` against `values`.
///
/// Not clamped: a model worse than the mean yields a negative value. A
/// constant series has no variance to explain, so a perfect fit scores 1 and
/// anything else scores 0.
pub(crate) fn r_squared(values: &[f64], model: &LinearTrend) -> f64 {
    let y_mean = mean(values);
    let ss_tot: f64 = values.iter().map(|y| (y - y_mean) * (y - y_mean)).sum();
    let ss_res = model.sum_squared_residuals(values);
    let scale = 1.0 + values.iter().map(|y| y * y).sum::<f64>();

    if ss_tot <= TOLERANCE * scale {
        return if ss_res <= TOLERANCE * scale { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute percentage error as a fraction, over the pairs whose actual
/// value is positive. Zero when no such pair exists.
pub(crate) fn mape(actuals: &[f64], predictions: &[f64]) -> f64 {
    let errors: Vec<f64> = actuals
        .iter()
        .zip(predictions)
        .filter(|(actual, _)| **actual > 0.0)
        .map(|(actual, predicted)| (actual - predicted).abs() / actual)
        .collect();

    mean(&errors)
}
