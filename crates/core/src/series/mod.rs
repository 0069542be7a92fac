//! Weekly series aggregation.
//!
//! Converts raw order line items into Monday-anchored weekly series. Every
//! week of the requested range is present in the output, zero-filled when
//! nothing sold, because the forecaster assumes a fixed one-week step.

mod aggregator;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::product::ProductId;
use crate::errors::EngineError;

pub use aggregator::SeriesAggregator;

/// One calendar week of activity, Monday 00:00 through Sunday 23:59:59 local.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub period_start: NaiveDate,
    pub units: u64,
    pub revenue: Decimal,
    pub order_count: u64,
}

impl WeeklyPoint {
    pub fn empty(period_start: NaiveDate) -> Self {
        Self { period_start, units: 0, revenue: Decimal::ZERO, order_count: 0 }
    }
}

/// Inclusive calendar date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of Monday-anchored calendar weeks touched by the range.
    pub fn week_count(&self) -> usize {
        let span = (week_start(self.end) - week_start(self.start)).num_days();
        (span / 7) as usize + 1
    }

    /// Monday of every week touched by the range, ascending.
    pub fn week_starts(&self) -> impl Iterator<Item = NaiveDate> {
        let first = week_start(self.start);
        (0..self.week_count()).map(move |offset| first + Duration::weeks(offset as i64))
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// A zero-filled series plus the diagnostics of how it was built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    pub points: Vec<WeeklyPoint>,
    /// Malformed rows dropped at the boundary.
    pub skipped_count: usize,
    /// Well-formed rows that fell outside the requested range.
    pub out_of_range_count: usize,
}

impl AggregatedSeries {
    pub fn total_units(&self) -> u64 {
        self.points.iter().map(|point| point.units).sum()
    }

    pub fn total_revenue(&self) -> Decimal {
        self.points.iter().map(|point| point.revenue).sum()
    }
}

/// Per-product series over a shared range. Every series has the same length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSeriesSet {
    pub series: BTreeMap<ProductId, Vec<WeeklyPoint>>,
    pub skipped_count: usize,
    pub out_of_range_count: usize,
}
