use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::product::{ProductId, SupplierId};
use crate::domain::sale::{RawSaleRow, SaleRecord};
use crate::domain::RejectReason;
use crate::series::{week_start, AggregatedSeries, DateRange, ProductSeriesSet, WeeklyPoint};

/// Buckets line items into weekly points. Stateless.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeriesAggregator;

impl SeriesAggregator {
    /// One series over every valid row in `range`, for input already
    /// filtered to a single entity.
    pub fn aggregate(&self, rows: &[RawSaleRow], range: DateRange) -> AggregatedSeries {
        self.aggregate_matching(rows, range, |_| true)
    }

    /// Supplier-wide series. Valid rows of other suppliers, or with no
    /// supplier, are left out without counting as skipped or out of range.
    pub fn aggregate_for_supplier(
        &self,
        rows: &[RawSaleRow],
        supplier_id: &SupplierId,
        range: DateRange,
    ) -> AggregatedSeries {
        self.aggregate_matching(rows, range, |record| {
            record.supplier_id.as_ref() == Some(supplier_id)
        })
    }

    fn aggregate_matching(
        &self,
        rows: &[RawSaleRow],
        range: DateRange,
        include: impl Fn(&SaleRecord) -> bool,
    ) -> AggregatedSeries {
        let mut buckets = WeekBuckets::new(range);
        let mut skipped_count = 0;
        let mut out_of_range_count = 0;

        for row in rows {
            let record = match SaleRecord::from_raw(row) {
                Ok(record) => record,
                Err(reason) => {
                    skipped_count += 1;
                    log_rejected(&reason);
                    continue;
                }
            };

            if !include(&record) {
                continue;
            }
            if !buckets.add(&record) {
                out_of_range_count += 1;
            }
        }

        let points = buckets.into_points();
        debug!(
            event_name = "engine.series.aggregated",
            weeks = points.len(),
            skipped_count,
            out_of_range_count,
            "weekly series aggregated"
        );

        AggregatedSeries { points, skipped_count, out_of_range_count }
    }

    /// One series per product seen in range. Rows without a product id are
    /// malformed for this view and counted as skipped.
    pub fn aggregate_by_product(&self, rows: &[RawSaleRow], range: DateRange) -> ProductSeriesSet {
        let mut per_product: BTreeMap<ProductId, WeekBuckets> = BTreeMap::new();
        let mut skipped_count = 0;
        let mut out_of_range_count = 0;

        for row in rows {
            let record = match SaleRecord::from_raw(row) {
                Ok(record) => record,
                Err(reason) => {
                    skipped_count += 1;
                    log_rejected(&reason);
                    continue;
                }
            };

            let Some(product_id) = record.product_id.clone() else {
                skipped_count += 1;
                log_rejected(&RejectReason::MissingIdentifier("product_id"));
                continue;
            };

            if !range.contains(record.occurred_at.date()) {
                out_of_range_count += 1;
                continue;
            }

            per_product.entry(product_id).or_insert_with(|| WeekBuckets::new(range)).add(&record);
        }

        let series = per_product
            .into_iter()
            .map(|(product_id, buckets)| (product_id, buckets.into_points()))
            .collect::<BTreeMap<_, _>>();

        debug!(
            event_name = "engine.series.aggregated_by_product",
            products = series.len(),
            weeks = range.week_count(),
            skipped_count,
            out_of_range_count,
            "per-product weekly series aggregated"
        );

        ProductSeriesSet { series, skipped_count, out_of_range_count }
    }
}

fn log_rejected(reason: &RejectReason) {
    debug!(event_name = "engine.series.row_skipped", reason = reason.as_str(), "sale row dropped");
}

#[derive(Default)]
struct WeekAccumulator {
    units: u64,
    revenue: Decimal,
    order_ids: HashSet<String>,
    anonymous_orders: u64,
}

struct WeekBuckets {
    range: DateRange,
    first_week: NaiveDate,
    weeks: Vec<WeekAccumulator>,
}

impl WeekBuckets {
    fn new(range: DateRange) -> Self {
        let weeks = (0..range.week_count()).map(|_| WeekAccumulator::default()).collect();
        Self { range, first_week: week_start(range.start()), weeks }
    }

    /// Returns `false` when the record lies outside the range.
    fn add(&mut self, record: &SaleRecord) -> bool {
        let date = record.occurred_at.date();
        if !self.range.contains(date) {
            return false;
        }

        let index = ((week_start(date) - self.first_week).num_days() / 7) as usize;
        let Some(week) = self.weeks.get_mut(index) else {
            return false;
        };

        week.units = week.units.saturating_add(record.quantity);
        week.revenue += record.amount;
        match &record.order_id {
            Some(order_id) => {
                week.order_ids.insert(order_id.clone());
            }
            None => week.anonymous_orders += 1,
        }
        true
    }

    fn into_points(self) -> Vec<WeeklyPoint> {
        self.range
            .week_starts()
            .zip(self.weeks)
            .map(|(period_start, week)| WeeklyPoint {
                period_start,
                units: week.units,
                revenue: week.revenue,
                order_count: week.order_ids.len() as u64 + week.anonymous_orders,
            })
            .collect()
    }
}
