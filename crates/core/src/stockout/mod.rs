//! Stockout severity classification and per-store alert rollup.
//!
//! Severity is derived per velocity record, then each store's summary is
//! folded from its records. Summaries are never mutated independently of the
//! records they came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::product::{ProductId, StoreId};
use crate::errors::EngineError;
use crate::velocity::{StockoutHorizon, VelocityRecord};

/// Ordered `None < Low < High < Critical`; the store rollup takes the max.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Low,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Day thresholds are inclusive upper bounds for each tier. Setting
/// `low_days` equal to `high_days` disables the low tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockoutThresholds {
    pub critical_days: f64,
    pub high_days: f64,
    pub low_days: f64,
    /// On-hand quantities strictly below this count as low stock.
    pub reorder_point: u64,
}

impl StockoutThresholds {
    pub fn validate(&self) -> Result<(), EngineError> {
        let all_finite = [self.critical_days, self.high_days, self.low_days]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0);
        let ordered = self.critical_days <= self.high_days && self.high_days <= self.low_days;

        if all_finite && ordered {
            Ok(())
        } else {
            Err(EngineError::InvalidThresholds {
                critical_days: self.critical_days,
                high_days: self.high_days,
                low_days: self.low_days,
            })
        }
    }

    /// Zero stock is critical no matter the velocity, including an
    /// unbounded horizon.
    pub fn classify(&self, on_hand: u64, horizon: StockoutHorizon) -> Severity {
        if on_hand == 0 {
            return Severity::Critical;
        }

        match horizon.days() {
            Some(days) if days <= self.critical_days => Severity::Critical,
            Some(days) if days <= self.high_days => Severity::High,
            Some(days) if days <= self.low_days => Severity::Low,
            _ => Severity::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordAssessment {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub on_hand: u64,
    pub days_until_stockout: StockoutHorizon,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreAlertSummary {
    pub store_id: StoreId,
    pub record_count: usize,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub critical_count: usize,
    pub severity: Severity,
    pub min_days_until_stockout: StockoutHorizon,
}

impl StoreAlertSummary {
    fn empty(store_id: StoreId) -> Self {
        Self {
            store_id,
            record_count: 0,
            low_stock_count: 0,
            out_of_stock_count: 0,
            critical_count: 0,
            severity: Severity::None,
            min_days_until_stockout: StockoutHorizon::Unbounded,
        }
    }

    fn absorb(&mut self, assessment: &RecordAssessment, reorder_point: u64) {
        self.record_count += 1;
        if assessment.on_hand < reorder_point {
            self.low_stock_count += 1;
        }
        if assessment.on_hand == 0 {
            self.out_of_stock_count += 1;
        }
        if assessment.severity == Severity::Critical {
            self.critical_count += 1;
        }
        self.severity = self.severity.max(assessment.severity);
        self.min_days_until_stockout =
            self.min_days_until_stockout.sooner(assessment.days_until_stockout);
    }
}

/// Stateless analyzer. Thresholds are passed per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct StockoutAnalyzer;

impl StockoutAnalyzer {
    /// Per-record severities, in input order.
    pub fn assess(
        &self,
        records: &[VelocityRecord],
        thresholds: &StockoutThresholds,
    ) -> Result<Vec<RecordAssessment>, EngineError> {
        thresholds.validate()?;

        Ok(records
            .iter()
            .map(|record| RecordAssessment {
                store_id: record.store_id.clone(),
                product_id: record.product_id.clone(),
                on_hand: record.on_hand,
                days_until_stockout: record.days_until_stockout,
                severity: thresholds.classify(record.on_hand, record.days_until_stockout),
            })
            .collect())
    }

    /// One summary per store, ordered by store id.
    pub fn analyze(
        &self,
        records: &[VelocityRecord],
        thresholds: &StockoutThresholds,
    ) -> Result<Vec<StoreAlertSummary>, EngineError> {
        let assessments = self.assess(records, thresholds)?;

        let mut stores: BTreeMap<StoreId, StoreAlertSummary> = BTreeMap::new();
        for assessment in &assessments {
            stores
                .entry(assessment.store_id.clone())
                .or_insert_with(|| StoreAlertSummary::empty(assessment.store_id.clone()))
                .absorb(assessment, thresholds.reorder_point);
        }

        let summaries: Vec<StoreAlertSummary> = stores.into_values().collect();
        debug!(
            event_name = "engine.stockout.analyzed",
            records = assessments.len(),
            stores = summaries.len(),
            critical_stores =
                summaries.iter().filter(|summary| summary.severity == Severity::Critical).count(),
            "stockout risk analyzed"
        );

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> StockoutThresholds {
        StockoutThresholds { critical_days: 3.0, high_days: 7.0, low_days: 14.0, reorder_point: 10 }
    }

    fn record(store: &str, product: &str, on_hand: u64, units_per_day: f64) -> VelocityRecord {
        VelocityRecord {
            store_id: StoreId(store.to_string()),
            product_id: ProductId(product.to_string()),
            units_per_day,
            window_days: 28,
            on_hand,
            days_until_stockout: StockoutHorizon::from_velocity(on_hand, units_per_day),
        }
    }

    #[test]
    fn zero_stock_is_critical_even_when_unbounded() {
        let assessments =
            StockoutAnalyzer.assess(&[record("s1", "p1", 0, 0.0)], &thresholds()).expect("assess");

        assert_eq!(assessments[0].severity, Severity::Critical);
        assert!(assessments[0].days_until_stockout.is_unbounded());
    }

    #[test]
    fn tiers_follow_inclusive_day_thresholds() {
        let classify = |days: f64| thresholds().classify(50, StockoutHorizon::Days(days));

        assert_eq!(classify(3.0), Severity::Critical);
        assert_eq!(classify(3.5), Severity::High);
        assert_eq!(classify(7.0), Severity::High);
        assert_eq!(classify(14.0), Severity::Low);
        assert_eq!(classify(14.5), Severity::None);
        assert_eq!(thresholds().classify(50, StockoutHorizon::Unbounded), Severity::None);
    }

    #[test]
    fn low_tier_can_be_disabled() {
        let no_low = StockoutThresholds { low_days: 7.0, ..thresholds() };

        assert_eq!(no_low.classify(50, StockoutHorizon::Days(10.0)), Severity::None);
    }

    #[test]
    fn store_rollup_counts_and_takes_max_severity() {
        let records = vec![
            record("s1", "a", 0, 1.0),   // out of stock, critical
            record("s1", "b", 5, 1.0),   // 5 days: high, below reorder point
            record("s1", "c", 100, 0.0), // unbounded, none
            record("s2", "a", 40, 4.0),  // 10 days: low
            record("s2", "b", 30, 0.0),  // unbounded
        ];

        let summaries = StockoutAnalyzer.analyze(&records, &thresholds()).expect("analyze");

        assert_eq!(summaries.len(), 2);
        let s1 = &summaries[0];
        assert_eq!(s1.store_id, StoreId("s1".to_string()));
        assert_eq!(s1.record_count, 3);
        assert_eq!(s1.out_of_stock_count, 1);
        assert_eq!(s1.low_stock_count, 2);
        assert_eq!(s1.critical_count, 1);
        assert_eq!(s1.severity, Severity::Critical);
        assert_eq!(s1.min_days_until_stockout, StockoutHorizon::Days(0.0));

        let s2 = &summaries[1];
        assert_eq!(s2.severity, Severity::Low);
        assert_eq!(s2.out_of_stock_count, 0);
        assert_eq!(s2.min_days_until_stockout, StockoutHorizon::Days(10.0));
    }

    #[test]
    fn store_with_only_idle_products_is_unbounded() {
        let records = vec![record("s3", "a", 20, 0.0), record("s3", "b", 12, 0.0)];

        let summaries = StockoutAnalyzer.analyze(&records, &thresholds()).expect("analyze");

        assert_eq!(summaries[0].severity, Severity::None);
        assert_eq!(summaries[0].min_days_until_stockout, StockoutHorizon::Unbounded);
    }

    #[test]
    fn store_severity_equals_max_of_record_severities() {
        let records = vec![
            record("s1", "a", 30, 5.0),
            record("s1", "b", 60, 5.0),
            record("s2", "a", 12, 1.0),
            record("s2", "b", 2, 1.0),
            record("s3", "a", 100, 1.0),
        ];

        let assessments = StockoutAnalyzer.assess(&records, &thresholds()).expect("assess");
        let summaries = StockoutAnalyzer.analyze(&records, &thresholds()).expect("analyze");

        for summary in &summaries {
            let expected = assessments
                .iter()
                .filter(|assessment| assessment.store_id == summary.store_id)
                .map(|assessment| assessment.severity)
                .max()
                .expect("store has records");
            assert_eq!(summary.severity, expected);
        }
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let inverted = StockoutThresholds { critical_days: 10.0, high_days: 5.0, ..thresholds() };
        let negative = StockoutThresholds { critical_days: -1.0, ..thresholds() };

        assert!(matches!(
            StockoutAnalyzer.analyze(&[], &inverted),
            Err(EngineError::InvalidThresholds { critical_days, .. }) if critical_days == 10.0
        ));
        assert!(StockoutAnalyzer.analyze(&[], &negative).is_err());
    }

    #[test]
    fn returned_discontinued_item_does_not_alert_store() {
        let as_of = chrono::NaiveDate::from_ymd_opt(2024, 5, 28).expect("valid date");
        let events = vec![crate::domain::movement::RawMovementRow {
            store_id: Some("s1".to_string()),
            product_id: Some("discontinued".to_string()),
            occurred_at: Some("2024-05-27".to_string()),
            quantity: Some(1),
            kind: Some("return".to_string()),
        }];

        let estimate = crate::velocity::VelocityEstimator
            .estimate(&events, &[], 7, as_of)
            .expect("estimate");
        let summaries =
            StockoutAnalyzer.analyze(&estimate.records, &thresholds()).expect("analyze");

        assert!(summaries.is_empty());
    }

    #[test]
    fn analysis_is_idempotent() {
        let records = vec![record("s1", "a", 3, 1.0), record("s2", "a", 0, 0.0)];

        assert_eq!(
            StockoutAnalyzer.analyze(&records, &thresholds()).expect("analyze"),
            StockoutAnalyzer.analyze(&records, &thresholds()).expect("analyze")
        );
    }
}
