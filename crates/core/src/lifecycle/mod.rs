//! Product lifecycle classification and performance scoring.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::domain::period::RawPeriodTotalsRow;
use crate::domain::product::ProductId;
use crate::errors::EngineError;

pub use crate::domain::period::PeriodTotals;

/// Period-over-period change at or beyond which a product is growing or
/// declining.
pub const LIFECYCLE_THRESHOLD_PCT: f64 = 10.0;

/// Growth sub-score given to products with no prior-period baseline.
pub const NEUTRAL_GROWTH_SCORE: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    New,
    Growth,
    Mature,
    Decline,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Growth => "growth",
            Self::Mature => "mature",
            Self::Decline => "decline",
        }
    }
}

/// Period-over-period unit growth. `Undefined` when the prior period sold
/// nothing; serializes as `null`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrowthRate {
    Percent(f64),
    Undefined,
}

impl GrowthRate {
    pub fn between(current_units: u64, prior_units: u64) -> Self {
        if prior_units == 0 {
            return Self::Undefined;
        }
        let delta = current_units as f64 - prior_units as f64;
        Self::Percent(delta / prior_units as f64 * 100.0)
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Percent(value) => Some(*value),
            Self::Undefined => None,
        }
    }
}

impl Serialize for GrowthRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.percent().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GrowthRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<f64>::deserialize(deserializer)? {
            Some(value) => Self::Percent(value),
            None => Self::Undefined,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifecycleAssessment {
    pub lifecycle: Lifecycle,
    pub growth_rate_pct: GrowthRate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformanceRecord {
    pub product_id: ProductId,
    pub total_units: u64,
    pub total_revenue: Decimal,
    pub growth_rate_pct: GrowthRate,
    pub lifecycle: Lifecycle,
    pub performance_score: u8,
}

/// Scored portfolio plus the boundary rows dropped as malformed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioScores {
    /// Ordered by product id.
    pub records: Vec<ProductPerformanceRecord>,
    pub skipped_count: usize,
}

/// Performance score weights. These are business tunables, not derived
/// values; they are normalised by their sum before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Velocity percentile among peers (default: 0.40)
    pub velocity: f64,
    /// Revenue percentile among peers (default: 0.40)
    pub revenue: f64,
    /// Clamped growth rate (default: 0.20)
    pub growth: f64,
    /// Growth rates are clamped to ±this many percent before mapping onto
    /// 0..=100 (default: 100.0)
    pub growth_clamp_pct: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { velocity: 0.40, revenue: 0.40, growth: 0.20, growth_clamp_pct: 100.0 }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [self.velocity, self.revenue, self.growth];
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
            return Err(EngineError::InvalidWeights(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(EngineError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        if !self.growth_clamp_pct.is_finite() || self.growth_clamp_pct <= 0.0 {
            return Err(EngineError::InvalidWeights(
                "growth_clamp_pct must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }

    fn growth_sub_score(&self, growth: GrowthRate) -> f64 {
        match growth {
            GrowthRate::Percent(value) => {
                let clamp = self.growth_clamp_pct;
                (value.clamp(-clamp, clamp) + clamp) / (2.0 * clamp) * 100.0
            }
            GrowthRate::Undefined => NEUTRAL_GROWTH_SCORE,
        }
    }

    fn combine(&self, velocity_pct: f64, revenue_pct: f64, growth_sub: f64) -> u8 {
        let total = self.velocity + self.revenue + self.growth;
        let score =
            (self.velocity * velocity_pct + self.revenue * revenue_pct + self.growth * growth_sub)
                / total;
        score.round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LifecycleClassifier {
    weights: ScoringWeights,
}

impl LifecycleClassifier {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Rules apply in order: new, growth, decline, mature.
    ///
    /// The performance score ranks a product against its peers, so it is not
    /// part of this assessment; see [`Self::assess_against`] and
    /// [`Self::score_portfolio`].
    pub fn classify(&self, current: &PeriodTotals, prior: &PeriodTotals) -> LifecycleAssessment {
        classify_units(current.total_units, prior.total_units)
    }

    /// Scores every product of `current` against its peers in the same
    /// period. Products absent from `prior` are treated as new. Duplicate
    /// rows for one product are summed. Output is ordered by product id.
    pub fn score_portfolio(
        &self,
        current: &[PeriodTotals],
        prior: &[PeriodTotals],
        period_days: u32,
    ) -> Result<Vec<ProductPerformanceRecord>, EngineError> {
        self.weights.validate()?;
        if period_days == 0 {
            return Err(EngineError::InvalidWindow { window_days: period_days });
        }

        let current = merge_totals(current);
        let prior = merge_totals(prior);
        let peers = PeerSet::new(&current, period_days);

        let records: Vec<ProductPerformanceRecord> = current
            .iter()
            .map(|(product_id, (total_units, total_revenue))| {
                let prior_units = prior.get(product_id).map(|(units, _)| *units).unwrap_or(0);
                self.score_one(product_id, *total_units, *total_revenue, prior_units, &peers)
            })
            .collect();

        debug!(
            event_name = "engine.lifecycle.scored",
            products = records.len(),
            new_products =
                records.iter().filter(|record| record.lifecycle == Lifecycle::New).count(),
            period_days,
            "product lifecycle scored"
        );

        Ok(records)
    }

    /// Like [`Self::score_portfolio`], but validates raw boundary rows first.
    /// Malformed rows are dropped and counted.
    pub fn score_rows(
        &self,
        current: &[RawPeriodTotalsRow],
        prior: &[RawPeriodTotalsRow],
        period_days: u32,
    ) -> Result<PortfolioScores, EngineError> {
        let mut skipped_count = 0;
        let current = validate_rows(current, &mut skipped_count);
        let prior = validate_rows(prior, &mut skipped_count);

        let records = self.score_portfolio(&current, &prior, period_days)?;
        Ok(PortfolioScores { records, skipped_count })
    }

    /// Full assessment of one product, scored against `peers` from the same
    /// period. Peer rows for the same product id are replaced by `current`.
    pub fn assess_against(
        &self,
        current: &PeriodTotals,
        prior: &PeriodTotals,
        peers: &[PeriodTotals],
        period_days: u32,
    ) -> Result<ProductPerformanceRecord, EngineError> {
        self.weights.validate()?;
        if period_days == 0 {
            return Err(EngineError::InvalidWindow { window_days: period_days });
        }

        let mut portfolio = merge_totals(
            &peers
                .iter()
                .filter(|peer| peer.product_id != current.product_id)
                .cloned()
                .collect::<Vec<_>>(),
        );
        portfolio.insert(current.product_id.clone(), (current.total_units, current.total_revenue));
        let peers = PeerSet::new(&portfolio, period_days);

        Ok(self.score_one(
            &current.product_id,
            current.total_units,
            current.total_revenue,
            prior.total_units,
            &peers,
        ))
    }

    fn score_one(
        &self,
        product_id: &ProductId,
        total_units: u64,
        total_revenue: Decimal,
        prior_units: u64,
        peers: &PeerSet,
    ) -> ProductPerformanceRecord {
        let assessment = classify_units(total_units, prior_units);

        let velocity_pct = percentile_rank(&peers.velocities, peers.velocity_of(total_units));
        let revenue_pct =
            percentile_rank(&peers.revenues, total_revenue.to_f64().unwrap_or(0.0));
        let growth_sub = self.weights.growth_sub_score(assessment.growth_rate_pct);

        ProductPerformanceRecord {
            product_id: product_id.clone(),
            total_units,
            total_revenue,
            growth_rate_pct: assessment.growth_rate_pct,
            lifecycle: assessment.lifecycle,
            performance_score: self.weights.combine(velocity_pct, revenue_pct, growth_sub),
        }
    }
}

/// Velocity and revenue of every product in one period.
struct PeerSet {
    velocities: Vec<f64>,
    revenues: Vec<f64>,
    period_days: u32,
}

impl PeerSet {
    fn new(current: &BTreeMap<ProductId, (u64, Decimal)>, period_days: u32) -> Self {
        let velocities = current
            .values()
            .map(|(units, _)| *units as f64 / f64::from(period_days))
            .collect();
        let revenues =
            current.values().map(|(_, revenue)| revenue.to_f64().unwrap_or(0.0)).collect();
        Self { velocities, revenues, period_days }
    }

    fn velocity_of(&self, units: u64) -> f64 {
        units as f64 / f64::from(self.period_days)
    }
}

fn validate_rows(rows: &[RawPeriodTotalsRow], skipped_count: &mut usize) -> Vec<PeriodTotals> {
    rows.iter()
        .filter_map(|row| match PeriodTotals::from_raw(row) {
            Ok(totals) => Some(totals),
            Err(reason) => {
                *skipped_count += 1;
                debug!(
                    event_name = "engine.lifecycle.row_skipped",
                    reason = reason.as_str(),
                    "period totals row dropped"
                );
                None
            }
        })
        .collect()
}

fn classify_units(current_units: u64, prior_units: u64) -> LifecycleAssessment {
    let growth_rate_pct = GrowthRate::between(current_units, prior_units);
    let lifecycle = match growth_rate_pct {
        GrowthRate::Undefined => Lifecycle::New,
        GrowthRate::Percent(pct) if pct >= LIFECYCLE_THRESHOLD_PCT => Lifecycle::Growth,
        GrowthRate::Percent(pct) if pct <= -LIFECYCLE_THRESHOLD_PCT => Lifecycle::Decline,
        GrowthRate::Percent(_) => Lifecycle::Mature,
    };

    LifecycleAssessment { lifecycle, growth_rate_pct }
}

fn merge_totals(rows: &[PeriodTotals]) -> BTreeMap<ProductId, (u64, Decimal)> {
    let mut merged: BTreeMap<ProductId, (u64, Decimal)> = BTreeMap::new();
    for row in rows {
        let entry = merged.entry(row.product_id.clone()).or_insert((0, Decimal::ZERO));
        entry.0 = entry.0.saturating_add(row.total_units);
        entry.1 += row.total_revenue;
    }
    merged
}

/// Share of the other peers strictly below `value`, in 0..=100. Ties share a
/// rank; a lone product ranks 100.
fn percentile_rank(values: &[f64], value: f64) -> f64 {
    if values.len() <= 1 {
        return 100.0;
    }
    let below = values.iter().filter(|other| **other < value).count();
    below as f64 / (values.len() - 1) as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn totals(product: &str, units: u64, revenue: i64) -> PeriodTotals {
        PeriodTotals {
            product_id: ProductId(product.to_string()),
            total_units: units,
            total_revenue: Decimal::from(revenue),
        }
    }

    #[test]
    fn zero_prior_is_new_with_undefined_growth() {
        let assessment =
            LifecycleClassifier::default().classify(&totals("p", 50, 500), &totals("p", 0, 0));

        assert_eq!(assessment.lifecycle, Lifecycle::New);
        assert_eq!(assessment.growth_rate_pct, GrowthRate::Undefined);
    }

    #[test]
    fn ten_percent_boundaries_are_inclusive() {
        let classifier = LifecycleClassifier::default();
        let prior = totals("p", 100, 1000);

        assert_eq!(classifier.classify(&totals("p", 110, 0), &prior).lifecycle, Lifecycle::Growth);
        assert_eq!(classifier.classify(&totals("p", 90, 0), &prior).lifecycle, Lifecycle::Decline);
        assert_eq!(classifier.classify(&totals("p", 105, 0), &prior).lifecycle, Lifecycle::Mature);
        assert_eq!(classifier.classify(&totals("p", 91, 0), &prior).lifecycle, Lifecycle::Mature);
    }

    #[test]
    fn growth_rate_is_signed_percent() {
        assert_eq!(GrowthRate::between(150, 100), GrowthRate::Percent(50.0));
        assert_eq!(GrowthRate::between(25, 100), GrowthRate::Percent(-75.0));
    }

    #[test]
    fn portfolio_scores_combine_percentiles_and_growth() {
        let current = vec![totals("a", 300, 3000), totals("b", 200, 2000), totals("c", 100, 1000)];
        let prior = vec![totals("a", 200, 2000), totals("b", 200, 2000), totals("c", 200, 2000)];

        let records =
            LifecycleClassifier::default().score_portfolio(&current, &prior, 28).expect("scores");

        let scores: Vec<u8> = records.iter().map(|record| record.performance_score).collect();
        assert_eq!(scores, vec![95, 50, 5]);
        assert_eq!(records[0].lifecycle, Lifecycle::Growth);
        assert_eq!(records[1].lifecycle, Lifecycle::Mature);
        assert_eq!(records[2].lifecycle, Lifecycle::Decline);
    }

    #[test]
    fn lone_new_product_gets_neutral_growth_score() {
        let records = LifecycleClassifier::default()
            .score_portfolio(&[totals("solo", 10, 100)], &[], 7)
            .expect("scores");

        assert_eq!(records[0].lifecycle, Lifecycle::New);
        assert_eq!(records[0].performance_score, 90);
    }

    #[test]
    fn scores_stay_within_bounds_under_extreme_growth() {
        let current = vec![totals("a", 10_000, 1), totals("b", 1, 10_000)];
        let prior = vec![totals("a", 1, 1), totals("b", 10_000, 1)];

        let records =
            LifecycleClassifier::default().score_portfolio(&current, &prior, 1).expect("scores");

        assert!(records.iter().all(|record| record.performance_score <= 100));
    }

    #[test]
    fn custom_weights_shift_scores() {
        let revenue_only =
            ScoringWeights { velocity: 0.0, revenue: 1.0, growth: 0.0, growth_clamp_pct: 100.0 };
        let current = vec![totals("a", 1, 5000), totals("b", 500, 10)];

        let records = LifecycleClassifier::new(revenue_only)
            .score_portfolio(&current, &current, 7)
            .expect("scores");

        assert_eq!(records[0].performance_score, 100);
        assert_eq!(records[1].performance_score, 0);
    }

    #[test]
    fn duplicate_rows_are_merged_before_scoring() {
        let current = vec![totals("a", 10, 100), totals("a", 5, 50)];

        let records =
            LifecycleClassifier::default().score_portfolio(&current, &[], 7).expect("scores");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_units, 15);
        assert_eq!(records[0].total_revenue, Decimal::from(150));
    }

    #[test]
    fn invalid_weights_and_period_are_rejected() {
        let negative = ScoringWeights { velocity: -0.1, ..ScoringWeights::default() };
        let all_zero =
            ScoringWeights { velocity: 0.0, revenue: 0.0, growth: 0.0, growth_clamp_pct: 100.0 };

        assert!(matches!(
            LifecycleClassifier::new(negative).score_portfolio(&[], &[], 7),
            Err(EngineError::InvalidWeights(_))
        ));
        assert!(matches!(
            LifecycleClassifier::new(all_zero).score_portfolio(&[], &[], 7),
            Err(EngineError::InvalidWeights(_))
        ));
        assert_eq!(
            LifecycleClassifier::default().score_portfolio(&[], &[], 0),
            Err(EngineError::InvalidWindow { window_days: 0 })
        );
    }

    #[test]
    fn single_product_assessment_matches_portfolio_score() {
        let classifier = LifecycleClassifier::default();
        let current = vec![totals("a", 300, 3000), totals("b", 200, 2000), totals("c", 100, 1000)];
        let prior = vec![totals("a", 200, 2000), totals("b", 200, 2000), totals("c", 200, 2000)];

        let portfolio = classifier.score_portfolio(&current, &prior, 28).expect("scores");
        let single = classifier
            .assess_against(&totals("b", 200, 2000), &totals("b", 200, 2000), &current, 28)
            .expect("assessment");

        assert_eq!(single, portfolio[1]);
        assert_eq!(single.performance_score, 50);
    }

    #[test]
    fn single_product_assessment_without_peers_ranks_top() {
        let record = LifecycleClassifier::default()
            .assess_against(&totals("solo", 10, 100), &totals("solo", 0, 0), &[], 7)
            .expect("assessment");

        assert_eq!(record.lifecycle, Lifecycle::New);
        assert_eq!(record.performance_score, 90);
    }

    #[test]
    fn malformed_raw_rows_are_skipped_and_counted() {
        let raw = |product: Option<&str>, units: i64, revenue: i64| RawPeriodTotalsRow {
            product_id: product.map(str::to_string),
            total_units: Some(units),
            total_revenue: Some(Decimal::from(revenue)),
        };
        let current = vec![raw(Some("a"), 10, 100), raw(Some("b"), -1, 5)];
        let prior = vec![raw(None, 10, 100)];

        let scores =
            LifecycleClassifier::default().score_rows(&current, &prior, 7).expect("scores");

        assert_eq!(scores.skipped_count, 2);
        assert_eq!(scores.records.len(), 1);
        assert_eq!(scores.records[0].product_id, ProductId("a".to_string()));
    }

    #[test]
    fn undefined_growth_serializes_as_null() {
        let record = ProductPerformanceRecord {
            product_id: ProductId("p".to_string()),
            total_units: 50,
            total_revenue: Decimal::from(500),
            growth_rate_pct: GrowthRate::Undefined,
            lifecycle: Lifecycle::New,
            performance_score: 90,
        };

        let json = serde_json::to_value(&record).expect("serializes");

        assert!(json["growth_rate_pct"].is_null());
        assert_eq!(json["lifecycle"], "new");
    }
}
